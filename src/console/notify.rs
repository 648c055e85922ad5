// src/console/notify.rs
use chrono::{DateTime, Utc};
use log::*;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub issued_at: DateTime<Utc>,
    expires_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Issues notifications that dismiss themselves after a fixed delay.
#[derive(Debug, Clone)]
pub struct Notifier {
    lifetime: Duration,
    next_id: u64,
}

impl Notifier {
    pub fn new(lifetime: Duration) -> Self {
        Self { lifetime, next_id: 1 }
    }

    pub fn issue(&mut self, severity: Severity, message: impl Into<String>) -> Notification {
        let message = message.into();
        match severity {
            Severity::Success | Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }

        let id = self.next_id;
        self.next_id += 1;

        Notification {
            id,
            severity,
            message,
            issued_at: Utc::now(),
            expires_at: Instant::now() + self.lifetime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notification_expires_after_lifetime() {
        let mut notifier = Notifier::new(Duration::from_millis(3000));
        let note = notifier.issue(Severity::Warning, "preset sync failed");

        assert!(!note.is_expired(Instant::now()));
        tokio::time::advance(Duration::from_millis(2999)).await;
        assert!(!note.is_expired(Instant::now()));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(note.is_expired(Instant::now()));
    }

    #[test]
    fn test_ids_increase() {
        let mut notifier = Notifier::new(Duration::from_secs(1));
        let a = notifier.issue(Severity::Info, "a");
        let b = notifier.issue(Severity::Error, "b");
        assert!(b.id > a.id);
        assert_eq!(b.severity.to_string(), "error");
    }
}
