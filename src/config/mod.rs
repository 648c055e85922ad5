// src/config/mod.rs
use anyhow::{Context, Result};
use log::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Client-side settings; the scout parameters themselves live in the backend.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// How long a notification stays visible.
    pub notification_ms: u64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            // the backend kills the scout subprocess after 60s
            request_timeout_secs: 60,
            notification_ms: 3000,
        }
    }
}

impl ConsoleSettings {
    /// Loads an optional TOML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        dotenv::dotenv().ok();
        settings.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Self = toml::from_str(&contents).context("Failed to parse settings file")?;
        debug!("Loaded console settings from {}", path.display());
        Ok(settings)
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SCOUT_CONSOLE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(secs) = lookup("SCOUT_CONSOLE_TIMEOUT_SECS") {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("SCOUT_CONSOLE_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        if let Some(ms) = lookup("SCOUT_CONSOLE_NOTIFICATION_MS") {
            self.notification_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("SCOUT_CONSOLE_NOTIFICATION_MS is not a number: {}", ms))?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: ConsoleSettings = toml::from_str("base_url = \"http://scout.lan:8080\"").unwrap();
        assert_eq!(settings.base_url, "http://scout.lan:8080");
        assert_eq!(settings.request_timeout_secs, 60);
        assert_eq!(settings.notification_ms, 3000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCOUT_CONSOLE_BASE_URL", "http://10.0.0.2:5000"),
            ("SCOUT_CONSOLE_NOTIFICATION_MS", "1500"),
        ]
        .into_iter()
        .collect();

        let settings = ConsoleSettings::default()
            .with_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.base_url, "http://10.0.0.2:5000");
        assert_eq!(settings.notification_ms, 1500);
        assert_eq!(settings.request_timeout_secs, 60);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let result = ConsoleSettings::default().with_env_overrides(|k| {
            (k == "SCOUT_CONSOLE_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
