// src/console/state.rs
use super::notify::Notification;
use crate::models::{ConfigField, ConfigurationRecord, PartialRecord, Tag};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PresetSelection {
    #[default]
    Unselected,
    Selected(String),
}

impl PresetSelection {
    pub fn name(&self) -> Option<&str> {
        match self {
            PresetSelection::Unselected => None,
            PresetSelection::Selected(name) => Some(name),
        }
    }
}

/// What the console is busy with, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Syncing,
    Saving,
    Scouting,
}

impl Activity {
    pub fn status_text(&self) -> Option<&'static str> {
        match self {
            Activity::Idle => None,
            Activity::Syncing => Some("Syncing configuration..."),
            Activity::Saving => Some("Saving scout configuration..."),
            Activity::Scouting => Some("Scouting markets..."),
        }
    }
}

/// Everything the view is projected from.
#[derive(Debug, Clone, Default)]
pub struct ConsoleState {
    pub form: ConfigurationRecord,
    pub tags: Vec<Tag>,
    pub presets: Vec<String>,
    pub selection: PresetSelection,
    pub webhook_url: String,
    /// `None` follows the manual configuration.
    pub auto_preset: Option<String>,
    pub activity: Activity,
    pub results: Option<String>,
    pub notice: Option<Notification>,
}

impl ConsoleState {
    pub fn config_from_form(&self) -> ConfigurationRecord {
        self.form.clone()
    }

    /// Every field takes the record's value, or its default when missing.
    pub fn fill_form(&mut self, record: &PartialRecord) {
        for field in ConfigField::ALL {
            let value = record.get(field).unwrap_or_else(|| field.default_value());
            self.form.set(field, value);
        }
    }

    pub fn set_field(&mut self, field: ConfigField, value: impl Into<String>) {
        self.form.set(field, value);
    }

    pub fn reset_form(&mut self) {
        self.form = ConfigurationRecord::default();
    }

    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    pub fn has_preset(&self, name: &str) -> bool {
        self.presets.iter().any(|p| p == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadToken(u64);

/// Hands out increasing tokens; only the latest one is current.
#[derive(Debug, Clone, Default)]
pub struct TokenGate {
    latest: u64,
}

impl TokenGate {
    pub fn issue(&mut self) -> LoadToken {
        self.latest += 1;
        LoadToken(self.latest)
    }

    pub fn is_current(&self, token: LoadToken) -> bool {
        token.0 == self.latest
    }
}
