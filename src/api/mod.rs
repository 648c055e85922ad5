// src/api/mod.rs
use crate::config::ConsoleSettings;
use crate::models::{AutomationConfig, ConfigurationRecord, PartialRecord, ScoutReply, StoredAutomation, Tag};
use async_trait::async_trait;
use thiserror::Error;

pub mod http;

pub use http::HttpConsoleApi;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered but refused (`success: false` or a non-2xx status).
    #[error("{0}")]
    Application(String),

    #[error("{0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::Application(_) => "application",
            ApiError::Validation(_) => "validation",
            ApiError::Parse(_) => "parse",
        }
    }
}

/// The backend endpoints the console talks to.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    // Reference data
    async fn tags(&self) -> Result<Vec<Tag>, ApiError>;

    // Presets
    async fn preset_names(&self) -> Result<Vec<String>, ApiError>;
    async fn preset(&self, name: &str) -> Result<PartialRecord, ApiError>;
    async fn save_preset(&self, name: &str, record: &ConfigurationRecord) -> Result<Option<String>, ApiError>;

    // Runtime configuration
    async fn runtime_config(&self) -> Result<PartialRecord, ApiError>;
    async fn save_runtime_config(&self, record: &ConfigurationRecord) -> Result<Option<String>, ApiError>;

    // Automation
    async fn automation_config(&self) -> Result<StoredAutomation, ApiError>;
    async fn save_automation_config(&self, automation: &AutomationConfig) -> Result<Option<String>, ApiError>;
    async fn test_webhook(&self, url: &str) -> Result<Option<String>, ApiError>;

    // Scouting
    async fn scout(&self, record: &ConfigurationRecord) -> Result<ScoutReply, ApiError>;
}

pub fn create_api(settings: &ConsoleSettings) -> anyhow::Result<Box<dyn ConsoleApi>> {
    let api = HttpConsoleApi::new(settings)?;
    Ok(Box::new(api))
}

#[async_trait]
impl<T: ConsoleApi + ?Sized> ConsoleApi for Box<T> {
    async fn tags(&self) -> Result<Vec<Tag>, ApiError> {
        (**self).tags().await
    }

    async fn preset_names(&self) -> Result<Vec<String>, ApiError> {
        (**self).preset_names().await
    }

    async fn preset(&self, name: &str) -> Result<PartialRecord, ApiError> {
        (**self).preset(name).await
    }

    async fn save_preset(&self, name: &str, record: &ConfigurationRecord) -> Result<Option<String>, ApiError> {
        (**self).save_preset(name, record).await
    }

    async fn runtime_config(&self) -> Result<PartialRecord, ApiError> {
        (**self).runtime_config().await
    }

    async fn save_runtime_config(&self, record: &ConfigurationRecord) -> Result<Option<String>, ApiError> {
        (**self).save_runtime_config(record).await
    }

    async fn automation_config(&self) -> Result<StoredAutomation, ApiError> {
        (**self).automation_config().await
    }

    async fn save_automation_config(&self, automation: &AutomationConfig) -> Result<Option<String>, ApiError> {
        (**self).save_automation_config(automation).await
    }

    async fn test_webhook(&self, url: &str) -> Result<Option<String>, ApiError> {
        (**self).test_webhook(url).await
    }

    async fn scout(&self, record: &ConfigurationRecord) -> Result<ScoutReply, ApiError> {
        (**self).scout(record).await
    }
}
