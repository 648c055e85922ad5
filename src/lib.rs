pub mod api;
pub mod config;
pub mod console;
pub mod models;

// Re-export commonly used types
pub use crate::api::{create_api, ApiError, ConsoleApi, HttpConsoleApi};
pub use crate::config::ConsoleSettings;
pub use crate::console::notify::{Notification, Severity};
pub use crate::console::view::{render, Frame, HeadlessView, View, ViewUpdate};
pub use crate::console::{Console, PresetLoad, SaveOutcome, ScoutOutcome, StartupReport};
pub use crate::models::{AutomationConfig, ConfigField, ConfigurationRecord, PartialRecord, Tag};

use tracing_subscriber::{fmt, EnvFilter};
use log::info;

pub fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scout_console=debug"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!("Logging initialized");
}
