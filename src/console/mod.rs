// src/console/mod.rs
//! The configuration console: keeps the form, the preset selection and the
//! automation settings consistent with the backend, and pushes every state
//! change to a [`View`] as a set of [`ViewUpdate`](view::ViewUpdate)s.

pub mod notify;
pub mod state;
pub mod view;

use crate::api::{ApiError, ConsoleApi};
use crate::config::ConsoleSettings;
use crate::models::{
    AutomationConfig, ConfigField, ConfigurationRecord, PartialRecord, ScoutReply, StoredAutomation, Tag,
};
use itertools::Itertools;
use log::*;
use notify::{Notifier, Severity};
use state::{Activity, ConsoleState, LoadToken, PresetSelection, TokenGate};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;
use view::{filter_options, render, Frame, SelectOption, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep {
    Tags,
    Presets,
    Config,
    Automation,
}

impl fmt::Display for LoadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStep::Tags => write!(f, "tag list"),
            LoadStep::Presets => write!(f, "preset list"),
            LoadStep::Config => write!(f, "configuration"),
            LoadStep::Automation => write!(f, "automation settings"),
        }
    }
}

#[derive(Debug, Default)]
pub struct StartupReport {
    pub failures: Vec<(LoadStep, ApiError)>,
}

impl StartupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, step: LoadStep) -> bool {
        self.failures.iter().any(|(s, _)| *s == step)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Only the runtime configuration was written (no preset selected).
    Runtime,
    RuntimeAndPreset(String),
    /// Runtime write succeeded, the preset write did not.
    PresetSyncFailed { preset: String, error: ApiError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetLoad {
    Applied,
    /// A newer load was started; this result was dropped.
    Stale,
}

/// An in-flight preset load.
#[derive(Debug)]
pub struct PendingPresetLoad {
    pub name: String,
    token: LoadToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoutOutcome {
    Rendered { persisted: bool },
    /// A scout was already running.
    Ignored,
}

/// An in-flight scout run.
#[derive(Debug)]
pub struct ScoutTicket {
    pub run_id: Uuid,
    pub record: ConfigurationRecord,
}

pub struct Console<A: ConsoleApi, V: View> {
    api: A,
    view: V,
    state: ConsoleState,
    notifier: Notifier,
    preset_loads: TokenGate,
    /// Whether `state.auto_preset` reflects the stored value or an explicit
    /// choice. Until then an automation save would clobber the stored name.
    auto_preset_known: bool,
    frame: Frame,
}

impl<A: ConsoleApi, V: View> Console<A, V> {
    pub fn new(api: A, view: V, settings: &ConsoleSettings) -> Self {
        let mut console = Self {
            api,
            view,
            state: ConsoleState::default(),
            notifier: Notifier::new(Duration::from_millis(settings.notification_ms)),
            preset_loads: TokenGate::default(),
            auto_preset_known: false,
            frame: Frame::default(),
        };
        console.refresh();
        console
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Pushes whatever changed since the last frame to the view.
    fn refresh(&mut self) {
        let next = render(&self.state, Instant::now());
        let updates = self.frame.diff(&next);
        if !updates.is_empty() {
            self.view.apply(&updates);
            self.frame = next;
        }
    }

    /// Re-renders so that expired notifications disappear.
    pub fn tick(&mut self) {
        self.refresh();
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        self.state.notice = Some(self.notifier.issue(severity, message));
        self.refresh();
    }

    fn set_activity(&mut self, activity: Activity) {
        self.state.activity = activity;
        self.refresh();
    }

    // *************** Startup ***************

    /// Brings the console to a fully defaulted state. Each step is isolated:
    /// a failure is reported and the remaining steps still run.
    pub async fn startup(&mut self) -> StartupReport {
        let mut report = StartupReport::default();
        self.set_activity(Activity::Syncing);

        let (tags, presets) = futures::join!(self.api.tags(), self.api.preset_names());
        match tags {
            Ok(tags) => self.apply_tags(tags),
            Err(e) => self.load_failed(&mut report, LoadStep::Tags, e),
        }
        match presets {
            Ok(names) => self.apply_preset_names(names),
            Err(e) => self.load_failed(&mut report, LoadStep::Presets, e),
        }

        // Both selectors are populated before the form and automation controls.
        let (config, automation) = futures::join!(self.api.runtime_config(), self.api.automation_config());
        match config {
            Ok(record) => {
                self.state.fill_form(&record);
                if report.is_clean() {
                    self.notify(Severity::Success, "Configuration loaded");
                }
            }
            Err(e) => self.load_failed(&mut report, LoadStep::Config, e),
        }
        match automation {
            Ok(stored) => self.apply_automation(&stored, !report.failed(LoadStep::Presets)),
            Err(e) => self.load_failed(&mut report, LoadStep::Automation, e),
        }

        self.set_activity(Activity::Idle);
        info!(
            "Console ready: {} tags, {} presets, {} load failures",
            self.state.tags.len(),
            self.state.presets.len(),
            report.failures.len()
        );
        report
    }

    fn load_failed(&mut self, report: &mut StartupReport, step: LoadStep, error: ApiError) {
        self.notify(Severity::Error, format!("Failed to load {}: {}", step, error));
        report.failures.push((step, error));
    }

    fn apply_tags(&mut self, tags: Vec<Tag>) {
        debug!("Loaded {} tags", tags.len());
        self.state.tags = tags;
        self.refresh();
    }

    fn apply_preset_names(&mut self, names: Vec<String>) {
        self.state.presets = names.into_iter().unique().collect();

        if let Some(selected) = self.state.selection.name() {
            if !self.state.has_preset(selected) {
                warn!("Selected preset {} is no longer listed", selected);
                self.state.selection = PresetSelection::Unselected;
            }
        }
        if let Some(auto) = self.state.auto_preset.as_deref() {
            if !self.state.has_preset(auto) {
                warn!("Automation preset {} is no longer listed", auto);
                self.state.auto_preset = None;
            }
        }
        self.refresh();
    }

    /// Missing values leave the controls as they are; an unknown preset name
    /// falls back to following the manual configuration.
    ///
    /// Without a preset list the stored name cannot be checked, so it stays
    /// unresolved and [`save_automation`](Self::save_automation) refuses to
    /// run until a preset is chosen explicitly.
    fn apply_automation(&mut self, stored: &StoredAutomation, presets_listed: bool) {
        if let Some(url) = stored.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            self.state.webhook_url = url.to_string();
        }

        match stored.unquoted_preset_name() {
            Some(name) if !presets_listed => {
                warn!("Automation preset {} cannot be checked without the preset list", name);
            }
            Some(name) if self.state.has_preset(&name) => {
                debug!("Automation preset resolved to {}", name);
                self.state.auto_preset = Some(name);
                self.auto_preset_known = true;
            }
            Some(name) => {
                warn!("Automation preset {} not found in preset list", name);
                self.state.auto_preset = None;
                self.auto_preset_known = true;
                self.notify(
                    Severity::Warning,
                    format!("Automation preset {} not found, following the manual configuration", name),
                );
            }
            None => self.auto_preset_known = true,
        }
        self.refresh();
    }

    // *************** Form ***************

    pub fn config_from_form(&self) -> ConfigurationRecord {
        self.state.config_from_form()
    }

    pub fn fill_form(&mut self, record: &PartialRecord) {
        self.preset_loads.issue();
        self.state.fill_form(record);
        self.refresh();
    }

    pub fn set_field(&mut self, field: ConfigField, value: impl Into<String>) {
        self.state.set_field(field, value);
        self.refresh();
    }

    pub fn reset_to_defaults(&mut self) {
        self.preset_loads.issue();
        self.state.reset_form();
        self.notify(Severity::Success, "Configuration reset to defaults");
    }

    pub fn tag_suggestions(&self, query: &str) -> Vec<SelectOption> {
        filter_options(&self.frame.tag_options, query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Writes the form to the runtime configuration, then to the selected
    /// preset if there is one. A failed preset write is not rolled back.
    pub async fn save_config(&mut self) -> Result<SaveOutcome, ApiError> {
        let record = self.state.config_from_form();

        if let Err(e) = self.api.save_runtime_config(&record).await {
            self.notify(Severity::Error, format!("Failed to save runtime configuration: {}", e));
            return Err(e);
        }

        let Some(preset) = self.state.selection.name().map(str::to_string) else {
            self.notify(Severity::Success, "Runtime configuration saved (no preset selected)");
            return Ok(SaveOutcome::Runtime);
        };

        match self.api.save_preset(&preset, &record).await {
            Ok(_) => {
                self.notify(
                    Severity::Success,
                    format!("Configuration saved (preset {} updated)", preset),
                );
                Ok(SaveOutcome::RuntimeAndPreset(preset))
            }
            Err(error) => {
                self.notify(
                    Severity::Warning,
                    format!("Runtime configuration saved, but updating preset {} failed: {}", preset, error),
                );
                Ok(SaveOutcome::PresetSyncFailed { preset, error })
            }
        }
    }

    // *************** Presets ***************

    /// Fetches the preset names again.
    pub async fn refresh_presets(&mut self) -> Result<(), ApiError> {
        match self.api.preset_names().await {
            Ok(names) => {
                self.apply_preset_names(names);
                Ok(())
            }
            Err(e) => {
                self.notify(Severity::Error, format!("Failed to load {}: {}", LoadStep::Presets, e));
                Err(e)
            }
        }
    }

    /// Loads a preset into the form without persisting anything.
    pub async fn select_preset(&mut self, name: &str) -> Result<PresetLoad, ApiError> {
        let Some(pending) = self.begin_preset_load(name) else {
            return Ok(PresetLoad::Applied);
        };
        let result = self.api.preset(&pending.name).await;
        self.complete_preset_load(pending, result)
    }

    /// Starts a load; an empty name clears the selection instead.
    pub fn begin_preset_load(&mut self, name: &str) -> Option<PendingPresetLoad> {
        let token = self.preset_loads.issue();
        if name.is_empty() {
            self.state.selection = PresetSelection::Unselected;
            self.refresh();
            return None;
        }
        Some(PendingPresetLoad {
            name: name.to_string(),
            token,
        })
    }

    pub fn complete_preset_load(
        &mut self,
        pending: PendingPresetLoad,
        result: Result<PartialRecord, ApiError>,
    ) -> Result<PresetLoad, ApiError> {
        if !self.preset_loads.is_current(pending.token) {
            debug!("Dropping stale load of preset {}", pending.name);
            return Ok(PresetLoad::Stale);
        }

        match result {
            Ok(record) => {
                self.state.fill_form(&record);
                self.state.selection = PresetSelection::Selected(pending.name.clone());
                self.notify(Severity::Success, format!("Loaded preset {}", pending.name));
                Ok(PresetLoad::Applied)
            }
            Err(e) => {
                self.notify(Severity::Error, format!("Failed to load preset {}: {}", pending.name, e));
                Err(e)
            }
        }
    }

    /// Creates or overwrites the preset `name` from the current form.
    pub async fn save_preset_as(&mut self, name: &str) -> Result<(), ApiError> {
        let name = name.trim();
        if name.is_empty() {
            let error = ApiError::Validation("Preset name must not be empty".to_string());
            self.notify(Severity::Error, error.to_string());
            return Err(error);
        }

        let record = self.state.config_from_form();
        if let Err(e) = self.api.save_preset(name, &record).await {
            self.notify(Severity::Error, e.to_string());
            return Err(e);
        }

        // Any load still in flight would overwrite the form that was just saved.
        self.preset_loads.issue();
        let listed = self.refresh_presets().await;
        if !self.state.has_preset(name) {
            self.state.presets.push(name.to_string());
        }
        self.state.selection = PresetSelection::Selected(name.to_string());
        if listed.is_ok() {
            self.notify(Severity::Success, format!("Preset {} saved", name));
        } else {
            self.refresh();
        }
        Ok(())
    }

    // *************** Automation ***************

    pub fn set_webhook_url(&mut self, url: impl Into<String>) {
        self.state.webhook_url = url.into();
        self.refresh();
    }

    /// `None` makes automated runs follow the manual configuration.
    pub fn set_auto_preset(&mut self, name: Option<&str>) -> Result<(), ApiError> {
        match name.filter(|n| !n.is_empty()) {
            Some(name) if !self.state.has_preset(name) => {
                let error = ApiError::Validation(format!("Unknown preset: {}", name));
                self.notify(Severity::Error, error.to_string());
                Err(error)
            }
            selected => {
                self.state.auto_preset = selected.map(str::to_string);
                self.auto_preset_known = true;
                self.refresh();
                Ok(())
            }
        }
    }

    pub async fn save_automation(&mut self) -> Result<(), ApiError> {
        if !self.auto_preset_known {
            let error = ApiError::Validation(
                "Stored automation preset is unknown, choose one before saving".to_string(),
            );
            self.notify(Severity::Error, error.to_string());
            return Err(error);
        }

        let automation = AutomationConfig {
            webhook_url: self.state.webhook_url.clone(),
            auto_preset_name: self.state.auto_preset.clone().unwrap_or_default(),
        };

        match self.api.save_automation_config(&automation).await {
            Ok(message) => {
                self.notify(Severity::Success, reply_text(message, "Automation settings saved"));
                Ok(())
            }
            Err(e) => {
                self.notify(Severity::Error, format!("Failed to save automation settings: {}", e));
                Err(e)
            }
        }
    }

    /// Sends a test message through `url`, or the configured webhook. Stored
    /// state is never touched.
    pub async fn test_webhook(&mut self, url: Option<&str>) -> Result<(), ApiError> {
        let url = url.unwrap_or(self.state.webhook_url.as_str()).trim().to_string();
        if url.is_empty() {
            let error = ApiError::Validation("Enter a webhook URL first".to_string());
            self.notify(Severity::Warning, error.to_string());
            return Err(error);
        }

        match self.api.test_webhook(&url).await {
            Ok(message) => {
                self.notify(Severity::Success, reply_text(message, "Test message sent"));
                Ok(())
            }
            Err(e) => {
                self.notify(Severity::Error, format!("Sending test message failed: {}", e));
                Err(e)
            }
        }
    }

    // *************** Scout ***************

    /// Persists the form, then runs a scout with the same record as payload.
    pub async fn scout(&mut self) -> Result<ScoutOutcome, ApiError> {
        let Some(ticket) = self.begin_scout() else {
            return Ok(ScoutOutcome::Ignored);
        };
        let span = tracing::info_span!("scout", run_id = %ticket.run_id);
        self.run_scout(ticket).instrument(span).await
    }

    async fn run_scout(&mut self, ticket: ScoutTicket) -> Result<ScoutOutcome, ApiError> {
        // Awaited so the two writes never race, but a failure does not stop
        // the scout: the backend reads the payload, not the stored config.
        let persisted = match self.api.save_runtime_config(&ticket.record).await {
            Ok(_) => true,
            Err(e) => {
                self.notify(
                    Severity::Warning,
                    format!("Could not save configuration before scouting: {}", e),
                );
                false
            }
        };

        self.set_activity(Activity::Scouting);
        let result = self.api.scout(&ticket.record).await;
        self.finish_scout(ticket, result, persisted)
    }

    /// Marks the console busy and captures the payload, unless a scout is
    /// already running.
    pub fn begin_scout(&mut self) -> Option<ScoutTicket> {
        if self.state.is_busy() {
            warn!("Scout requested while {:?}; ignoring", self.state.activity);
            return None;
        }

        let ticket = ScoutTicket {
            run_id: Uuid::new_v4(),
            record: self.state.config_from_form(),
        };
        info!("Starting scout run {}", ticket.run_id);
        self.set_activity(Activity::Saving);
        Some(ticket)
    }

    /// Always returns the console to idle.
    pub fn finish_scout(
        &mut self,
        ticket: ScoutTicket,
        result: Result<ScoutReply, ApiError>,
        persisted: bool,
    ) -> Result<ScoutOutcome, ApiError> {
        self.state.activity = Activity::Idle;

        match result {
            Ok(reply) => {
                if let Some(output) = reply.output.as_deref().filter(|o| !o.trim().is_empty()) {
                    debug!("Scout run {} output:\n{}", ticket.run_id, output);
                }
                self.state.results = Some(reply.markets.unwrap_or_default());
                self.notify(Severity::Success, "Scout complete");
                Ok(ScoutOutcome::Rendered { persisted })
            }
            Err(e) => {
                self.notify(Severity::Error, format!("Scout failed: {}", e));
                Err(e)
            }
        }
    }
}

/// The backend's own success message, if it sent one.
fn reply_text(message: Option<String>, fallback: &str) -> String {
    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

impl<A: ConsoleApi, V: View> fmt::Debug for Console<A, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

