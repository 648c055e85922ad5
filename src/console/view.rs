// src/console/view.rs
use super::notify::Notification;
use super::state::ConsoleState;
use crate::models::ConfigField;
use itertools::Itertools;
use std::collections::BTreeMap;
use tokio::time::Instant;

pub const GLOBAL_SCAN_LABEL: &str = "全局扫描";
pub const PRESET_PLACEHOLDER: &str = "-- 选择预设方案 --";
pub const AUTO_PRESET_PLACEHOLDER: &str = "-- 跟随当前手动配置 --";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    fn named(name: &str) -> Self {
        Self::new(name, name)
    }
}

/// A selector: its options and the selected value (`""` is the placeholder).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    pub options: Vec<SelectOption>,
    pub selected: String,
}

impl Selector {
    pub fn labels(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.label.as_str()).collect()
    }
}

/// Everything visible at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub fields: BTreeMap<ConfigField, String>,
    pub tag_options: Vec<SelectOption>,
    pub presets: Selector,
    pub auto_preset: Selector,
    pub webhook_url: String,
    pub scout_enabled: bool,
    pub status: Option<String>,
    pub results: Option<String>,
    pub notification: Option<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    Field { field: ConfigField, value: String },
    TagOptions(Vec<SelectOption>),
    Presets(Selector),
    AutoPreset(Selector),
    WebhookUrl(String),
    ScoutEnabled(bool),
    Status(Option<String>),
    Results(Option<String>),
    Notification(Option<Notification>),
}

/// Projects the console state onto a frame.
pub fn render(state: &ConsoleState, now: Instant) -> Frame {
    let fields = state
        .form
        .iter()
        .map(|(field, value)| (field, value.to_string()))
        .collect();

    let tag_options = std::iter::once(SelectOption::new("", GLOBAL_SCAN_LABEL))
        .chain(
            state
                .tags
                .iter()
                .map(|t| t.label.as_str())
                .filter(|label| !label.is_empty())
                .unique()
                .map(SelectOption::named),
        )
        .collect();

    let presets = Selector {
        options: preset_options(PRESET_PLACEHOLDER, &state.presets),
        selected: state.selection.name().unwrap_or_default().to_string(),
    };

    let auto_preset = Selector {
        options: preset_options(AUTO_PRESET_PLACEHOLDER, &state.presets),
        selected: state.auto_preset.clone().unwrap_or_default(),
    };

    Frame {
        fields,
        tag_options,
        presets,
        auto_preset,
        webhook_url: state.webhook_url.clone(),
        scout_enabled: !state.is_busy(),
        status: state.activity.status_text().map(str::to_string),
        results: state.results.clone(),
        notification: state.notice.clone().filter(|n| !n.is_expired(now)),
    }
}

fn preset_options(placeholder: &str, names: &[String]) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", placeholder))
        .chain(names.iter().map(|n| SelectOption::named(n)))
        .collect()
}

/// Options whose label contains `query`, ignoring case.
pub fn filter_options<'a>(options: &'a [SelectOption], query: &str) -> Vec<&'a SelectOption> {
    let query = query.to_lowercase();
    options
        .iter()
        .filter(|o| o.label.to_lowercase().contains(&query))
        .collect()
}

impl Frame {
    pub fn field(&self, field: ConfigField) -> &str {
        self.fields.get(&field).map(String::as_str).unwrap_or_default()
    }

    /// Updates that turn `self` into `next`.
    pub fn diff(&self, next: &Frame) -> Vec<ViewUpdate> {
        let mut updates = Vec::new();

        for (field, value) in &next.fields {
            if self.fields.get(field) != Some(value) {
                updates.push(ViewUpdate::Field {
                    field: *field,
                    value: value.clone(),
                });
            }
        }
        if self.tag_options != next.tag_options {
            updates.push(ViewUpdate::TagOptions(next.tag_options.clone()));
        }
        if self.presets != next.presets {
            updates.push(ViewUpdate::Presets(next.presets.clone()));
        }
        if self.auto_preset != next.auto_preset {
            updates.push(ViewUpdate::AutoPreset(next.auto_preset.clone()));
        }
        if self.webhook_url != next.webhook_url {
            updates.push(ViewUpdate::WebhookUrl(next.webhook_url.clone()));
        }
        if self.scout_enabled != next.scout_enabled {
            updates.push(ViewUpdate::ScoutEnabled(next.scout_enabled));
        }
        if self.status != next.status {
            updates.push(ViewUpdate::Status(next.status.clone()));
        }
        if self.results != next.results {
            updates.push(ViewUpdate::Results(next.results.clone()));
        }
        if self.notification != next.notification {
            updates.push(ViewUpdate::Notification(next.notification.clone()));
        }

        updates
    }

    pub fn apply(&mut self, update: &ViewUpdate) {
        match update {
            ViewUpdate::Field { field, value } => {
                self.fields.insert(*field, value.clone());
            }
            ViewUpdate::TagOptions(options) => self.tag_options = options.clone(),
            ViewUpdate::Presets(selector) => self.presets = selector.clone(),
            ViewUpdate::AutoPreset(selector) => self.auto_preset = selector.clone(),
            ViewUpdate::WebhookUrl(url) => self.webhook_url = url.clone(),
            ViewUpdate::ScoutEnabled(enabled) => self.scout_enabled = *enabled,
            ViewUpdate::Status(status) => self.status = status.clone(),
            ViewUpdate::Results(results) => self.results = results.clone(),
            ViewUpdate::Notification(note) => self.notification = note.clone(),
        }
    }
}

/// Receives the changes produced by each state transition.
pub trait View {
    fn apply(&mut self, updates: &[ViewUpdate]);
}

/// Keeps a copy of the frame in memory; used by tests and scripted runs.
#[derive(Debug, Default)]
pub struct HeadlessView {
    frame: Frame,
    notifications: Vec<Notification>,
    batches: usize,
}

impl HeadlessView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Every notification shown so far, oldest first.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn last_notification(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    pub fn batches(&self) -> usize {
        self.batches
    }
}

impl View for HeadlessView {
    fn apply(&mut self, updates: &[ViewUpdate]) {
        self.batches += 1;
        for update in updates {
            if let ViewUpdate::Notification(Some(note)) = update {
                self.notifications.push(note.clone());
            }
            self.frame.apply(update);
        }
    }
}
