// tests/support/mod.rs
//! In-memory stand-in for the scout backend.
#![allow(dead_code)]

use async_trait::async_trait;
use scout_console::models::{ScoutReply, StoredAutomation};
use scout_console::{
    ApiError, AutomationConfig, ConfigurationRecord, Console, ConsoleApi, ConsoleSettings, HeadlessView,
    PartialRecord, Tag,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tags,
    PresetNames,
    Preset,
    SavePreset,
    RuntimeConfig,
    SaveRuntime,
    AutomationConfig,
    SaveAutomation,
    TestWebhook,
    Scout,
}

/// One request as the backend saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Tags,
    PresetNames,
    Preset(String),
    SavePreset { name: String, config: Value },
    RuntimeConfig,
    SaveRuntime(Value),
    AutomationConfig,
    SaveAutomation(Value),
    TestWebhook(String),
    Scout(Value),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::SavePreset { .. } | Call::SaveRuntime(_) | Call::SaveAutomation(_)
        )
    }
}

#[derive(Default)]
struct Backend {
    tags: Vec<Tag>,
    presets: Vec<(String, Value)>,
    config: Map<String, Value>,
    failures: HashMap<Endpoint, ApiError>,
    scout_reply: Option<ScoutReply>,
    webhook_reply: Option<String>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeApi {
    backend: Mutex<Backend>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(self, labels: &[&str]) -> Self {
        self.backend.lock().unwrap().tags = labels
            .iter()
            .map(|l| Tag { label: l.to_string() })
            .collect();
        self
    }

    pub fn with_preset(self, name: &str, config: Value) -> Self {
        self.backend
            .lock()
            .unwrap()
            .presets
            .push((name.to_string(), config));
        self
    }

    pub fn with_config(self, config: Value) -> Self {
        if let Value::Object(map) = config {
            self.backend.lock().unwrap().config = map;
        }
        self
    }

    pub fn failing(self, endpoint: Endpoint, error: ApiError) -> Self {
        self.backend.lock().unwrap().failures.insert(endpoint, error);
        self
    }

    pub fn with_scout_reply(self, reply: ScoutReply) -> Self {
        self.backend.lock().unwrap().scout_reply = Some(reply);
        self
    }

    pub fn with_webhook_reply(self, message: &str) -> Self {
        self.backend.lock().unwrap().webhook_reply = Some(message.to_string());
        self
    }

    pub fn fail(&self, endpoint: Endpoint, error: ApiError) {
        self.backend.lock().unwrap().failures.insert(endpoint, error);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.backend.lock().unwrap().failures.remove(&endpoint);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.backend.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.backend.lock().unwrap().calls.clear();
    }

    pub fn preset_names(&self) -> Vec<String> {
        self.backend
            .lock()
            .unwrap()
            .presets
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn stored_preset(&self, name: &str) -> Option<Value> {
        self.backend
            .lock()
            .unwrap()
            .presets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn stored_config(&self) -> Map<String, Value> {
        self.backend.lock().unwrap().config.clone()
    }

    /// Records the call and returns the injected failure, if any.
    fn enter(&self, endpoint: Endpoint, call: Call) -> Result<std::sync::MutexGuard<'_, Backend>, ApiError> {
        let mut backend = self.backend.lock().unwrap();
        backend.calls.push(call);
        if let Some(error) = backend.failures.get(&endpoint).cloned() {
            return Err(error);
        }
        Ok(backend)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap()
}

#[async_trait]
impl ConsoleApi for FakeApi {
    async fn tags(&self) -> Result<Vec<Tag>, ApiError> {
        let backend = self.enter(Endpoint::Tags, Call::Tags)?;
        Ok(backend.tags.clone())
    }

    async fn preset_names(&self) -> Result<Vec<String>, ApiError> {
        let backend = self.enter(Endpoint::PresetNames, Call::PresetNames)?;
        Ok(backend.presets.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn preset(&self, name: &str) -> Result<PartialRecord, ApiError> {
        let backend = self.enter(Endpoint::Preset, Call::Preset(name.to_string()))?;
        let (_, config) = backend
            .presets
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| ApiError::Application("方案不存在".to_string()))?;
        serde_json::from_value(config.clone()).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn save_preset(&self, name: &str, record: &ConfigurationRecord) -> Result<Option<String>, ApiError> {
        let config = to_json(record);
        let mut backend = self.enter(
            Endpoint::SavePreset,
            Call::SavePreset {
                name: name.to_string(),
                config: config.clone(),
            },
        )?;
        match backend.presets.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = config,
            None => backend.presets.push((name.to_string(), config)),
        }
        Ok(Some("方案已保存".to_string()))
    }

    async fn runtime_config(&self) -> Result<PartialRecord, ApiError> {
        let backend = self.enter(Endpoint::RuntimeConfig, Call::RuntimeConfig)?;
        Ok(PartialRecord::from_json_map(&backend.config))
    }

    async fn save_runtime_config(&self, record: &ConfigurationRecord) -> Result<Option<String>, ApiError> {
        let body = to_json(record);
        let mut backend = self.enter(Endpoint::SaveRuntime, Call::SaveRuntime(body.clone()))?;
        if let Value::Object(map) = body {
            backend.config.extend(map);
        }
        Ok(Some("配置已保存".to_string()))
    }

    async fn automation_config(&self) -> Result<StoredAutomation, ApiError> {
        let backend = self.enter(Endpoint::AutomationConfig, Call::AutomationConfig)?;
        serde_json::from_value(Value::Object(backend.config.clone())).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn save_automation_config(&self, automation: &AutomationConfig) -> Result<Option<String>, ApiError> {
        let body = to_json(automation);
        let mut backend = self.enter(Endpoint::SaveAutomation, Call::SaveAutomation(body.clone()))?;
        if let Value::Object(map) = body {
            backend.config.extend(map);
        }
        Ok(Some("配置已保存".to_string()))
    }

    async fn test_webhook(&self, url: &str) -> Result<Option<String>, ApiError> {
        let backend = self.enter(Endpoint::TestWebhook, Call::TestWebhook(url.to_string()))?;
        Ok(backend.webhook_reply.clone())
    }

    async fn scout(&self, record: &ConfigurationRecord) -> Result<ScoutReply, ApiError> {
        let backend = self.enter(Endpoint::Scout, Call::Scout(to_json(record)))?;
        Ok(backend.scout_reply.clone().unwrap_or(ScoutReply {
            success: true,
            markets: Some("<div>no markets</div>".to_string()),
            output: None,
            message: None,
        }))
    }
}

pub fn console(api: FakeApi) -> Console<FakeApi, HeadlessView> {
    Console::new(api, HeadlessView::new(), &ConsoleSettings::default())
}

/// Console after a clean startup against `api`.
pub async fn started(api: FakeApi) -> Console<FakeApi, HeadlessView> {
    let mut console = console(api);
    let report = console.startup().await;
    assert!(report.is_clean(), "unexpected startup failures: {:?}", report.failures);
    console.api().clear_calls();
    console
}
