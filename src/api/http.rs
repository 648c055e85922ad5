use super::{ApiError, ConsoleApi};
use crate::config::ConsoleSettings;
use crate::models::{
    ApiReply, AutomationConfig, ConfigurationRecord, PartialRecord, PresetUpsert, ScoutReply,
    StoredAutomation, Tag,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::*;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// reqwest-backed client for the scout backend.
#[derive(Debug, Clone)]
pub struct HttpConsoleApi {
    base_url: Url,
    client: Client,
}

#[derive(Debug, Serialize)]
struct WebhookTest<'a> {
    url: &'a str,
}

impl HttpConsoleApi {
    pub fn new(settings: &ConsoleSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid backend URL: {}", settings.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Backend URL cannot be used as a base: {}", settings.base_url);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { base_url, client })
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<(StatusCode, String), ApiError> {
        let url = self.endpoint(segments)?;
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("{}: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read response from {}: {}", url, e)))?;

        Ok((status, text))
    }

    /// GET returning a JSON document on success.
    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let (status, body) = self.send::<()>(Method::GET, segments, None).await?;

        if !status.is_success() {
            return Err(refusal(status, &body));
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            error!("Failed to parse response from /{}: {}, Body: {}", segments.join("/"), e, body);
            ApiError::Parse(e.to_string())
        })
    }

    /// POST answered with `{success, message?}`.
    async fn post_reply<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> Result<Option<String>, ApiError> {
        let (status, text) = self.send(Method::POST, segments, Some(body)).await?;

        match serde_json::from_str::<ApiReply>(&text) {
            Ok(reply) if reply.success => Ok(reply.message),
            Ok(reply) => Err(ApiError::Application(reply.failure_text())),
            Err(_) if !status.is_success() => Err(refusal(status, &text)),
            Err(e) => {
                error!("Failed to parse reply from /{}: {}, Body: {}", segments.join("/"), e, text);
                Err(ApiError::Parse(e.to_string()))
            }
        }
    }
}

/// Error for a non-2xx answer, preferring the backend's own message.
fn refusal(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ApiReply>(body) {
        Ok(reply) if reply.message.is_some() || reply.error.is_some() => {
            ApiError::Application(reply.failure_text())
        }
        _ => ApiError::Application(format!("HTTP {}: {}", status, body.trim())),
    }
}

#[async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.get_json(&["api", "tags"]).await
    }

    async fn preset_names(&self) -> Result<Vec<String>, ApiError> {
        self.get_json(&["api", "presets"]).await
    }

    async fn preset(&self, name: &str) -> Result<PartialRecord, ApiError> {
        self.get_json(&["api", "presets", name]).await
    }

    async fn save_preset(&self, name: &str, record: &ConfigurationRecord) -> Result<Option<String>, ApiError> {
        self.post_reply(&["api", "presets"], &PresetUpsert { name, config: record })
            .await
    }

    async fn runtime_config(&self) -> Result<PartialRecord, ApiError> {
        self.get_json(&["api", "config"]).await
    }

    async fn save_runtime_config(&self, record: &ConfigurationRecord) -> Result<Option<String>, ApiError> {
        self.post_reply(&["api", "config"], record).await
    }

    async fn automation_config(&self) -> Result<StoredAutomation, ApiError> {
        self.get_json(&["api", "config"]).await
    }

    async fn save_automation_config(&self, automation: &AutomationConfig) -> Result<Option<String>, ApiError> {
        self.post_reply(&["api", "config"], automation).await
    }

    async fn test_webhook(&self, url: &str) -> Result<Option<String>, ApiError> {
        self.post_reply(&["api", "test_webhook"], &WebhookTest { url }).await
    }

    async fn scout(&self, record: &ConfigurationRecord) -> Result<ScoutReply, ApiError> {
        let (status, text) = self.send(Method::POST, &["api", "scout"], Some(record)).await?;

        match serde_json::from_str::<ScoutReply>(&text) {
            Ok(reply) if reply.success => Ok(reply),
            Ok(reply) => Err(ApiError::Application(
                reply.message.unwrap_or_else(|| "scout failed".to_string()),
            )),
            Err(_) if !status.is_success() => Err(refusal(status, &text)),
            Err(e) => {
                error!("Failed to parse scout reply: {}, Body: {}", e, text);
                Err(ApiError::Parse(e.to_string()))
            }
        }
    }
}
