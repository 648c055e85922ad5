// src/models/mod.rs
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One control of the configuration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigField {
    MinVolume,
    MinProb,
    MaxProb,
    Tag,
    MinLiquidity,
    MaxDaysToEnd,
    Search,
    ExcludeKeywords,
    OrderBy,
    FetchLimit,
    RuntimeLimit,
}

impl ConfigField {
    pub const ALL: [ConfigField; 11] = [
        ConfigField::MinVolume,
        ConfigField::MinProb,
        ConfigField::MaxProb,
        ConfigField::Tag,
        ConfigField::MinLiquidity,
        ConfigField::MaxDaysToEnd,
        ConfigField::Search,
        ConfigField::ExcludeKeywords,
        ConfigField::OrderBy,
        ConfigField::FetchLimit,
        ConfigField::RuntimeLimit,
    ];

    /// Key used by the backend in JSON bodies.
    pub fn wire_key(&self) -> &'static str {
        match self {
            ConfigField::MinVolume => "SCOUT_MIN_VOLUME",
            ConfigField::MinProb => "SCOUT_MIN_PROB",
            ConfigField::MaxProb => "SCOUT_MAX_PROB",
            ConfigField::Tag => "SCOUT_TAG",
            ConfigField::MinLiquidity => "SCOUT_MIN_LIQUIDITY",
            ConfigField::MaxDaysToEnd => "SCOUT_MAX_DAYS_TO_END",
            ConfigField::Search => "SCOUT_SEARCH",
            ConfigField::ExcludeKeywords => "SCOUT_EXCLUDE_KEYWORDS",
            ConfigField::OrderBy => "SCOUT_ORDER_BY",
            ConfigField::FetchLimit => "SCOUT_FETCH_LIMIT",
            ConfigField::RuntimeLimit => "SCOUT_RUNTIME_LIMIT",
        }
    }

    /// Name of the form control.
    pub fn form_name(&self) -> &'static str {
        match self {
            ConfigField::MinVolume => "minVolume",
            ConfigField::MinProb => "minProb",
            ConfigField::MaxProb => "maxProb",
            ConfigField::Tag => "tag",
            ConfigField::MinLiquidity => "minLiquidity",
            ConfigField::MaxDaysToEnd => "maxDaysToEnd",
            ConfigField::Search => "search",
            ConfigField::ExcludeKeywords => "excludeKeywords",
            ConfigField::OrderBy => "orderBy",
            ConfigField::FetchLimit => "fetchLimit",
            ConfigField::RuntimeLimit => "runtimeLimit",
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            ConfigField::MinVolume => "5000",
            ConfigField::MinProb => "0.15",
            ConfigField::MaxProb => "0.85",
            ConfigField::OrderBy => "volume",
            ConfigField::FetchLimit => "200",
            ConfigField::RuntimeLimit => "30",
            ConfigField::Tag
            | ConfigField::MinLiquidity
            | ConfigField::MaxDaysToEnd
            | ConfigField::Search
            | ConfigField::ExcludeKeywords => "",
        }
    }

    /// Accepts either the form name or the wire key.
    pub fn parse(name: &str) -> Option<ConfigField> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.form_name() == name || f.wire_key() == name)
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.form_name())
    }
}

/// A configuration as it arrives from the backend: any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialRecord {
    values: BTreeMap<ConfigField, String>,
}

impl PartialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: ConfigField, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn get(&self, field: ConfigField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: ConfigField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fills every missing field with its default.
    pub fn complete(&self) -> ConfigurationRecord {
        let mut record = ConfigurationRecord::default();
        for field in ConfigField::ALL {
            if let Some(value) = self.get(field) {
                record.set(field, value);
            }
        }
        record
    }

    /// Reads the known fields out of a JSON object, ignoring the rest.
    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut record = Self::new();
        for field in ConfigField::ALL {
            if let Some(value) = map.get(field.wire_key()).and_then(wire_string) {
                record.set(field, value);
            }
        }
        record
    }
}

impl From<ConfigurationRecord> for PartialRecord {
    fn from(record: ConfigurationRecord) -> Self {
        Self {
            values: record.values,
        }
    }
}

impl<'de> Deserialize<'de> for PartialRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Object(map) => Ok(Self::from_json_map(&map)),
            other => Err(de::Error::custom(format!(
                "expected a configuration object, got {}",
                other
            ))),
        }
    }
}

/// Strings are kept as-is, numbers and booleans are stringified, null is missing.
fn wire_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A complete configuration: every field holds a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationRecord {
    values: BTreeMap<ConfigField, String>,
}

impl Default for ConfigurationRecord {
    fn default() -> Self {
        Self {
            values: ConfigField::ALL
                .iter()
                .map(|f| (*f, f.default_value().to_string()))
                .collect(),
        }
    }
}

impl ConfigurationRecord {
    pub fn get(&self, field: ConfigField) -> &str {
        self.values
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| field.default_value())
    }

    pub fn set(&mut self, field: ConfigField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConfigField, &str)> {
        ConfigField::ALL.iter().map(move |f| (*f, self.get(*f)))
    }
}

impl Serialize for ConfigurationRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(ConfigField::ALL.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.wire_key(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConfigurationRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        PartialRecord::deserialize(deserializer).map(|p| p.complete())
    }
}

pub const WEBHOOK_URL_KEY: &str = "SCOUT_WEBHOOK_URL";
pub const AUTO_PRESET_KEY: &str = "SCOUT_AUTO_PRESET";

/// Settings used by unattended scout runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(rename = "SCOUT_WEBHOOK_URL", default)]
    pub webhook_url: String,
    #[serde(rename = "SCOUT_AUTO_PRESET", default)]
    pub auto_preset_name: String,
}

/// Automation values as read back; either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoredAutomation {
    #[serde(rename = "SCOUT_WEBHOOK_URL", default)]
    pub webhook_url: Option<String>,
    #[serde(rename = "SCOUT_AUTO_PRESET", default)]
    pub auto_preset_name: Option<String>,
}

impl StoredAutomation {
    /// Stored names may carry quotes left over from the `.env` file.
    pub fn unquoted_preset_name(&self) -> Option<String> {
        self.auto_preset_name
            .as_deref()
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
}

/// Body of `POST /api/presets`.
#[derive(Debug, Clone, Serialize)]
pub struct PresetUpsert<'a> {
    pub name: &'a str,
    pub config: &'a ConfigurationRecord,
}

/// `{success, message?}` as returned by every write endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiReply {
    pub fn failure_text(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoutReply {
    #[serde(default)]
    pub success: bool,
    /// Pre-rendered by the backend; shown verbatim.
    #[serde(default)]
    pub markets: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_record_completes_with_defaults() {
        let partial = PartialRecord::new().with(ConfigField::MinVolume, "10000");
        let record = partial.complete();
        assert_eq!(record.get(ConfigField::MinVolume), "10000");
        assert_eq!(record.get(ConfigField::MinProb), "0.15");
        assert_eq!(record.get(ConfigField::MaxProb), "0.85");
        assert_eq!(record.get(ConfigField::OrderBy), "volume");
        assert_eq!(record.get(ConfigField::Tag), "");
    }

    #[test]
    fn test_deserialize_tolerates_numbers_and_unknown_keys() {
        let body = json!({
            "SCOUT_MIN_VOLUME": 7500,
            "SCOUT_TAG": "Crypto",
            "SCOUT_SEARCH": null,
            "SCOUT_WEBHOOK_URL": "https://hooks.example/x"
        });
        let partial: PartialRecord = serde_json::from_value(body).unwrap();
        assert_eq!(partial.len(), 2);
        assert_eq!(partial.get(ConfigField::MinVolume), Some("7500"));
        assert_eq!(partial.get(ConfigField::Search), None);
    }

    #[test]
    fn test_record_serializes_with_wire_keys() {
        let value = serde_json::to_value(ConfigurationRecord::default()).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 11);
        assert_eq!(map["SCOUT_FETCH_LIMIT"], "200");
        assert_eq!(map["SCOUT_RUNTIME_LIMIT"], "30");
        assert_eq!(map["SCOUT_EXCLUDE_KEYWORDS"], "");
    }

    #[test]
    fn test_field_parse_accepts_both_names() {
        assert_eq!(ConfigField::parse("minVolume"), Some(ConfigField::MinVolume));
        assert_eq!(ConfigField::parse("SCOUT_ORDER_BY"), Some(ConfigField::OrderBy));
        assert_eq!(ConfigField::parse("volume"), None);
    }

    #[test]
    fn test_unquoted_preset_name() {
        let stored = StoredAutomation {
            webhook_url: None,
            auto_preset_name: Some("\"aggressive\"".to_string()),
        };
        assert_eq!(stored.unquoted_preset_name().as_deref(), Some("aggressive"));

        let single = StoredAutomation {
            webhook_url: None,
            auto_preset_name: Some("'safe'".to_string()),
        };
        assert_eq!(single.unquoted_preset_name().as_deref(), Some("safe"));

        let blank = StoredAutomation {
            webhook_url: None,
            auto_preset_name: Some("\"\"".to_string()),
        };
        assert_eq!(blank.unquoted_preset_name(), None);
    }
}
