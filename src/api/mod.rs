use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub mod client;
pub mod error;

#[cfg(test)]
mod tests;

pub use client::{ApiClient, NovaApi};
pub use error::ApiError;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

#[derive(Debug, Serialize, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub memory_enabled: bool,
    pub metadata: Map<String, Value>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            session_id,
            memory_enabled: true,
            metadata: Map::new(),
        }
    }

    pub fn with_memory(mut self, enabled: bool) -> Self {
        self.memory_enabled = enabled;
        self
    }

    /// Route the reply through a specific model instead of the server default.
    pub fn with_model(mut self, model: Option<&str>) -> Self {
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.metadata
                .insert("model".to_string(), Value::String(model.to_string()));
        }
        self
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChatResponse {
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub tokens_used: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Session {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_true")]
    pub memory_enabled: bool,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SessionMessage {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RenameRequest<'a> {
    pub title: &'a str,
}

/// Category name to learned values, e.g. `likes -> ["i love hiking"]`.
pub type Preferences = BTreeMap<String, Vec<String>>;

#[derive(Debug, Deserialize)]
pub(crate) struct PreferencesEnvelope {
    #[serde(default)]
    pub preferences: Map<String, Value>,
}

impl PreferencesEnvelope {
    pub fn into_preferences(self) -> Preferences {
        self.preferences
            .into_iter()
            .map(|(category, value)| (category, preference_values(value)))
            .collect()
    }
}

fn preference_values(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct StoreMemoryRequest {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoredMemory {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct MemorySearchRequest {
    pub query: String,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MemoryEntry {
    pub id: String,
    pub content: String,
    #[serde(rename = "type", default = "default_memory_type")]
    pub kind: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, deserialize_with = "timestamp::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub recent: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecentMemories {
    #[serde(default)]
    pub memories: Vec<MemoryEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResults {
    #[serde(default)]
    pub results: Vec<MemoryEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConsolidateRequest {
    pub days: u32,
}

/// Plain `{"message": "..."}` acknowledgement returned by mutating endpoints.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthStatus {
    pub status: String,
}

fn default_title() -> String {
    DEFAULT_SESSION_TITLE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_memory_type() -> String {
    "general".to_string()
}

/// The backend emits `datetime.utcnow()` values without an offset; those are UTC.
pub(crate) mod timestamp {
    use super::*;

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }
}
