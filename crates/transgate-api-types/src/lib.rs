//! Wire types for the transgate HTTP API.
//!
//! Both the gateway and its clients serialize through these structs, so field
//! names here are the public contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Caller-supplied identifier used as the key of every result map.
pub type CallerId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslateRequest {
    pub texts: Vec<String>,
    pub ids: Vec<CallerId>,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslateResponse {
    /// Translation per caller id. Failed items carry a placeholder string.
    pub translations: BTreeMap<CallerId, String>,
    /// Failure reason per caller id for items whose batch could not be translated.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<CallerId, String>,
    pub cached_count: usize,
    pub translated_count: usize,
    /// Set when the request deadline expired before every batch was dispatched.
    #[serde(default)]
    pub incomplete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslateTextRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslateTextResponse {
    pub translation: String,
    pub cached: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CacheHealth {
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "disconnected")]
    Disconnected,
    #[serde(rename = "not initialized")]
    NotInitialized,
}

impl CacheHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheHealth::Connected => "connected",
            CacheHealth::Disconnected => "disconnected",
            CacheHealth::NotInitialized => "not initialized",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelHealth {
    pub loaded: bool,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub model: ModelHealth,
    pub cache: CacheHealth,
    pub supported_languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
