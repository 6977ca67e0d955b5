//! External collaborator interfaces
//!
//! One capability per external service, injected into the Fill Router so
//! tests can substitute deterministic fakes: `MetadataLookup` (AI
//! assistant), `TextSearch` (web search), `Cache` (query-hash keyed
//! result store). Real implementations are reqwest clients with a
//! min-interval throttle and a JSON file cache.

pub mod ai_client;
pub mod cache;
pub mod throttle;
pub mod web_client;

pub use ai_client::AiClient;
pub use cache::FileCache;
pub use throttle::RateLimiter;
pub use web_client::WebSearchClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Collaborator call errors. Every variant means "no fill available" to
/// the router; none of them abort a run.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// One field-fill request: deterministic context subset plus the field
/// names to fill
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FillRequest {
    pub id: String,
    pub name: Option<String>,
    /// Context fields, already filtered to non-empty values
    pub context: BTreeMap<String, String>,
    /// Field names the caller wants values for
    pub fields: Vec<String>,
}

/// One filled value, optionally backed by a source citation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilledValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

/// Structured field->value response from the AI assistant
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FillResponse {
    pub values: BTreeMap<String, FilledValue>,
}

/// AI text-completion service returning structured field values
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn fill_fields(&self, request: &FillRequest) -> Result<FillResponse, ClientError>;
}

/// Web search/fetch service returning unstructured snippets
#[async_trait]
pub trait TextSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>, ClientError>;
}

/// Query-result cache, get/set semantics only, keyed by content hash
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str);
}

/// No-op cache for dry runs and tests
pub struct NullCache;

#[async_trait]
impl Cache for NullCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str) {}
}
