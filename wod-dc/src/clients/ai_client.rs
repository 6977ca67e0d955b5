//! AI assistant client
//!
//! Chat-completion client used as the structured field filler. Requests
//! carry a bounded context (the non-empty subset of a fixed field list)
//! and the missing field names; the response is expected to be strict
//! JSON mapping field -> value, where a value is either a bare string or
//! an object `{value, citation}`. Anything else is a malformed response
//! and treated as "no fill".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{ClientError, FillRequest, FillResponse, FilledValue, MetadataLookup, RateLimiter};

const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_COMPLETION_TOKENS: u32 = 300;
const TEMPERATURE: f64 = 0.4;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

pub struct AiClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    rate_limiter: RateLimiter,
}

impl AiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        min_interval_ms: u64,
    ) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            rate_limiter: RateLimiter::new(min_interval_ms),
        })
    }

    /// Deterministic prompt for a fill request. Also used as the cache key
    /// content, so equal requests hash equally across runs.
    pub fn build_prompt(request: &FillRequest) -> (String, String) {
        let system = "You are a senior CrossFit coach. Fill ONLY the requested fields \
                      with concise, coach-friendly text. Cite a source for numeric or \
                      factual claims. Return STRICT JSON only."
            .to_string();

        let context = serde_json::to_string(&request.context).unwrap_or_else(|_| "{}".into());
        let user = format!(
            "Fill these fields for this workout: {}.\n\nWorkout context:\n{}\n\n\
             Return JSON with exactly these keys. Each value may be a string or \
             an object {{\"value\": ..., \"citation\": ...}}.",
            request.fields.join(", "),
            context
        );
        (system, user)
    }

    /// Parse model output into a structured response. Tolerates both bare
    /// string values and `{value, citation}` objects; any other shape is
    /// malformed.
    pub fn parse_content(content: &str, fields: &[String]) -> Result<FillResponse, ClientError> {
        let parsed: Value = serde_json::from_str(content.trim())
            .map_err(|e| ClientError::Malformed(format!("not JSON: {e}")))?;
        let Value::Object(map) = parsed else {
            return Err(ClientError::Malformed("expected a JSON object".into()));
        };

        let mut values = BTreeMap::new();
        for field in fields {
            match map.get(field) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) if !s.trim().is_empty() => {
                    values.insert(
                        field.clone(),
                        FilledValue {
                            value: s.trim().to_string(),
                            citation: None,
                        },
                    );
                }
                Some(Value::Object(obj)) => {
                    let value = obj
                        .get("value")
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty());
                    if let Some(value) = value {
                        values.insert(
                            field.clone(),
                            FilledValue {
                                value: value.to_string(),
                                citation: obj
                                    .get("citation")
                                    .and_then(Value::as_str)
                                    .map(|c| c.trim().to_string())
                                    .filter(|c| !c.is_empty()),
                            },
                        );
                    }
                }
                Some(other) => {
                    return Err(ClientError::Malformed(format!(
                        "field {field} has unexpected shape: {other}"
                    )));
                }
            }
        }
        Ok(FillResponse { values })
    }
}

#[async_trait]
impl MetadataLookup for AiClient {
    async fn fill_fields(&self, request: &FillRequest) -> Result<FillResponse, ClientError> {
        self.rate_limiter.wait().await;

        let (system, user) = Self::build_prompt(request);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        tracing::debug!(id = %request.id, fields = ?request.fields, "Querying AI assistant");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ClientError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ClientError::Malformed("empty choices".into()))?;

        Self::parse_content(content, &request.fields)
    }
}
