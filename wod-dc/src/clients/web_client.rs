//! Web search client
//!
//! Last-resort snippet source. A query returns a handful of plain-text
//! snippets; the router only uses these as citations for values it
//! already obtained, never as field content on their own.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{ClientError, RateLimiter, TextSearch};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_SNIPPETS: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

pub struct WebSearchClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl WebSearchClient {
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
            rate_limiter: RateLimiter::new(min_interval_ms),
        })
    }
}

#[async_trait]
impl TextSearch for WebSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<String>, ClientError> {
        self.rate_limiter.wait().await;

        tracing::debug!(query = %query, "Web search");

        let response = self
            .http_client
            .get(&self.endpoint)
            .bearer_auth(&self.api_key)
            .query(&[("q", query)])
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

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| r.snippet.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(MAX_SNIPPETS)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parse_skips_blank_snippets() {
        let raw = r#"{"results": [{"snippet": "Fran is 21-15-9"}, {"snippet": "  "}, {}]}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let snippets: Vec<String> = parsed
            .results
            .into_iter()
            .map(|r| r.snippet.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(snippets, vec!["Fran is 21-15-9".to_string()]);
    }

    #[test]
    fn test_response_parse_tolerates_missing_results() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }
}
