use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProviderConfig;

/// Wrapper keys the provider has been observed nesting result lists under,
/// tried in order before falling back to an empty list.
const WRAPPER_KEYS: [&str; 3] = ["data", "items", "results"];

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,

    #[error("provider rejected search parameters: {0}")]
    Validation(String),

    #[error("provider error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },
}

/// The one external synchronous call that fetches lead candidates.
/// Implementations make a single attempt per request; retries are the
/// caller's responsibility.
#[async_trait]
pub trait LeadsProvider: Send + Sync {
    async fn fetch_leads(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Vec<Map<String, Value>>, ProviderError>;
}

/// HTTP client for the hosted leads-finder actor. The run endpoint is
/// synchronous on the provider side: it holds the connection open until the
/// dataset is ready, so the request timeout bounds the whole search
/// (~50 rows per 30s at observed throughput).
pub struct LeadsFinderClient {
    client: Client,
    base_url: String,
    actor: String,
    token: String,
}

impl LeadsFinderClient {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("Leadfinder/1.0")
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build provider HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            actor: config.actor.clone(),
            token: config.token.clone(),
        })
    }

    fn run_url(&self) -> String {
        format!(
            "{}/v2/acts/{}/run-sync-get-dataset-items?token={}",
            self.base_url, self.actor, self.token
        )
    }
}

#[async_trait]
impl LeadsProvider for LeadsFinderClient {
    async fn fetch_leads(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Vec<Map<String, Value>>, ProviderError> {
        let response = self
            .client
            .post(self.run_url())
            .json(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Upstream {
                        status: None,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error_body(status.as_u16(), &body));
        }

        let body: Value = response.json().await.map_err(|e| ProviderError::Upstream {
            status: Some(status.as_u16()),
            message: format!("Unparseable provider response: {e}"),
        })?;

        Ok(extract_leads(&body))
    }
}

/// Map a non-2xx provider body onto the error taxonomy. The provider wraps
/// structured errors as `{"error": {"type": ..., "message": ...}}`.
fn classify_error_body(status: u16, body: &str) -> ProviderError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let error_type = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/type"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(Value::as_str)
        .map_or_else(
            || {
                if body.is_empty() {
                    format!("provider returned status {status}")
                } else {
                    body.to_string()
                }
            },
            ToString::to_string,
        );

    if error_type.contains("invalid-input") || error_type.contains("validation") || status == 400 {
        ProviderError::Validation(message)
    } else {
        ProviderError::Upstream {
            status: Some(status),
            message,
        }
    }
}

/// Pull the lead list out of whichever envelope the provider used this time:
/// a bare array, or an object nesting the array under one of the known
/// wrapper keys. Zero extractable leads is not an error.
#[must_use]
pub fn extract_leads(body: &Value) -> Vec<Map<String, Value>> {
    if let Some(list) = as_lead_list(body) {
        return list;
    }

    if let Some(object) = body.as_object() {
        for key in WRAPPER_KEYS {
            if let Some(nested) = object.get(key)
                && let Some(list) = as_lead_list(nested)
            {
                debug!("Provider response nested leads under '{key}'");
                return list;
            }
        }
    }

    warn!("No recognizable lead list in provider response; treating as empty");
    Vec::new()
}

fn as_lead_list(value: &Value) -> Option<Vec<Map<String, Value>>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_top_level_array() {
        let body = json!([{ "first_name": "A" }, { "first_name": "B" }]);
        let leads = extract_leads(&body);
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0]["first_name"], "A");
    }

    #[test]
    fn extracts_from_wrapper_keys_in_order() {
        let body = json!({ "items": [{ "first_name": "A" }] });
        assert_eq!(extract_leads(&body).len(), 1);

        let body = json!({ "results": [{ "first_name": "A" }] });
        assert_eq!(extract_leads(&body).len(), 1);

        // "data" wins over later keys when both are present
        let body = json!({
            "data": [{ "first_name": "A" }],
            "results": [{ "first_name": "B" }, { "first_name": "C" }]
        });
        let leads = extract_leads(&body);
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0]["first_name"], "A");
    }

    #[test]
    fn unrecognized_envelope_yields_empty_not_error() {
        let body = json!({ "payload": [{ "first_name": "A" }] });
        assert!(extract_leads(&body).is_empty());

        let body = json!("not even an object");
        assert!(extract_leads(&body).is_empty());
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let body = json!([{ "first_name": "A" }, 42, "noise"]);
        assert_eq!(extract_leads(&body).len(), 1);
    }

    #[test]
    fn classifies_validation_errors() {
        let body = r#"{"error":{"type":"invalid-input","message":"bad fetch_count"}}"#;
        match classify_error_body(400, body) {
            ProviderError::Validation(msg) => assert_eq!(msg, "bad fetch_count"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn classifies_other_errors_as_upstream() {
        match classify_error_body(429, r#"{"error":{"type":"rate-limit-exceeded","message":"slow down"}}"#) {
            ProviderError::Upstream { status, message } => {
                assert_eq!(status, Some(429));
                assert_eq!(message, "slow down");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }

        match classify_error_body(500, "") {
            ProviderError::Upstream { status, .. } => assert_eq!(status, Some(500)),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
