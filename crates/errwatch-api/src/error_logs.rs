use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::{is_retryable_status, with_retry, RetryConfig};

const ADMIN_PROXY_PATH: &str = "/api/admin/supabase-error_logs";
const POSTGREST_PATH: &str = "/rest/v1/error_logs";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Source reported failure: {0}")]
    Rejected(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether another attempt has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            ApiError::NetworkError(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Which flavour of endpoint serves the error log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// Admin proxy returning `{ success, errors, count, total, source }`
    #[default]
    AdminProxy,
    /// PostgREST table endpoint returning a bare array
    #[serde(rename = "postgrest")]
    PostgRest,
}

/// Record identifier as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Int(i64),
    Text(String),
}

/// One row of the `error_logs` table, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireErrorLog {
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub type_error: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Result of one successful fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorLogBatch {
    pub records: Vec<WireErrorLog>,
    /// List elements that were not record-shaped and got dropped
    pub skipped: usize,
    /// Free-text origin reported by the admin proxy
    pub source: Option<String>,
}

pub struct ErrorLogClient {
    client: reqwest::Client,
    base_url: String,
    kind: EndpointKind,
    api_key: Option<String>,
    retry_config: RetryConfig,
}

impl ErrorLogClient {
    pub fn new(base_url: impl Into<String>, kind: EndpointKind, api_key: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, kind, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        kind: EndpointKind,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!("errwatch/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            kind,
            api_key,
            retry_config: RetryConfig::default(),
        })
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn endpoint_url(&self) -> String {
        let path = match self.kind {
            EndpointKind::AdminProxy => ADMIN_PROXY_PATH,
            EndpointKind::PostgRest => POSTGREST_PATH,
        };
        format!("{}{}", self.base_url, path)
    }

    /// Fetch up to `limit` of the most recent error records
    pub async fn fetch_recent(&self, limit: u32) -> Result<ErrorLogBatch> {
        let url = self.endpoint_url();
        let limit = limit.to_string();

        with_retry(&self.retry_config, ApiError::is_retryable, || async {
            let mut request = self.client.get(&url);

            request = match self.kind {
                EndpointKind::AdminProxy => request.query(&[("limit", limit.as_str())]),
                EndpointKind::PostgRest => request.query(&[
                    ("order", "created_at.desc"),
                    ("limit", limit.as_str()),
                    ("select", "*"),
                ]),
            };

            if let Some(ref key) = self.api_key {
                if self.kind == EndpointKind::PostgRest {
                    request = request.header("apikey", key);
                }
                request = request.bearer_auth(key);
            }

            debug!("Fetching error logs from {} (limit {})", url, limit);
            let response = request.send().await?;
            let status = response.status();

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    body: truncate(&body, 500),
                });
            }

            let body = response.text().await?;
            let batch = parse_payload(&body)?;
            if batch.skipped > 0 {
                warn!("Dropped {} malformed entries from error log payload", batch.skipped);
            }
            Ok(batch)
        })
        .await
    }
}

/// Decode a response body in either wire shape
///
/// A bare array is the PostgREST shape. An object is the admin-proxy envelope:
/// `success: false` is a failure even with a 200 status, and a successful
/// envelope without `errors` is an empty batch.
pub fn parse_payload(body: &str) -> Result<ErrorLogBatch> {
    let value: Value = serde_json::from_str(body)?;

    match value {
        Value::Array(items) => Ok(collect_records(items, None)),
        Value::Object(mut envelope) => {
            let success = envelope
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            if !success {
                let message = envelope
                    .get("message")
                    .or_else(|| envelope.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("success flag was not set")
                    .to_string();
                return Err(ApiError::Rejected(message));
            }

            let source = envelope
                .get("source")
                .and_then(Value::as_str)
                .map(str::to_string);

            match envelope.remove("errors") {
                Some(Value::Array(items)) => Ok(collect_records(items, source)),
                None | Some(Value::Null) => Ok(ErrorLogBatch {
                    source,
                    ..ErrorLogBatch::default()
                }),
                Some(other) => Err(ApiError::Malformed(format!(
                    "expected `errors` to be a list, got {}",
                    json_kind(&other)
                ))),
            }
        }
        other => Err(ApiError::Malformed(format!(
            "expected an object or a list, got {}",
            json_kind(&other)
        ))),
    }
}

fn collect_records(items: Vec<Value>, source: Option<String>) -> ErrorLogBatch {
    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for item in items {
        match serde_json::from_value::<WireErrorLog>(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!("Skipping error log entry: {}", e);
                skipped += 1;
            }
        }
    }

    ErrorLogBatch {
        records,
        skipped,
        source,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_with_records() {
        let body = r#"{
            "success": true,
            "errors": [
                {"id": 7, "error_message": "boom", "type_error": "ValueError", "node": "api", "created_at": "2024-05-01T10:00:00+00:00"},
                {"id": "abc", "created_at": "2024-05-01T11:00:00"}
            ],
            "count": 2,
            "total": 2,
            "source": "Supabase Database"
        }"#;

        let batch = parse_payload(body).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 0);
        assert_eq!(batch.source.as_deref(), Some("Supabase Database"));
        assert_eq!(batch.records[0].id, Some(WireId::Int(7)));
        assert_eq!(batch.records[1].id, Some(WireId::Text("abc".into())));
        assert_eq!(batch.records[1].type_error, None);
        assert_eq!(batch.records[1].node, None);
    }

    #[test]
    fn test_bare_array_is_postgrest_shape() {
        let body = r#"[{"id": 1, "type_error": "n8n", "created_at": "2024-05-01T10:00:00Z"}]"#;
        let batch = parse_payload(body).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.source, None);
    }

    #[test]
    fn test_success_false_without_list_is_rejected() {
        let body = r#"{"success": false, "message": "Server configuration error"}"#;
        match parse_payload(body) {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Server configuration error"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_success_flag_is_rejected() {
        assert!(matches!(
            parse_payload(r#"{"errors": []}"#),
            Err(ApiError::Rejected(_))
        ));
    }

    #[test]
    fn test_success_without_errors_is_empty() {
        let batch = parse_payload(r#"{"success": true}"#).unwrap();
        assert!(batch.records.is_empty());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_payload("<html>502</html>"), Err(ApiError::ParseError(_))));
        assert!(matches!(parse_payload("42"), Err(ApiError::Malformed(_))));
        assert!(matches!(
            parse_payload(r#"{"success": true, "errors": "nope"}"#),
            Err(ApiError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_object_entries_are_skipped() {
        let body = r#"[{"id": 1}, 17, "junk", {"id": 2, "node": 5}, {}]"#;
        let batch = parse_payload(body).unwrap();
        // {"id":1} and {} are record-shaped; node: 5 has the wrong type
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 3);
    }

    #[test]
    fn test_endpoint_urls() {
        let proxy = ErrorLogClient::new("http://localhost:3000/", EndpointKind::AdminProxy, None).unwrap();
        assert_eq!(
            proxy.endpoint_url(),
            "http://localhost:3000/api/admin/supabase-error_logs"
        );

        let direct = ErrorLogClient::new(
            "https://example.supabase.co",
            EndpointKind::PostgRest,
            Some("key".into()),
        )
        .unwrap();
        assert_eq!(
            direct.endpoint_url(),
            "https://example.supabase.co/rest/v1/error_logs"
        );
    }

    #[test]
    fn test_retryable_errors() {
        let server = ApiError::Status { status: 503, body: String::new() };
        let missing = ApiError::Status { status: 404, body: String::new() };
        assert!(server.is_retryable());
        assert!(!missing.is_retryable());
        assert!(!ApiError::Rejected("no".into()).is_retryable());
    }

    #[test]
    fn test_endpoint_kind_from_config_strings() {
        #[derive(Deserialize)]
        struct Holder {
            kind: EndpointKind,
        }
        let h: Holder = serde_json::from_str(r#"{"kind": "postgrest"}"#).unwrap();
        assert_eq!(h.kind, EndpointKind::PostgRest);
        let h: Holder = serde_json::from_str(r#"{"kind": "admin_proxy"}"#).unwrap();
        assert_eq!(h.kind, EndpointKind::AdminProxy);
    }
}
