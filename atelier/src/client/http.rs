//! HTTP inference client.
//!
//! Submits predictions with `POST {base}/models/{model}/predictions` and
//! checks them with `GET {base}/predictions/{id}`.

use super::{GenerationRequest, InferenceClient, JobHandle, Rejection, StatusReport};
use crate::config::ProviderConfig;
use crate::core::PredictionStatus;
use crate::errors::AtelierError;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

/// Provider response body shared by both endpoints.
#[derive(Debug, Deserialize)]
struct PredictionEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// `InferenceClient` backed by the provider's REST API.
#[derive(Clone)]
pub struct HttpInferenceClient {
    http: reqwest::Client,
    config: ProviderConfig,
    token: String,
}

impl std::fmt::Debug for HttpInferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInferenceClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpInferenceClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns `AtelierError::Config` if no token is configured or the HTTP
    /// client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, AtelierError> {
        let token = config.require_token()?.to_string();
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AtelierError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            token,
        })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, Rejection> {
        let model = self.config.model_for(request.kind);
        let url = format!("{}/models/{model}/predictions", self.base_url());
        debug!(%url, kind = %request.kind, "Submitting prediction");

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .json(&serde_json::json!({ "input": request.input }))
            .send()
            .await
            .map_err(|e| Rejection::transport(format!("Request Error: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Rejection::transport(format!("Request Error: {e}")))?;

        parse_submit_response(status, &body)
    }

    async fn status(&self, handle: &JobHandle) -> Result<StatusReport, Rejection> {
        let url = format!("{}/predictions/{}", self.base_url(), handle.id());

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| Rejection::transport(format!("Request Error: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Rejection::transport(format!("Request Error: {e}")))?;

        parse_status_response(status, &body)
    }
}

fn parse_envelope(body: &str) -> Result<PredictionEnvelope, Rejection> {
    serde_json::from_str(body).map_err(|e| Rejection::provider(format!("Parse Error: {e}")))
}

fn parse_submit_response(status: StatusCode, body: &str) -> Result<JobHandle, Rejection> {
    if status != StatusCode::CREATED {
        return Err(Rejection::provider(format!(
            "API Error: {} - {body}",
            status.as_u16()
        )));
    }

    parse_envelope(body)?
        .id
        .filter(|id| !id.is_empty())
        .map(JobHandle::new)
        .ok_or_else(|| Rejection::provider("Parse Error: prediction id missing"))
}

fn parse_status_response(status: StatusCode, body: &str) -> Result<StatusReport, Rejection> {
    if !status.is_success() {
        return Err(Rejection::provider(format!(
            "API Error: {} - {body}",
            status.as_u16()
        )));
    }

    let envelope = parse_envelope(body)?;
    let error = envelope.error.and_then(|e| match e {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    });

    Ok(StatusReport {
        status: PredictionStatus::from(envelope.status.unwrap_or_default()),
        output: envelope.output,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{PhraseClassifier, TransientClassifier};

    #[test]
    fn test_new_requires_token() {
        let err = HttpInferenceClient::new(ProviderConfig::new()).unwrap_err();
        assert!(matches!(err, AtelierError::Config(_)));
    }

    #[test]
    fn test_new_with_token() {
        let client =
            HttpInferenceClient::new(ProviderConfig::new().with_base_url("http://localhost/v1/").with_api_token("t"))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost/v1");
        assert_eq!(client.auth_header(), "Token t");
    }

    #[test]
    fn test_submit_created() {
        let handle = parse_submit_response(StatusCode::CREATED, r#"{"id": "abc123", "status": "starting"}"#).unwrap();
        assert_eq!(handle.id(), "abc123");
    }

    #[test]
    fn test_submit_non_created_is_rejection() {
        let body = r#"{"detail": "Service is currently unavailable (E003)"}"#;
        let rejection = parse_submit_response(StatusCode::SERVICE_UNAVAILABLE, body).unwrap_err();
        assert!(!rejection.transport);
        assert!(rejection.message.starts_with("API Error: 503 - "));
        assert!(rejection.message.contains("E003"));
    }

    #[test]
    fn test_submit_bad_body() {
        let rejection = parse_submit_response(StatusCode::CREATED, "not json").unwrap_err();
        assert!(rejection.message.starts_with("Parse Error"));

        let rejection = parse_submit_response(StatusCode::CREATED, "{}").unwrap_err();
        assert!(rejection.message.contains("prediction id missing"));
    }

    #[test]
    fn test_status_parsing() {
        let report = parse_status_response(
            StatusCode::OK,
            r#"{"id": "abc", "status": "succeeded", "output": ["https://cdn.example/x.jpg"], "error": null}"#,
        )
        .unwrap();
        assert_eq!(report.status, PredictionStatus::Succeeded);
        assert_eq!(report.artifact_url().as_deref(), Some("https://cdn.example/x.jpg"));
        assert_eq!(report.error, None);

        let failed = parse_status_response(StatusCode::OK, r#"{"status": "failed", "error": "E003: busy"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("E003: busy"));

        let odd = parse_status_response(StatusCode::OK, r#"{"status": "canceled", "error": {"code": 1}}"#).unwrap();
        assert_eq!(odd.status, PredictionStatus::Unknown("canceled".into()));
        assert_eq!(odd.error.as_deref(), Some(r#"{"code":1}"#));
    }

    #[test]
    fn test_status_error_code_keeps_body() {
        let body = r#"{"detail": "Service is currently unavailable"}"#;
        let rejection = parse_status_response(StatusCode::BAD_GATEWAY, body).unwrap_err();
        assert!(!rejection.transport);
        assert_eq!(
            rejection.message,
            r#"API Error: 502 - {"detail": "Service is currently unavailable"}"#
        );
        assert!(PhraseClassifier::default().is_transient(&rejection.message));
    }
}
