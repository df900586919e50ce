//! Evaluation service client
//!
//! Posts `{ "subject", "collection" }` to the FAIR evaluation endpoint and
//! returns the per-indicator outcome list. HTTP 200 and 201 are success;
//! anything else becomes `EvaluationService` and is never retried.

use crate::error::{Result, VerifyError};
use async_trait::async_trait;
use raise_common::config::EvaluationConfig;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const USER_AGENT: &str = concat!("raise-dv/", env!("CARGO_PKG_VERSION"));

/// One indicator result as emitted by the evaluation service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvaluationOutcome {
    #[serde(rename = "indicatorId", alias = "indicator_id")]
    pub indicator_id: String,
    #[serde(alias = "result")]
    pub passed: bool,
    #[serde(default)]
    pub comment: String,
}

/// Source of evaluation outcomes for a subject
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate one subject identifier
    ///
    /// # Returns
    /// * `Ok(outcomes)` - in the order the service emitted them
    /// * `Err(_)` - the current cycle must abort without publishing
    async fn evaluate(&self, subject_identifier: &str) -> Result<Vec<EvaluationOutcome>>;
}

/// HTTP client for the evaluation endpoint
pub struct EvaluationClient {
    http_client: reqwest::Client,
    endpoint: String,
    collection: String,
    subject_prefix: Option<String>,
    outcomes_field: String,
}

impl EvaluationClient {
    pub fn new(config: &EvaluationConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                VerifyError::Common(raise_common::Error::Config(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;

        let subject_prefix = Some(config.subject_prefix.clone()).filter(|p| !p.is_empty());

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            collection: config.collection.clone(),
            subject_prefix,
            outcomes_field: config.outcomes_field.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Subject sent to the service: bare identifiers get the resolver prefix,
    /// absolute http(s) URIs are sent verbatim
    pub fn resolve_subject(&self, subject_identifier: &str) -> String {
        let is_uri =
            subject_identifier.starts_with("http://") || subject_identifier.starts_with("https://");
        match &self.subject_prefix {
            Some(prefix) if !is_uri => format!("{}{}", prefix, subject_identifier),
            _ => subject_identifier.to_string(),
        }
    }

    /// JSON body for one evaluation request
    pub fn request_body(&self, subject_identifier: &str) -> Value {
        json!({
            "subject": self.resolve_subject(subject_identifier),
            "collection": self.collection,
        })
    }

    fn extract_outcomes(
        &self,
        subject_identifier: &str,
        mut body: Value,
    ) -> Result<Vec<EvaluationOutcome>> {
        let outcomes = body
            .get_mut(&self.outcomes_field)
            .map(Value::take)
            .ok_or_else(|| VerifyError::EvaluationResponse {
                subject_identifier: subject_identifier.to_string(),
                message: format!("missing '{}' field", self.outcomes_field),
            })?;

        serde_json::from_value(outcomes).map_err(|e| VerifyError::EvaluationResponse {
            subject_identifier: subject_identifier.to_string(),
            message: format!("invalid '{}' field: {}", self.outcomes_field, e),
        })
    }
}

#[async_trait]
impl Evaluator for EvaluationClient {
    async fn evaluate(&self, subject_identifier: &str) -> Result<Vec<EvaluationOutcome>> {
        let body = self.request_body(subject_identifier);

        tracing::debug!(
            subject = subject_identifier,
            endpoint = %self.endpoint,
            body = %body,
            "Requesting evaluation"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    subject = subject_identifier,
                    endpoint = %self.endpoint,
                    "Evaluation request failed: {}",
                    e
                );
                VerifyError::EvaluationTransport {
                    subject_identifier: subject_identifier.to_string(),
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !matches!(status, StatusCode::OK | StatusCode::CREATED) {
            tracing::error!(
                subject = subject_identifier,
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "Error calling evaluation service"
            );
            return Err(VerifyError::EvaluationService {
                status_code: status.as_u16(),
                subject_identifier: subject_identifier.to_string(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VerifyError::EvaluationResponse {
                subject_identifier: subject_identifier.to_string(),
                message: e.to_string(),
            })?;

        let outcomes = self.extract_outcomes(subject_identifier, body)?;
        tracing::info!(
            subject = subject_identifier,
            outcomes = outcomes.len(),
            "Evaluation complete"
        );
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_prefix(prefix: &str) -> EvaluationClient {
        EvaluationClient::new(&EvaluationConfig {
            subject_prefix: prefix.to_string(),
            ..EvaluationConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_doi_fragment_gets_resolver_prefix() {
        let client = client_with_prefix("https://doi.org/");
        assert_eq!(client.resolve_subject("10.1/xyz"), "https://doi.org/10.1/xyz");
    }

    #[test]
    fn test_full_uri_sent_verbatim() {
        let client = client_with_prefix("https://doi.org/");
        assert_eq!(
            client.resolve_subject("https://zenodo.org/record/1"),
            "https://zenodo.org/record/1"
        );
    }

    #[test]
    fn test_empty_prefix_disables_resolution() {
        let client = client_with_prefix("");
        assert_eq!(client.resolve_subject("10.1/xyz"), "10.1/xyz");
    }

    #[test]
    fn test_request_body_shape() {
        let client = client_with_prefix("https://doi.org/");
        assert_eq!(
            client.request_body("10.1/xyz"),
            json!({"subject": "https://doi.org/10.1/xyz", "collection": "fair-enough-data"})
        );
    }

    #[test]
    fn test_outcome_accepts_result_alias() {
        let outcome: EvaluationOutcome =
            serde_json::from_str(r#"{"indicatorId": "F1", "result": true}"#).unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.comment, "");
    }

    #[test]
    fn test_extract_missing_field() {
        let client = client_with_prefix("");
        let result = client.extract_outcomes("s", json!({"other": []}));
        assert!(matches!(result, Err(VerifyError::EvaluationResponse { .. })));
    }

    #[test]
    fn test_extract_keeps_emission_order() {
        let client = client_with_prefix("");
        let outcomes = client
            .extract_outcomes(
                "s",
                json!({"contains": [
                    {"indicatorId": "R1", "passed": true, "comment": "a"},
                    {"indicatorId": "F1", "passed": false, "comment": "b"}
                ]}),
            )
            .unwrap();
        let ids: Vec<&str> = outcomes.iter().map(|o| o.indicator_id.as_str()).collect();
        assert_eq!(ids, vec!["R1", "F1"]);
    }
}
