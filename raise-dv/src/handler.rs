//! Request handler: one inbound message → publish action or discard
//!
//! Per-message state machine, no state carried between messages:
//! 1. Decode the message as a JSON object (failure: discard)
//! 2. Validate the subject field (missing/empty: discard, no evaluation)
//! 3. Evaluate the subject (failure: `Err`, nothing published)
//! 4. Aggregate outcomes by category (unknown indicator: `Err`)
//! 5. Non-empty result: publish the report; empty result: discard

use crate::aggregator::aggregate;
use crate::category_map::IndicatorCategoryMap;
use crate::error::{Result, VerifyError};
use crate::evaluation::Evaluator;
use crate::report::VerificationReport;
use raise_common::config::FieldConfig;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decoded inbound request
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    /// Opaque correlation value, echoed back unchanged. JSON `null` counts as absent.
    pub instance_id: Option<Value>,
    pub subject_identifier: String,
}

impl VerificationRequest {
    /// Decode and validate a raw message using the deployment's field names
    ///
    /// # Returns
    /// * `Err(Decode)` - not JSON, or not a JSON object
    /// * `Err(Validation)` - subject field missing, not a string, or blank
    pub fn decode(raw: &[u8], fields: &FieldConfig) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| VerifyError::Decode(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| VerifyError::Decode("expected a JSON object".to_string()))?;

        let subject_identifier = match object.get(&fields.subject) {
            Some(Value::String(subject)) if !subject.trim().is_empty() => subject.clone(),
            Some(Value::String(_)) => {
                return Err(VerifyError::Validation(format!(
                    "'{}' is empty",
                    fields.subject
                )))
            }
            Some(Value::Null) | None => {
                return Err(VerifyError::Validation(format!(
                    "'{}' is missing",
                    fields.subject
                )))
            }
            Some(_) => {
                return Err(VerifyError::Validation(format!(
                    "'{}' is not a string",
                    fields.subject
                )))
            }
        };

        let instance_id = object
            .get(&fields.instance_id)
            .filter(|v| !v.is_null())
            .cloned();

        Ok(Self {
            instance_id,
            subject_identifier,
        })
    }
}

/// Why a message produced no response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Message body could not be decoded
    Malformed(String),
    /// Required subject field missing or unusable
    Invalid(String),
    /// Evaluation produced no categorized findings
    EmptyResult,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::Malformed(msg) => write!(f, "malformed message: {}", msg),
            DiscardReason::Invalid(msg) => write!(f, "invalid request: {}", msg),
            DiscardReason::EmptyResult => write!(f, "no categorized findings"),
        }
    }
}

/// Result of handling one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Publish `payload` to `queue`
    Publish { queue: String, payload: Vec<u8> },
    /// Nothing to publish
    Discarded(DiscardReason),
}

/// Orchestrates decode → evaluate → aggregate → envelope for one message
pub struct RequestHandler {
    categories: Arc<IndicatorCategoryMap>,
    evaluator: Arc<dyn Evaluator>,
    fields: FieldConfig,
    response_queue: String,
}

impl RequestHandler {
    pub fn new(
        categories: Arc<IndicatorCategoryMap>,
        evaluator: Arc<dyn Evaluator>,
        fields: FieldConfig,
        response_queue: impl Into<String>,
    ) -> Self {
        Self {
            categories,
            evaluator,
            fields,
            response_queue: response_queue.into(),
        }
    }

    pub fn response_queue(&self) -> &str {
        &self.response_queue
    }

    /// Handle one raw inbound message
    ///
    /// Decode and validation failures are logged and returned as
    /// `Discarded`; evaluation and aggregation failures propagate.
    pub async fn handle(&self, raw: &[u8]) -> Result<HandleOutcome> {
        let request = match VerificationRequest::decode(raw, &self.fields) {
            Ok(request) => request,
            Err(VerifyError::Decode(msg)) => {
                warn!("Discarding undecodable message: {}", msg);
                return Ok(HandleOutcome::Discarded(DiscardReason::Malformed(msg)));
            }
            Err(VerifyError::Validation(msg)) => {
                warn!("Discarding request: {}", msg);
                return Ok(HandleOutcome::Discarded(DiscardReason::Invalid(msg)));
            }
            Err(e) => return Err(e),
        };

        debug!(
            subject = %request.subject_identifier,
            instance_id = ?request.instance_id,
            "Decoded verification request"
        );

        let outcomes = self
            .evaluator
            .evaluate(&request.subject_identifier)
            .await?;
        let result = aggregate(outcomes, &self.categories)?;

        if result.is_empty() {
            info!(
                subject = %request.subject_identifier,
                "Evaluation returned no findings - nothing to publish"
            );
            return Ok(HandleOutcome::Discarded(DiscardReason::EmptyResult));
        }

        let categories = result.len();
        let findings = result.finding_count();
        let report = VerificationReport {
            instance_id: request.instance_id,
            result,
        };
        let payload = report.to_payload(&self.fields.instance_id)?;

        info!(
            subject = %request.subject_identifier,
            categories,
            findings,
            queue = %self.response_queue,
            "Verification report ready"
        );

        Ok(HandleOutcome::Publish {
            queue: self.response_queue.clone(),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> FieldConfig {
        FieldConfig::default()
    }

    #[test]
    fn test_decode_reads_configured_fields() {
        let custom = FieldConfig {
            subject: "subjectIdentifier".to_string(),
            instance_id: "requestId".to_string(),
        };
        let raw = br#"{"subjectIdentifier": "10.1/xyz", "requestId": 7}"#;

        let request = VerificationRequest::decode(raw, &custom).unwrap();
        assert_eq!(request.subject_identifier, "10.1/xyz");
        assert_eq!(request.instance_id, Some(json!(7)));
    }

    #[test]
    fn test_decode_null_instance_is_absent() {
        let raw = br#"{"uniqueIdentifier": "10.1/xyz", "instanceId": null}"#;
        let request = VerificationRequest::decode(raw, &fields()).unwrap();
        assert_eq!(request.instance_id, None);
    }

    #[test]
    fn test_decode_rejects_non_object() {
        for raw in [&b"not json"[..], &b"[1, 2]"[..], &b"\"10.1/xyz\""[..]] {
            assert!(matches!(
                VerificationRequest::decode(raw, &fields()),
                Err(VerifyError::Decode(_))
            ));
        }
    }

    #[test]
    fn test_decode_rejects_unusable_subject() {
        for raw in [
            &br#"{"instanceId": "i1"}"#[..],
            &br#"{"uniqueIdentifier": null}"#[..],
            &br#"{"uniqueIdentifier": "  "}"#[..],
            &br#"{"uniqueIdentifier": 42}"#[..],
        ] {
            assert!(matches!(
                VerificationRequest::decode(raw, &fields()),
                Err(VerifyError::Validation(_))
            ));
        }
    }
}
