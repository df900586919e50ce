//! Error types for raise-dv
//!
//! Decode and validation failures are recovered inside the request handler;
//! every other variant aborts the current cycle without publishing.

use thiserror::Error;

/// Main error type for the verification pipeline
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Inbound message is not a JSON object
    #[error("Malformed request: {0}")]
    Decode(String),

    /// Required request field missing or empty
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Evaluation service answered with a non-success status
    #[error("Evaluation service returned status {status_code} for subject {subject_identifier}")]
    EvaluationService {
        status_code: u16,
        subject_identifier: String,
    },

    /// Evaluation service could not be reached (connect, TLS, timeout)
    #[error("Evaluation request failed for subject {subject_identifier}: {message}")]
    EvaluationTransport {
        subject_identifier: String,
        message: String,
    },

    /// Success status but the body did not carry a readable outcome list
    #[error("Unreadable evaluation response for subject {subject_identifier}: {message}")]
    EvaluationResponse {
        subject_identifier: String,
        message: String,
    },

    /// Outcome indicator has no category; the category map is out of sync
    #[error("Indicator '{0}' has no category mapping")]
    UnknownIndicator(String),

    /// Category map file missing or malformed
    #[error("Category map error: {0}")]
    CategoryMap(String),

    /// Report serialization error
    #[error("Report encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Configuration, queue or I/O error from raise-common
    #[error(transparent)]
    Common(#[from] raise_common::Error),
}

impl VerifyError {
    /// True for failures that originate in the evaluation service call
    pub fn is_evaluation_failure(&self) -> bool {
        matches!(
            self,
            VerifyError::EvaluationService { .. }
                | VerifyError::EvaluationTransport { .. }
                | VerifyError::EvaluationResponse { .. }
        )
    }
}

/// Convenience Result type using raise-dv VerifyError
pub type Result<T> = std::result::Result<T, VerifyError>;
