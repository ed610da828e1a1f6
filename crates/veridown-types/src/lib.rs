//! Shared types, errors, and wire envelopes for the Veridown verification
//! service.
//!
//! This crate provides the foundational types used across all other Veridown
//! crates:
//! - `VerificationError` — unified error taxonomy with HTTP status mapping
//! - wire envelopes (`VerifyRequest`, `VerificationResponse`, `VerifierInfo`)
//! - filter roles and specifications
//! - the typed per-verifier configuration record

mod config;
mod envelope;
mod filter;

pub use config::VerifierConfig;
pub use envelope::{
    CheckResult, ConfigOption, ErrorBody, OptionType, PrimaryDataSummary, ScoringResult,
    VerificationResponse, VerifierInfo, VerifiersList, VerifyRequest,
};
pub use filter::{parse_filter_spec, FilterCriterion, FilterSpec, Role, RoleCriteria};

use serde::{Deserialize, Serialize};

/// Unified error type for all Veridown subsystems.
///
/// The three validation variants (`VerifierNotFound`, `InvalidConfig`,
/// `InvalidFilter`) are raised before a pipeline starts. Failures inside a
/// handler never surface here; they are recorded as invalid [`CheckResult`]s
/// on the request instead.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Verifier '{name}' not found")]
    VerifierNotFound { name: String, available: Vec<String> },

    #[error("Invalid config options: {}", invalid_options.join(", "))]
    InvalidConfig { invalid_options: Vec<String> },

    #[error("Invalid filter roles: {}", invalid_roles.join(", "))]
    InvalidFilter { invalid_roles: Vec<String> },

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Filter evaluation failed: {0}")]
    Filtering(String),

    #[error("{dtype} parse error at line {line}: {message}")]
    Parse {
        dtype: Dtype,
        line: usize,
        message: String,
    },

    #[error("Verification timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Worker queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VerificationError {
    /// Short machine-readable label used in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            VerificationError::VerifierNotFound { .. } => "verifier_not_found",
            VerificationError::InvalidConfig { .. } => "invalid_config",
            VerificationError::InvalidFilter { .. } => "invalid_filter",
            VerificationError::Verification(_) => "verification_error",
            VerificationError::Filtering(_) => "filtering_error",
            VerificationError::Parse { .. } => "parse_error",
            VerificationError::Timeout { .. } => "timeout",
            VerificationError::QueueFull { .. } => "queue_full",
            VerificationError::Transport(_) => "transport_error",
            VerificationError::Json(_) => "json_error",
        }
    }

    /// Maps the error to the HTTP status used on the wire surface.
    pub fn http_status(&self) -> u16 {
        match self {
            VerificationError::VerifierNotFound { .. } => 404,
            VerificationError::InvalidConfig { .. } | VerificationError::InvalidFilter { .. } => {
                422
            }
            VerificationError::Verification(_) | VerificationError::Parse { .. } => 400,
            VerificationError::Timeout { .. } => 504,
            VerificationError::QueueFull { .. } => 503,
            VerificationError::Filtering(_)
            | VerificationError::Transport(_)
            | VerificationError::Json(_) => 500,
        }
    }

    /// Structured detail carried alongside the message in the error envelope.
    pub fn detail(&self) -> Option<serde_json::Value> {
        match self {
            VerificationError::VerifierNotFound { available, .. } => {
                Some(serde_json::json!({ "available_verifiers": available }))
            }
            VerificationError::InvalidConfig { invalid_options } => {
                Some(serde_json::json!({ "invalid_options": invalid_options }))
            }
            VerificationError::InvalidFilter { invalid_roles } => {
                Some(serde_json::json!({ "invalid_roles": invalid_roles }))
            }
            _ => None,
        }
    }

    /// Build the wire error envelope for this error.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
            detail: self.detail(),
        }
    }
}

/// A convenience alias for `Result<T, VerificationError>`.
pub type Result<T> = std::result::Result<T, VerificationError>;

/// The type of a primary verification data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dtype {
    Argdown,
    Xml,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Argdown => "argdown",
            Dtype::Xml => "xml",
        }
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_verifier_not_found() {
        let err = VerificationError::VerifierNotFound {
            name: "bogus".into(),
            available: vec!["arganno".into(), "argmap".into()],
        };
        assert_eq!(err.to_string(), "Verifier 'bogus' not found");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.kind(), "verifier_not_found");
    }

    #[test]
    fn error_display_invalid_config() {
        let err = VerificationError::InvalidConfig {
            invalid_options: vec!["bogus".into(), "nope".into()],
        };
        assert_eq!(err.to_string(), "Invalid config options: bogus, nope");
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn error_display_invalid_filter() {
        let err = VerificationError::InvalidFilter {
            invalid_roles: vec!["logreco".into()],
        };
        assert_eq!(err.to_string(), "Invalid filter roles: logreco");
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn error_display_parse() {
        let err = VerificationError::Parse {
            dtype: Dtype::Argdown,
            line: 3,
            message: "unexpected token".into(),
        };
        assert_eq!(err.to_string(), "argdown parse error at line 3: unexpected token");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn error_status_timeout_and_queue_full() {
        let timeout = VerificationError::Timeout { timeout_ms: 30_000 };
        assert_eq!(timeout.http_status(), 504);
        let full = VerificationError::QueueFull { capacity: 16 };
        assert_eq!(full.http_status(), 503);
        assert_eq!(full.to_string(), "Worker queue is full (capacity 16)");
    }

    #[test]
    fn error_detail_lists_offenders() {
        let err = VerificationError::InvalidConfig {
            invalid_options: vec!["bogus".into()],
        };
        let detail = err.detail().unwrap();
        assert_eq!(detail["invalid_options"][0], "bogus");
    }

    #[test]
    fn error_body_round_trip() {
        let err = VerificationError::VerifierNotFound {
            name: "x".into(),
            available: vec!["arganno".into()],
        };
        let body = err.to_body();
        assert_eq!(body.error, "verifier_not_found");
        assert!(body.message.contains('x'));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["detail"]["available_verifiers"][0], "arganno");
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: VerificationError = json_err.into();
        assert!(matches!(err, VerificationError::Json(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn dtype_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Dtype::Argdown).unwrap(), "\"argdown\"");
        assert_eq!(serde_json::to_string(&Dtype::Xml).unwrap(), "\"xml\"");
        let dt: Dtype = serde_json::from_str("\"xml\"").unwrap();
        assert_eq!(dt, Dtype::Xml);
    }
}
