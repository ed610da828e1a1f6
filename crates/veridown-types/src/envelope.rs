//! Wire envelopes shared between the dispatch service and its clients.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Dtype;

// ---------------------------------------------------------------------------
// Request envelope
// ---------------------------------------------------------------------------

/// The request envelope accepted by every verifier endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// The text containing fenced code blocks to verify.
    pub inputs: String,
    /// Optional source text some verifiers check against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Verifier-specific configuration options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

impl VerifyRequest {
    pub fn new(inputs: impl Into<String>) -> Self {
        Self {
            inputs: inputs.into(),
            source: None,
            config: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_config(mut self, config: serde_json::Map<String, serde_json::Value>) -> Self {
        self.config = Some(config);
        self
    }
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Summary of one extracted primary data item, as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryDataSummary {
    pub id: String,
    pub dtype: Dtype,
    pub code_snippet: String,
    pub metadata: IndexMap<String, String>,
}

/// Result from a single verification check.
///
/// Used both as the in-pipeline record and as the wire model; the dispatch
/// boundary empties `details` so every response is serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub verifier_id: String,
    pub verification_data_references: Vec<String>,
    pub is_valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl CheckResult {
    /// A passing result referencing the given data items.
    pub fn valid(verifier_id: impl Into<String>, references: Vec<String>) -> Self {
        Self {
            verifier_id: verifier_id.into(),
            verification_data_references: references,
            is_valid: true,
            message: None,
            details: serde_json::Map::new(),
        }
    }

    /// A failing result with a diagnostic message.
    pub fn invalid(
        verifier_id: impl Into<String>,
        references: Vec<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            verifier_id: verifier_id.into(),
            verification_data_references: references,
            is_valid: false,
            message: Some(message.into()),
            details: serde_json::Map::new(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Map<String, serde_json::Value>) -> Self {
        self.details = details;
        self
    }
}

/// The response envelope produced for every verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub verifier: String,
    pub is_valid: bool,
    pub verification_data: Vec<PrimaryDataSummary>,
    pub results: Vec<CheckResult>,
    pub executed_handlers: Vec<String>,
    pub processing_time_ms: f64,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Numeric virtue score produced by a scorer on an already-valid request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub id: String,
    pub description: String,
    /// Score in `[0, 1]` by convention.
    pub score: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Primitive type tag of a configuration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    String,
    Int,
    Float,
    Bool,
}

/// One configuration option declared by a verifier builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ConfigOption {
    pub fn new(
        name: impl Into<String>,
        option_type: OptionType,
        default: Option<serde_json::Value>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            option_type,
            default,
            description: description.into(),
            required: false,
        }
    }
}

/// Registry view of one verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierInfo {
    pub name: String,
    pub description: String,
    pub input_types: Vec<Dtype>,
    pub allowed_filter_roles: Vec<crate::Role>,
    #[serde(default)]
    pub config_options: Vec<ConfigOption>,
    #[serde(default)]
    pub is_coherence_verifier: bool,
}

/// All registered verifiers, grouped by category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifiersList {
    #[serde(default)]
    pub core: Vec<VerifierInfo>,
    #[serde(default)]
    pub coherence: Vec<VerifierInfo>,
    #[serde(default)]
    pub content_check: Vec<VerifierInfo>,
}

// ---------------------------------------------------------------------------
// Errors on the wire
// ---------------------------------------------------------------------------

/// Standard error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_request_builder() {
        let req = VerifyRequest::new("```argdown\n[A]: x.\n```").with_source("src text");
        assert_eq!(req.source.as_deref(), Some("src text"));
        assert!(req.config.is_none());
    }

    #[test]
    fn verify_request_omits_empty_fields_in_json() {
        let req = VerifyRequest::new("abc");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "inputs": "abc" }));
    }

    #[test]
    fn check_result_constructors() {
        let ok = CheckResult::valid("Arganno.NestedPropositionHandler", vec!["xml_0".into()]);
        assert!(ok.is_valid);
        assert!(ok.message.is_none());

        let bad = CheckResult::invalid("h", vec!["xml_0".into()], "Duplicate ids: a");
        assert!(!bad.is_valid);
        assert_eq!(bad.message.as_deref(), Some("Duplicate ids: a"));
    }

    #[test]
    fn response_round_trips_through_json() {
        let resp = VerificationResponse {
            verifier: "argmap".into(),
            is_valid: true,
            verification_data: vec![PrimaryDataSummary {
                id: "argdown_0".into(),
                dtype: crate::Dtype::Argdown,
                code_snippet: "[A]: x.".into(),
                metadata: IndexMap::new(),
            }],
            results: vec![CheckResult::valid("ArgMap.NoPCSHandler", vec!["argdown_0".into()])],
            executed_handlers: vec!["ArgMap.NoPCSHandler".into()],
            processing_time_ms: 4.2,
        };
        let json = serde_json::to_string(&resp).unwrap();
        let back: VerificationResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.verifier, "argmap");
        assert_eq!(back.verification_data[0].dtype, crate::Dtype::Argdown);
        assert_eq!(back.results.len(), 1);
    }

    #[test]
    fn config_option_type_tag_in_json() {
        let opt = ConfigOption::new(
            "from_key",
            OptionType::String,
            Some(serde_json::json!("from")),
            "Key used for inference information in arguments",
        );
        let json = serde_json::to_value(&opt).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["default"], "from");
    }

    #[test]
    fn metadata_order_is_preserved() {
        let mut metadata = IndexMap::new();
        metadata.insert("filename".to_string(), "map.ad".to_string());
        metadata.insert("version".to_string(), "v3".to_string());
        let summary = PrimaryDataSummary {
            id: "argdown_0".into(),
            dtype: crate::Dtype::Argdown,
            code_snippet: String::new(),
            metadata,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let filename_at = json.find("filename").unwrap();
        let version_at = json.find("version").unwrap();
        assert!(filename_at < version_at);
    }
}
