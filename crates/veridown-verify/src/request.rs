//! The verification request: the single mutable state object threaded
//! through a handler pipeline.

use indexmap::IndexMap;
use veridown_anno::AnnotationTree;
use veridown_argdown::ArgdownGraph;
use veridown_types::{CheckResult, Dtype, PrimaryDataSummary, VerifierConfig};

// ---------------------------------------------------------------------------
// Primary data
// ---------------------------------------------------------------------------

/// A parsed artifact attached to a primary data item.
#[derive(Debug, Clone)]
pub enum Artifact {
    Argdown(ArgdownGraph),
    Annotation(AnnotationTree),
}

/// One extracted artifact: created by the extractor, its `artifact` field
/// populated by the parser handlers, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PrimaryData {
    pub id: String,
    pub dtype: Dtype,
    pub code_snippet: String,
    pub metadata: IndexMap<String, String>,
    pub artifact: Option<Artifact>,
}

impl PrimaryData {
    pub fn new(
        id: impl Into<String>,
        dtype: Dtype,
        code_snippet: impl Into<String>,
        metadata: IndexMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            dtype,
            code_snippet: code_snippet.into(),
            metadata,
            artifact: None,
        }
    }

    pub fn argdown(&self) -> Option<&ArgdownGraph> {
        match &self.artifact {
            Some(Artifact::Argdown(graph)) => Some(graph),
            _ => None,
        }
    }

    pub fn annotation(&self) -> Option<&AnnotationTree> {
        match &self.artifact {
            Some(Artifact::Annotation(tree)) => Some(tree),
            _ => None,
        }
    }

    pub fn summary(&self) -> PrimaryDataSummary {
        PrimaryDataSummary {
            id: self.id.clone(),
            dtype: self.dtype,
            code_snippet: self.code_snippet.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request state
// ---------------------------------------------------------------------------

/// Derived per-request lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Extracted,
    Parsed,
    Finished,
    Aborted,
}

// ---------------------------------------------------------------------------
// VerificationRequest
// ---------------------------------------------------------------------------

/// The hub of mutation for a verification run. Handlers append results and
/// executed-handler names; a fatal issue flips `continue_processing`.
#[derive(Debug)]
pub struct VerificationRequest {
    pub inputs: String,
    pub source: Option<String>,
    pub verification_data: Vec<PrimaryData>,
    pub results: Vec<CheckResult>,
    /// Scratch values shared across handlers and scorers.
    pub artifacts: serde_json::Map<String, serde_json::Value>,
    pub config: VerifierConfig,
    pub continue_processing: bool,
    pub executed_handlers: Vec<String>,
}

impl VerificationRequest {
    pub fn new(inputs: impl Into<String>, source: Option<String>) -> Self {
        Self {
            inputs: inputs.into(),
            source,
            verification_data: Vec::new(),
            results: Vec::new(),
            artifacts: serde_json::Map::new(),
            config: VerifierConfig::default(),
            continue_processing: true,
            executed_handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_result(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    /// A request is valid iff every recorded result is valid.
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|r| r.is_valid)
    }

    pub fn state(&self) -> RequestState {
        if !self.continue_processing {
            return RequestState::Aborted;
        }
        if self.verification_data.is_empty() {
            if self.executed_handlers.is_empty() {
                return RequestState::Received;
            }
            return RequestState::Finished;
        }
        if self.verification_data.iter().all(|d| d.artifact.is_none()) {
            return RequestState::Extracted;
        }
        if self.results.is_empty() {
            return RequestState::Parsed;
        }
        RequestState::Finished
    }
}

/// Render a loose scalar (string or number) as a string, the way label
/// references inside inference data are compared.
pub fn scalar_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validity_follows_results() {
        let mut request = VerificationRequest::new("x", None);
        assert!(request.is_valid());
        request.add_result(CheckResult::valid("a", vec![]));
        assert!(request.is_valid());
        request.add_result(CheckResult::invalid("b", vec![], "boom"));
        assert!(!request.is_valid());
    }

    #[test]
    fn state_transitions() {
        let mut request = VerificationRequest::new("x", None);
        assert_eq!(request.state(), RequestState::Received);

        request
            .verification_data
            .push(PrimaryData::new("argdown_0", Dtype::Argdown, "x", IndexMap::new()));
        assert_eq!(request.state(), RequestState::Extracted);

        request.verification_data[0].artifact =
            Some(Artifact::Argdown(ArgdownGraph::default()));
        assert_eq!(request.state(), RequestState::Parsed);

        request.add_result(CheckResult::valid("a", vec![]));
        assert_eq!(request.state(), RequestState::Finished);

        request.continue_processing = false;
        assert_eq!(request.state(), RequestState::Aborted);
    }

    #[test]
    fn artifact_accessors() {
        let mut item = PrimaryData::new("xml_0", Dtype::Xml, "", IndexMap::new());
        assert!(item.annotation().is_none());
        item.artifact = Some(Artifact::Annotation(AnnotationTree::default()));
        assert!(item.annotation().is_some());
        assert!(item.argdown().is_none());
    }

    #[test]
    fn scalar_string_handles_numbers() {
        assert_eq!(scalar_string(&serde_json::json!("1")), "1");
        assert_eq!(scalar_string(&serde_json::json!(1)), "1");
    }
}
