//! Virtue scorers: side-effect-free evaluators producing a numeric score on
//! an already-valid request, plus the scoring pipeline root handler.

use std::collections::BTreeMap;

use veridown_argdown::ArgdownGraph;
use veridown_fol::Formula;
use veridown_types::{Dtype, Result, ScoringResult};

use crate::handler::{last_matching, Handler};
use crate::request::VerificationRequest;

// ---------------------------------------------------------------------------
// Scorer trait
// ---------------------------------------------------------------------------

pub trait Scorer: Send + Sync {
    /// Full id, `<verifier>.<scorer_id>`.
    fn id(&self) -> &str;
    /// Bare id used by the `enable_<scorer_id>` config option.
    fn scorer_id(&self) -> &str;
    fn description(&self) -> &str;
    fn score(&self, request: &VerificationRequest) -> ScoringResult;
}

fn zero_score(scorer: &dyn Scorer, message: impl Into<String>) -> ScoringResult {
    ScoringResult {
        id: scorer.id().to_string(),
        description: scorer.description().to_string(),
        score: 0.0,
        message: Some(message.into()),
        details: serde_json::Map::new(),
    }
}

fn make_score(
    scorer: &dyn Scorer,
    score: f64,
    message: impl Into<String>,
    details: serde_json::Map<String, serde_json::Value>,
) -> ScoringResult {
    ScoringResult {
        id: scorer.id().to_string(),
        description: scorer.description().to_string(),
        score,
        message: Some(message.into()),
        details,
    }
}

// ---------------------------------------------------------------------------
// Shared accessors
// ---------------------------------------------------------------------------

fn last_argdown(request: &VerificationRequest) -> Option<(&ArgdownGraph, &str)> {
    let item = last_matching(request, |d| {
        d.dtype == Dtype::Argdown && d.artifact.is_some()
    })?;
    item.argdown().map(|graph| (graph, item.code_snippet.as_str()))
}

fn last_annotation(request: &VerificationRequest) -> Option<&veridown_anno::AnnotationTree> {
    last_matching(request, |d| d.dtype == Dtype::Xml && d.artifact.is_some())?.annotation()
}

/// Expressions and declarations aggregated by the well-formed-formulas
/// handler, re-parsed from the request artifacts.
fn formalization_artifacts(
    request: &VerificationRequest,
) -> Option<(BTreeMap<String, Formula>, BTreeMap<String, String>)> {
    let expressions = request.artifacts.get("all_expressions")?.as_object()?;
    let declarations = request.artifacts.get("all_declarations")?.as_object()?;
    let mut parsed = BTreeMap::new();
    for (label, source) in expressions {
        let formula = veridown_fol::parse(source.as_str()?).ok()?;
        parsed.insert(label.clone(), formula);
    }
    let declarations = declarations
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect();
    Some((parsed, declarations))
}

fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_damerau_levenshtein(a, b)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

macro_rules! scorer_struct {
    ($(#[$doc:meta])* $scorer:ident, $description:expr) => {
        $(#[$doc])*
        pub struct $scorer {
            name: String,
            scorer_id: String,
        }

        impl $scorer {
            pub fn new(parent: &str, scorer_id: &str) -> Self {
                Self {
                    name: format!("{parent}.{scorer_id}"),
                    scorer_id: scorer_id.to_string(),
                }
            }
        }

        impl Scorer for $scorer {
            fn id(&self) -> &str {
                &self.name
            }

            fn scorer_id(&self) -> &str {
                &self.scorer_id
            }

            fn description(&self) -> &str {
                $description
            }

            fn score(&self, request: &VerificationRequest) -> ScoringResult {
                self.compute(request)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Annotation scorers
// ---------------------------------------------------------------------------

scorer_struct!(
    /// Ratio of annotated text to total text length.
    CoverageScorer,
    "Scores the text coverage of the annotation, i.e. the ratio of annotated text to total text length."
);

impl CoverageScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let Some(tree) = last_annotation(request) else {
            return zero_score(self, "No XML content found for annotation coverage scoring.");
        };
        let covered: usize = tree.propositions().iter().map(|p| p.text.len()).sum();
        let total = tree.text().len();
        let ratio = if total > 0 {
            covered as f64 / total as f64
        } else {
            0.0
        };
        let mut details = serde_json::Map::new();
        details.insert("coverage_characters".into(), serde_json::json!(covered));
        details.insert("total_characters".into(), serde_json::json!(total));
        make_score(
            self,
            ratio,
            format!("Total annotated text ratio: {covered} characters."),
            details,
        )
    }
}

scorer_struct!(
    /// Number of annotated text segments.
    ScopeScorer,
    "Scores the number of text elements annotated."
);

impl ScopeScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let Some(tree) = last_annotation(request) else {
            return zero_score(self, "No XML content found for annotation scope scoring.");
        };
        let count = tree.propositions().len();
        let score = 1.0 - 0.8f64.powi(count as i32);
        let mut details = serde_json::Map::new();
        details.insert("annotated_segments".into(), serde_json::json!(count));
        make_score(
            self,
            score,
            format!("Number of annotated text segments: {count}."),
            details,
        )
    }
}

scorer_struct!(
    /// Number of annotated dialectical relations.
    AnnotationDensityScorer,
    "Scores the density of dialectical relations identified in the annotation."
);

impl AnnotationDensityScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let Some(tree) = last_annotation(request) else {
            return zero_score(self, "No XML content found for annotation density scoring.");
        };
        let relations: usize = tree
            .propositions()
            .iter()
            .map(|p| p.list_attr("supports").len() + p.list_attr("attacks").len())
            .sum();
        let score = 1.0 - 0.75f64.powi(relations as i32);
        let mut details = serde_json::Map::new();
        details.insert("annotated_relations".into(), serde_json::json!(relations));
        make_score(
            self,
            score,
            format!("Number of annotated dialectical relations: {relations}."),
            details,
        )
    }
}

// ---------------------------------------------------------------------------
// Map scorers
// ---------------------------------------------------------------------------

scorer_struct!(
    /// Number of map nodes.
    MapSizeScorer,
    "Scores the size of the argument map, i.e. the number of arguments and theses reconstructed."
);

impl MapSizeScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let Some((graph, _)) = last_argdown(request) else {
            return zero_score(self, "No argument map found; cannot compute size score.");
        };
        let nodes = graph.node_count();
        let score = if nodes <= 3 {
            0.0
        } else {
            1.0 - 0.6f64.powi((nodes - 3) as i32)
        };
        let mut details = serde_json::Map::new();
        details.insert("number_of_nodes".into(), serde_json::json!(nodes));
        make_score(
            self,
            score,
            format!("Argument map size (number of nodes): {nodes}."),
            details,
        )
    }
}

scorer_struct!(
    /// Average degree centrality of the map graph.
    MapDensityScorer,
    "Scores the density of the argument map, i.e. the number of interconnections between arguments and theses."
);

impl MapDensityScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let Some((graph, _)) = last_argdown(request) else {
            return zero_score(self, "No argument map found; cannot compute density score.");
        };
        let mut labels: Vec<&str> = graph
            .arguments
            .iter()
            .filter_map(|a| a.label.as_deref())
            .chain(
                graph
                    .propositions
                    .iter()
                    .filter(|p| !p.auto_label)
                    .map(|p| p.label.as_str()),
            )
            .collect();
        labels.dedup();
        let n = labels.len();
        if n < 2 {
            return zero_score(self, "Argument map has fewer than two nodes.");
        }
        let centralities: Vec<f64> = labels
            .iter()
            .map(|label| {
                let degree = graph
                    .dialectical_relations
                    .iter()
                    .filter(|r| r.source == *label || r.target == *label)
                    .count();
                degree as f64 / (n - 1) as f64
            })
            .collect();
        let density = (centralities.iter().sum::<f64>() / n as f64).min(1.0);
        let mut details = serde_json::Map::new();
        details.insert(
            "degree_centrality_per_node".into(),
            serde_json::json!(centralities),
        );
        make_score(
            self,
            density,
            format!("Argument map density (average degree centrality): {density:.2}."),
            details,
        )
    }
}

scorer_struct!(
    /// Text similarity between the argdown snippet and the source text.
    FaithfulnessScorer,
    "Scores the faithfulness of the argdown snippet, i.e. the text similarity between snippet and source text."
);

impl FaithfulnessScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let snippet = last_argdown(request).map(|(_, snippet)| snippet);
        let (Some(source), Some(snippet)) = (request.source.as_deref(), snippet) else {
            return zero_score(
                self,
                "No source text / argdown provided; cannot compute faithfulness score.",
            );
        };
        let score = round1(similarity(source, snippet));
        make_score(
            self,
            score,
            format!("Text similarity between argdown snippet and source text: {score}."),
            serde_json::Map::new(),
        )
    }
}

// ---------------------------------------------------------------------------
// Reconstruction scorers
// ---------------------------------------------------------------------------

scorer_struct!(
    /// Number of intermediate conclusions in the reconstruction.
    SubargumentsScorer,
    "Scores the number of sub-arguments in the argument reconstruction."
);

impl SubargumentsScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let Some((graph, _)) = last_argdown(request) else {
            return zero_score(
                self,
                "No argument reconstruction found; cannot compute sub-arguments score.",
            );
        };
        let Some(argument) = graph.arguments.first() else {
            return zero_score(
                self,
                "No argument reconstruction found; cannot compute sub-arguments score.",
            );
        };
        let conclusions = argument.pcs.iter().filter(|p| p.is_conclusion()).count();
        let score = 1.0 - 0.5f64.powi(conclusions as i32);
        let mut details = serde_json::Map::new();
        details.insert(
            "intermediate_conclusion_count".into(),
            serde_json::json!(conclusions.saturating_sub(1)),
        );
        make_score(
            self,
            score,
            format!(
                "Number of sub-arguments (intermediate conclusions) found: {}.",
                conclusions.saturating_sub(1)
            ),
            details,
        )
    }
}

scorer_struct!(
    /// Number of premises in the reconstruction.
    PremisesScorer,
    "Scores the number of premises in the argument reconstruction."
);

impl PremisesScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let Some((graph, _)) = last_argdown(request) else {
            return zero_score(self, "No argument reconstruction found; cannot compute premises score.");
        };
        let Some(argument) = graph.arguments.first() else {
            return zero_score(self, "No argument reconstruction found; cannot compute premises score.");
        };
        let premises = argument.pcs.iter().filter(|p| !p.is_conclusion()).count();
        let score = 1.0 - 0.7f64.powi(premises.saturating_sub(1) as i32);
        let mut details = serde_json::Map::new();
        details.insert("premises_count".into(), serde_json::json!(premises));
        make_score(
            self,
            score,
            format!("Number of premises found: {premises}."),
            details,
        )
    }
}

// ---------------------------------------------------------------------------
// Logical scorers
// ---------------------------------------------------------------------------

scorer_struct!(
    /// Share of formalizations going beyond propositional logic.
    PredicateLogicScorer,
    "Scores the use of predicate logic in the logical argument reconstruction."
);

impl PredicateLogicScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let Some((expressions, _)) = formalization_artifacts(request) else {
            return zero_score(
                self,
                "No logical expressions found; cannot compute predicate logic score.",
            );
        };
        if expressions.is_empty() {
            return zero_score(
                self,
                "No logical expressions found; cannot compute predicate logic score.",
            );
        }
        let propositional = expressions
            .values()
            .filter(|f| !f.propositional_variables().is_empty())
            .count();
        let score = 1.0 - propositional as f64 / expressions.len() as f64;
        let mut details = serde_json::Map::new();
        details.insert(
            "expressions_with_propositional_variables".into(),
            serde_json::json!(propositional),
        );
        details.insert("total_expressions".into(), serde_json::json!(expressions.len()));
        make_score(
            self,
            score,
            format!(
                "Found {propositional} out of {} expressions using propositional variables.",
                expressions.len()
            ),
            details,
        )
    }
}

scorer_struct!(
    /// Similarity between a formula's natural-language rendering and the
    /// formalized proposition's text.
    FormalizationsFaithfulnessScorer,
    "Scores the faithfulness of formalizations in the logical argument reconstruction to the formalized sentences."
);

impl FormalizationsFaithfulnessScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let argdown = last_argdown(request);
        let artifacts = formalization_artifacts(request);
        let (Some((graph, _)), Some((expressions, declarations))) = (argdown, artifacts) else {
            return zero_score(
                self,
                "No formalizations or argument found; cannot compute formalizations faithfulness score.",
            );
        };
        let Some(argument) = graph.arguments.first() else {
            return zero_score(
                self,
                "No formalizations or argument found; cannot compute formalizations faithfulness score.",
            );
        };

        let lookup = |symbol: &str| declarations.get(symbol).cloned();
        let mut similarities: Vec<f64> = Vec::new();
        for step in &argument.pcs {
            let Some(expression) = expressions.get(step.proposition_label()) else {
                continue;
            };
            let Some(proposition) = graph.get_proposition(step.proposition_label()) else {
                continue;
            };
            let rendered = veridown_fol::render_nl(expression, &lookup);
            for text in &proposition.texts {
                similarities.push(similarity(&rendered, text));
            }
        }

        let score = if similarities.is_empty() {
            0.0
        } else {
            round1(similarities.iter().sum::<f64>() / similarities.len() as f64)
        };
        let mut details = serde_json::Map::new();
        details.insert(
            "faithfulness_per_proposition".into(),
            serde_json::json!(similarities),
        );
        make_score(
            self,
            score,
            format!("Average faithfulness score of formalizations to sentences: {score:.2}."),
            details,
        )
    }
}

scorer_struct!(
    /// The final conclusion must not be a mere conjunction of premises.
    TrivialityScorer,
    "Scores the degree to which the reconstructed inference is not trivial."
);

impl TrivialityScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let argdown = last_argdown(request);
        let artifacts = formalization_artifacts(request);
        let (Some((graph, _)), Some((expressions, _))) = (argdown, artifacts) else {
            return zero_score(
                self,
                "No logical expressions / argument found; cannot compute triviality score.",
            );
        };
        let Some(argument) = graph.arguments.first() else {
            return zero_score(
                self,
                "No logical expressions / argument found; cannot compute triviality score.",
            );
        };

        let premises: Vec<&Formula> = argument
            .pcs
            .iter()
            .filter(|p| !p.is_conclusion())
            .filter_map(|p| expressions.get(p.proposition_label()))
            .collect();
        let Some(conclusion) = argument
            .pcs
            .iter()
            .rev()
            .find(|p| p.is_conclusion())
            .and_then(|p| expressions.get(p.proposition_label()))
        else {
            return zero_score(
                self,
                "No logical expressions / argument found; cannot compute triviality score.",
            );
        };

        let trivial = conclusion
            .conjuncts()
            .iter()
            .all(|conjunct| premises.iter().any(|p| p == conjunct));
        make_score(
            self,
            if trivial { 0.0 } else { 1.0 },
            format!(
                "The final conclusion is {} derived from the premises.",
                if trivial { "trivially" } else { "non-trivially" }
            ),
            serde_json::Map::new(),
        )
    }
}

// ---------------------------------------------------------------------------
// Cross-artifact scorer
// ---------------------------------------------------------------------------

scorer_struct!(
    /// Similarity between annotated text segments and the map or
    /// reconstruction nodes they reference.
    SemanticCoherenceScorer,
    "Scores the semantic coherence between argumentative annotations and the argdown snippet."
);

impl SemanticCoherenceScorer {
    fn compute(&self, request: &VerificationRequest) -> ScoringResult {
        let annotation = last_annotation(request);
        let argdown = last_argdown(request);
        let (Some(tree), Some((graph, _))) = (annotation, argdown) else {
            return zero_score(
                self,
                "No XML content or argdown snippet found for semantic coherence scoring.",
            );
        };

        let mut similarities: Vec<f64> = Vec::new();
        for element in tree.propositions() {
            let Some(label) = element.attr("argument_label") else {
                continue;
            };
            if element.text.is_empty() {
                continue;
            }
            if let Some(proposition) = graph.get_proposition(label) {
                for text in &proposition.texts {
                    similarities.push(similarity(text, &element.text));
                }
            }
            if let Some(argument) = graph.get_argument(label) {
                for gist in &argument.gists {
                    similarities.push(similarity(gist, &element.text));
                }
            }
        }

        let score = if similarities.is_empty() {
            0.0
        } else {
            round1(similarities.iter().sum::<f64>() / similarities.len() as f64)
        };
        let mut details = serde_json::Map::new();
        details.insert("pairwise_similarities".into(), serde_json::json!(similarities));
        make_score(
            self,
            score,
            format!("Semantic coherence score between annotations and argdown snippet: {score:.2}."),
            details,
        )
    }
}

// ---------------------------------------------------------------------------
// Scoring pipeline
// ---------------------------------------------------------------------------

/// The root handler a builder produces: the verification pipeline plus the
/// activated scorers. Scoring only happens on valid requests.
pub struct ScoringPipeline {
    name: String,
    handlers: Vec<Box<dyn Handler>>,
    scorers: Vec<Box<dyn Scorer>>,
}

impl ScoringPipeline {
    pub fn new(
        name: impl Into<String>,
        handlers: Vec<Box<dyn Handler>>,
        scorers: Vec<Box<dyn Scorer>>,
    ) -> Self {
        Self {
            name: name.into(),
            handlers,
            scorers,
        }
    }

    pub fn scorers(&self) -> &[Box<dyn Scorer>] {
        &self.scorers
    }

    /// Run all scorers; empty unless every check passed.
    pub fn collect_scores(&self, request: &VerificationRequest) -> Vec<ScoringResult> {
        if !request.is_valid() {
            return Vec::new();
        }
        self.scorers.iter().map(|s| s.score(request)).collect()
    }
}

impl Handler for ScoringPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        for handler in &self.handlers {
            handler.process(request);
            if !request.continue_processing {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::default_processing;
    use veridown_types::CheckResult;

    fn processed(inputs: &str, source: Option<&str>) -> VerificationRequest {
        let mut request = VerificationRequest::new(inputs, source.map(str::to_string));
        default_processing().process(&mut request);
        request
    }

    #[test]
    fn coverage_score_reflects_annotated_share() {
        let request = processed(
            "```xml\n<proposition id=\"a\">half</proposition>half\n```\n",
            None,
        );
        let scorer = CoverageScorer::new("arganno", "annotation_coverage_scorer");
        let result = scorer.score(&request);
        assert_eq!(result.id, "arganno.annotation_coverage_scorer");
        assert!((result.score - 0.5).abs() < 1e-9, "score {}", result.score);
    }

    #[test]
    fn scope_and_density_grow_with_counts() {
        let request = processed(
            "```xml\n<proposition id=\"a\" supports=\"b\">x</proposition> <proposition id=\"b\">y</proposition>\n```\n",
            None,
        );
        let scope = ScopeScorer::new("arganno", "annotation_scope_scorer").score(&request);
        assert!((scope.score - (1.0 - 0.8f64.powi(2))).abs() < 1e-9);
        let density =
            AnnotationDensityScorer::new("arganno", "annotation_density_scorer").score(&request);
        assert!((density.score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn map_size_score_formula() {
        let request = processed(
            "```argdown\n[C]: Root.\n  <+ <A>: One.\n  <+ <B>: Two.\n  <- <D>: Three.\n  <+ <E>: Four.\n```\n",
            None,
        );
        let result = MapSizeScorer::new("argmap", "argmap_size_scorer").score(&request);
        // 5 nodes -> 1 - 0.6^2
        assert!((result.score - (1.0 - 0.36)).abs() < 1e-9, "score {}", result.score);
    }

    #[test]
    fn small_map_scores_zero() {
        let request = processed("```argdown\n[C]: Root.\n  <+ <A>: One.\n```\n", None);
        let result = MapSizeScorer::new("argmap", "argmap_size_scorer").score(&request);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn faithfulness_compares_snippet_and_source() {
        let request = processed("```argdown\n[C]: Claim text.\n```\n", Some("[C]: Claim text."));
        let result = FaithfulnessScorer::new("argmap", "argmap_faithfulness_scorer").score(&request);
        assert!(result.score >= 0.9, "score {}", result.score);
    }

    #[test]
    fn subarguments_and_premises_scores() {
        let request = processed(
            "```argdown\n<A>\n(1) One.\n(2) Two.\n-- {from: ['1', '2']} --\n(3) Mid.\n-- {from: ['3']} --\n(4) Out.\n```\n",
            None,
        );
        let sub = SubargumentsScorer::new("infreco", "infreco_subarguments_scorer").score(&request);
        assert!((sub.score - 0.75).abs() < 1e-9);
        let prem = PremisesScorer::new("infreco", "infreco_premises_scorer").score(&request);
        assert!((prem.score - (1.0 - 0.7)).abs() < 1e-9);
    }

    #[test]
    fn triviality_detects_conjunction_of_premises() {
        let inputs = "```argdown\n<A>\n(1) P. {formalization: \"p\", declarations: {p: \"p\", q: \"q\"}}\n(2) Q. {formalization: \"q\"}\n-- {from: ['1', '2']} --\n(3) Both. {formalization: \"p & q\"}\n```\n";
        let mut request = processed(inputs, None);
        crate::logreco::WellFormedFormulasHandler::new(
            "wff", None, "formalization", "declarations",
        )
        .process(&mut request);
        let result = TrivialityScorer::new("logreco", "logreco_triviality_scorer").score(&request);
        assert_eq!(result.score, 0.0);
        assert!(result.message.as_deref().unwrap().contains("trivially"));
    }

    #[test]
    fn scoring_pipeline_skips_invalid_requests() {
        let pipeline = ScoringPipeline::new(
            "test_pipeline",
            vec![],
            vec![Box::new(ScopeScorer::new("arganno", "annotation_scope_scorer"))],
        );
        let mut request = processed("```xml\n<proposition id=\"a\">x</proposition>\n```\n", None);
        request.add_result(CheckResult::invalid("h", vec![], "failed"));
        assert!(pipeline.collect_scores(&request).is_empty());

        let valid = processed("```xml\n<proposition id=\"a\">x</proposition>\n```\n", None);
        assert_eq!(pipeline.collect_scores(&valid).len(), 1);
    }
}
