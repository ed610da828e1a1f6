//! Annotation integrity checks (the arganno family).
//!
//! Each handler asserts a single invariant over an xml annotation item and
//! produces one result per matched item.

use veridown_anno::AnnotationTree;
use veridown_types::{CheckResult, Dtype, Result};

use crate::handler::{evaluate_items, CompositeHandler, Handler, ItemFilter};
use crate::request::{PrimaryData, VerificationRequest};
use crate::util::{shorten, strip_ws};

/// Attribute names a `<proposition>` may carry.
pub const LEGAL_ATTRIBUTES: [&str; 5] =
    ["id", "supports", "attacks", "argument_label", "ref_reco_label"];

fn annotation_of(item: &PrimaryData) -> Option<&AnnotationTree> {
    item.annotation()
}

// ---------------------------------------------------------------------------
// SourceTextIntegrityHandler
// ---------------------------------------------------------------------------

const LEVENSHTEIN_TOLERANCE: f64 = 0.01;
const SOURCE_SHORTENING_WC_THRESHOLD: usize = 200;

/// The annotation's plain text must reproduce the source text. For sources
/// over the word-count threshold a relaxed check suffices: every annotated
/// passage must occur in the source, in reading order.
pub struct SourceTextIntegrityHandler {
    name: String,
    filter: Option<ItemFilter>,
    levenshtein_tolerance: f64,
    shortening_threshold: usize,
}

impl SourceTextIntegrityHandler {
    pub fn new(name: impl Into<String>, filter: Option<ItemFilter>) -> Self {
        Self {
            name: name.into(),
            filter,
            levenshtein_tolerance: LEVENSHTEIN_TOLERANCE,
            shortening_threshold: SOURCE_SHORTENING_WC_THRESHOLD,
        }
    }

    fn roughly_equal(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let a = strip_ws(a);
        let b = strip_ws(b);
        if a == b {
            return true;
        }
        strsim::normalized_damerau_levenshtein(&a, &b) >= 1.0 - self.levenshtein_tolerance
    }

    fn check_strict(&self, source: &str, tree: &AnnotationTree) -> Vec<String> {
        let original = crate::util::collapse_ws(source);
        let annotated = crate::util::collapse_ws(tree.text());
        if self.roughly_equal(&original, &annotated) {
            return Vec::new();
        }
        let divergence = original
            .chars()
            .zip(annotated.chars())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| original.chars().count().min(annotated.chars().count()));
        vec![format!(
            "Source text '{}' was altered. The annotated text diverges from the source near \
             position {divergence}: source reads '{}', annotation reads '{}'.",
            shorten(source, 40),
            shorten(&original.chars().skip(divergence).take(40).collect::<String>(), 40),
            shorten(&annotated.chars().skip(divergence).take(40).collect::<String>(), 40),
        )]
    }

    fn check_shortening_allowed(&self, source: &str, tree: &AnnotationTree) -> Vec<String> {
        let cleaned_source = strip_ws(source);
        let mut msgs = Vec::new();
        let mut current_index = 0usize;
        for proposition in tree.propositions() {
            let cleaned = strip_ws(&proposition.text);
            if cleaned.is_empty() {
                continue;
            }
            match cleaned_source[current_index..].find(&cleaned) {
                Some(at) => {
                    current_index += at + cleaned.len();
                }
                None => {
                    if cleaned_source.contains(&cleaned) {
                        msgs.push(format!(
                            "Text flow mixup: Annotated proposition '{}' does not appear _after_ \
                             the previous annotation in the source text.",
                            shorten(&proposition.repr(), 40)
                        ));
                    } else {
                        msgs.push(format!(
                            "Annotated proposition '{}' is missing from the source text.",
                            shorten(&proposition.repr(), 40)
                        ));
                    }
                }
            }
        }
        msgs
    }
}

impl Handler for SourceTextIntegrityHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        evaluate_items(request, Dtype::Xml, self.filter.as_ref(), |item, ctx| {
            let Some(tree) = annotation_of(item) else {
                return Ok(None);
            };
            let Some(source) = ctx.source.as_deref().map(str::trim).filter(|s| !s.is_empty())
            else {
                return Ok(None);
            };

            let msgs = if source.split_whitespace().count() <= self.shortening_threshold {
                self.check_strict(source, tree)
            } else {
                self.check_shortening_allowed(source, tree)
            };

            Ok(Some(if msgs.is_empty() {
                CheckResult::valid(&name, vec![item.id.clone()])
            } else {
                CheckResult::invalid(&name, vec![item.id.clone()], msgs.join(" "))
            }))
        })
    }
}

// ---------------------------------------------------------------------------
// Structural annotation checks
// ---------------------------------------------------------------------------

/// Shared scaffolding: a named, filtered check over one annotation tree.
macro_rules! arganno_handler {
    ($(#[$doc:meta])* $handler:ident, $evaluate:expr) => {
        $(#[$doc])*
        pub struct $handler {
            name: String,
            filter: Option<ItemFilter>,
        }

        impl $handler {
            pub fn new(name: impl Into<String>, filter: Option<ItemFilter>) -> Self {
                Self {
                    name: name.into(),
                    filter,
                }
            }
        }

        impl Handler for $handler {
            fn name(&self) -> &str {
                &self.name
            }

            fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
                let name = self.name.clone();
                evaluate_items(request, Dtype::Xml, self.filter.as_ref(), |item, _ctx| {
                    let Some(tree) = annotation_of(item) else {
                        return Ok(None);
                    };
                    #[allow(clippy::redundant_closure_call)]
                    let message: Option<String> = ($evaluate)(tree);
                    Ok(Some(match message {
                        None => CheckResult::valid(&name, vec![item.id.clone()]),
                        Some(msg) => CheckResult::invalid(&name, vec![item.id.clone()], msg),
                    }))
                })
            }
        }
    };
}

arganno_handler!(
    /// No `<proposition>` may contain another `<proposition>`.
    NestedPropositionHandler,
    |tree: &AnnotationTree| {
        let nested: Vec<String> = tree
            .propositions()
            .iter()
            .filter(|p| p.has_nested("proposition"))
            .map(|p| format!("'{}'", shorten(&p.repr(), 256)))
            .collect();
        if nested.is_empty() {
            None
        } else {
            Some(format!("Nested annotations in proposition(s) {}", nested.join(", ")))
        }
    }
);

arganno_handler!(
    /// Every proposition carries a non-empty `id`.
    PropositionIdPresenceHandler,
    |tree: &AnnotationTree| {
        let missing: Vec<String> = tree
            .propositions()
            .iter()
            .filter(|p| p.attr("id").map(str::trim).unwrap_or("").is_empty())
            .map(|p| format!("'{}'", shorten(&p.repr(), 64)))
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some(format!("Missing id in proposition(s) {}", missing.join(", ")))
        }
    }
);

arganno_handler!(
    /// All proposition ids are distinct.
    PropositionIdUniquenessHandler,
    |tree: &AnnotationTree| {
        let ids: Vec<String> = tree
            .propositions()
            .iter()
            .filter_map(|p| p.attr("id"))
            .map(str::to_string)
            .collect();
        let dupes = crate::util::duplicates(&ids);
        if dupes.is_empty() {
            None
        } else {
            Some(format!("Duplicate ids: {}", dupes.join(", ")))
        }
    }
);

arganno_handler!(
    /// Every id referenced by `supports` exists.
    SupportReferenceValidityHandler,
    |tree: &AnnotationTree| {
        let ids: Vec<&str> = tree.propositions().iter().filter_map(|p| p.attr("id")).collect();
        let msgs: Vec<String> = tree
            .propositions()
            .iter()
            .flat_map(|p| {
                p.list_attr("supports")
                    .into_iter()
                    .filter(|support| !ids.contains(&support.as_str()))
                    .map(|support| {
                        format!(
                            "Supported proposition with id '{support}' in proposition '{}' does not exist.",
                            shorten(&p.repr(), 64)
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        if msgs.is_empty() {
            None
        } else {
            Some(msgs.join(" "))
        }
    }
);

arganno_handler!(
    /// Every id referenced by `attacks` exists.
    AttackReferenceValidityHandler,
    |tree: &AnnotationTree| {
        let ids: Vec<&str> = tree.propositions().iter().filter_map(|p| p.attr("id")).collect();
        let msgs: Vec<String> = tree
            .propositions()
            .iter()
            .flat_map(|p| {
                p.list_attr("attacks")
                    .into_iter()
                    .filter(|attack| !ids.contains(&attack.as_str()))
                    .map(|attack| {
                        format!(
                            "Attacked proposition with id '{attack}' in proposition '{}' does not exist.",
                            shorten(&p.repr(), 64)
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        if msgs.is_empty() {
            None
        } else {
            Some(msgs.join(" "))
        }
    }
);

arganno_handler!(
    /// Attributes are drawn from the closed attribute set.
    AttributeValidityHandler,
    |tree: &AnnotationTree| {
        let msgs: Vec<String> = tree
            .propositions()
            .iter()
            .flat_map(|p| {
                p.attrs
                    .keys()
                    .filter(|attr| !LEGAL_ATTRIBUTES.contains(&attr.as_str()))
                    .map(|attr| {
                        format!(
                            "Unknown attribute '{attr}' in proposition '{}'",
                            shorten(&p.repr(), 64)
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        if msgs.is_empty() {
            None
        } else {
            Some(msgs.join(" "))
        }
    }
);

arganno_handler!(
    /// The only element name permitted is `proposition`.
    ElementValidityHandler,
    |tree: &AnnotationTree| {
        let msgs: Vec<String> = tree
            .all_elements()
            .iter()
            .filter(|e| e.name != "proposition")
            .map(|e| {
                format!(
                    "Unknown element '{}' at '{}'",
                    e.name,
                    shorten(&e.repr(), 64)
                )
            })
            .collect();
        if msgs.is_empty() {
            None
        } else {
            Some(msgs.join(" "))
        }
    }
);

// ---------------------------------------------------------------------------
// Optional label checks
// ---------------------------------------------------------------------------

/// Checks `argument_label` / `ref_reco_label` attributes against an
/// externally supplied set of legal labels; inactive when none are given.
pub struct LabelValidityHandler {
    name: String,
    filter: Option<ItemFilter>,
    attribute: &'static str,
    legal_labels: Vec<String>,
}

impl LabelValidityHandler {
    pub fn argument_labels(
        name: impl Into<String>,
        filter: Option<ItemFilter>,
        legal_labels: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            attribute: "argument_label",
            legal_labels,
        }
    }

    pub fn ref_reco_labels(
        name: impl Into<String>,
        filter: Option<ItemFilter>,
        legal_labels: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            attribute: "ref_reco_label",
            legal_labels,
        }
    }
}

impl Handler for LabelValidityHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        if self.legal_labels.is_empty() {
            return Ok(());
        }
        let name = self.name.clone();
        evaluate_items(request, Dtype::Xml, self.filter.as_ref(), |item, _ctx| {
            let Some(tree) = annotation_of(item) else {
                return Ok(None);
            };
            let msgs: Vec<String> = tree
                .propositions()
                .iter()
                .filter_map(|p| p.attr(self.attribute).map(|label| (p, label)))
                .filter(|(_, label)| !self.legal_labels.iter().any(|l| l == label))
                .map(|(p, label)| {
                    format!(
                        "Illegal {} '{label}' in proposition '{}'",
                        self.attribute.replace('_', " "),
                        shorten(&p.repr(), 64)
                    )
                })
                .collect();
            Ok(Some(if msgs.is_empty() {
                CheckResult::valid(&name, vec![item.id.clone()])
            } else {
                CheckResult::invalid(&name, vec![item.id.clone()], msgs.join(" "))
            }))
        })
    }
}

// ---------------------------------------------------------------------------
// Composite
// ---------------------------------------------------------------------------

/// The default arganno composite, one handler per invariant.
pub fn arganno_composite(filter: Option<ItemFilter>) -> CompositeHandler {
    CompositeHandler::new(
        "ArgannoCompositeHandler",
        vec![
            Box::new(SourceTextIntegrityHandler::new(
                "Arganno.SourceTextIntegrityHandler",
                filter.clone(),
            )),
            Box::new(NestedPropositionHandler::new(
                "Arganno.NestedPropositionHandler",
                filter.clone(),
            )),
            Box::new(PropositionIdPresenceHandler::new(
                "Arganno.PropositionIdPresenceHandler",
                filter.clone(),
            )),
            Box::new(PropositionIdUniquenessHandler::new(
                "Arganno.PropositionIdUniquenessHandler",
                filter.clone(),
            )),
            Box::new(SupportReferenceValidityHandler::new(
                "Arganno.SupportReferenceValidityHandler",
                filter.clone(),
            )),
            Box::new(AttackReferenceValidityHandler::new(
                "Arganno.AttackReferenceValidityHandler",
                filter.clone(),
            )),
            Box::new(AttributeValidityHandler::new(
                "Arganno.AttributeValidityHandler",
                filter.clone(),
            )),
            Box::new(ElementValidityHandler::new(
                "Arganno.ElementValidityHandler",
                filter,
            )),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::default_processing;

    fn processed(inputs: &str, source: Option<&str>) -> VerificationRequest {
        let mut request = VerificationRequest::new(inputs, source.map(str::to_string));
        default_processing().process(&mut request);
        request
    }

    fn xml(body: &str) -> String {
        format!("```xml\n{body}\n```\n")
    }

    #[test]
    fn clean_annotation_passes_all_checks() {
        let inputs = xml(r#"<proposition id="p1" supports="p2">One.</proposition> <proposition id="p2">Two.</proposition>"#);
        let mut request = processed(&inputs, None);
        arganno_composite(None).process(&mut request);
        assert!(request.is_valid(), "results: {:?}", request.results);
    }

    #[test]
    fn nested_propositions_flagged() {
        let inputs = xml(r#"<proposition id="a">x <proposition id="b">y</proposition></proposition>"#);
        let mut request = processed(&inputs, None);
        NestedPropositionHandler::new("n", None).process(&mut request);
        let result = request.results.last().unwrap();
        assert!(!result.is_valid);
        assert!(result.message.as_deref().unwrap().contains("Nested annotations"));
    }

    #[test]
    fn missing_and_duplicate_ids_flagged() {
        let inputs = xml(r#"<proposition>x</proposition><proposition id="a">y</proposition><proposition id="a">z</proposition>"#);
        let mut request = processed(&inputs, None);
        PropositionIdPresenceHandler::new("presence", None).process(&mut request);
        PropositionIdUniquenessHandler::new("unique", None).process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("Missing id"));
        assert_eq!(
            request.results[1].message.as_deref(),
            Some("Duplicate ids: a")
        );
    }

    #[test]
    fn dangling_support_reference_message() {
        let inputs = xml(r#"<proposition id="a" supports="b">Something profound.</proposition>"#);
        let mut request = processed(&inputs, None);
        SupportReferenceValidityHandler::new("s", None).process(&mut request);
        let message = request.results.last().unwrap().message.clone().unwrap();
        assert!(
            message.contains("Supported proposition with id 'b'"),
            "got: {message}"
        );
        assert!(message.contains("does not exist."));
    }

    #[test]
    fn unknown_attribute_and_element_flagged() {
        let inputs = xml(r#"<proposition id="a" color="red">x</proposition><claim id="b">y</claim>"#);
        let mut request = processed(&inputs, None);
        AttributeValidityHandler::new("attrs", None).process(&mut request);
        AttributeValidityHandler::new("attrs2", None).process(&mut request);
        ElementValidityHandler::new("elems", None).process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("Unknown attribute 'color'"));
        assert!(request.results[2]
            .message
            .as_deref()
            .unwrap()
            .contains("Unknown element 'claim'"));
    }

    #[test]
    fn source_integrity_accepts_whitespace_changes() {
        let source = "One sentence. Another sentence.";
        let inputs = xml(r#"<proposition id="a">One   sentence.</proposition>
            Another
            sentence."#);
        let mut request = processed(&inputs, Some(source));
        SourceTextIntegrityHandler::new("integrity", None).process(&mut request);
        assert!(
            request.results.last().unwrap().is_valid,
            "results: {:?}",
            request.results
        );
    }

    #[test]
    fn source_integrity_rejects_alteration() {
        let source = "The cat sat on the mat.";
        let inputs = xml(r#"<proposition id="a">The dog sat on the mat.</proposition>"#);
        let mut request = processed(&inputs, Some(source));
        SourceTextIntegrityHandler::new("integrity", None).process(&mut request);
        let result = request.results.last().unwrap();
        assert!(!result.is_valid);
        assert!(result.message.as_deref().unwrap().contains("was altered"));
    }

    #[test]
    fn long_source_relaxed_check_order() {
        let mut source = String::new();
        for i in 0..210 {
            source.push_str(&format!("word{i} "));
        }
        // annotations out of reading order
        let inputs = xml(r#"<proposition id="a">word50</proposition> <proposition id="b">word10</proposition>"#);
        let mut request = processed(&inputs, Some(&source));
        SourceTextIntegrityHandler::new("integrity", None).process(&mut request);
        let result = request.results.last().unwrap();
        assert!(!result.is_valid);
        assert!(result
            .message
            .as_deref()
            .unwrap()
            .contains("Text flow mixup"));
    }

    #[test]
    fn label_checks_skip_without_legal_labels() {
        let inputs = xml(r#"<proposition id="a" argument_label="X">t</proposition>"#);
        let mut request = processed(&inputs, None);
        LabelValidityHandler::argument_labels("labels", None, vec![]).process(&mut request);
        // handler executed but produced no result
        assert!(request.executed_handlers.contains(&"labels".to_string()));
        assert!(request.results.is_empty());
    }

    #[test]
    fn illegal_argument_label_flagged() {
        let inputs = xml(r#"<proposition id="a" argument_label="X">t</proposition>"#);
        let mut request = processed(&inputs, None);
        LabelValidityHandler::argument_labels("labels", None, vec!["A".to_string()])
            .process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("Illegal argument label 'X'"));
    }
}
