//! Coherence between an xml annotation and an argdown reconstruction
//! (informal or logical — the rules are identical).

use indexmap::IndexMap;
use veridown_anno::AnnotationTree;
use veridown_argdown::{ArgdownGraph, Valence};
use veridown_types::{CheckResult, Result};

use crate::dialectics::props_used_in_inference;
use crate::handler::{evaluate_pairs, CompositeHandler, Handler};
use crate::request::{PrimaryData, VerificationRequest};

use super::{default_argdown, default_xml, is_anchored_pair, locate_pair, PairFilters};

// ---------------------------------------------------------------------------
// Label bookkeeping
// ---------------------------------------------------------------------------

struct Labels {
    all_argument_labels: Vec<String>,
    all_annotation_ids: Vec<String>,
    /// annotation id → argument label
    argument_label_map: IndexMap<String, String>,
    /// annotation id → ref_reco step label
    refreco_map: IndexMap<String, String>,
    /// annotation id → proposition label of the referenced step
    proposition_label_map: IndexMap<String, String>,
}

fn collect_labels(reco: &ArgdownGraph, anno: &AnnotationTree) -> Labels {
    let all_argument_labels: Vec<String> =
        reco.arguments.iter().filter_map(|a| a.label.clone()).collect();
    let all_annotation_ids: Vec<String> = anno
        .propositions()
        .iter()
        .filter_map(|p| p.attr("id"))
        .map(str::to_string)
        .collect();

    let mut argument_label_map = IndexMap::new();
    let mut refreco_map = IndexMap::new();
    let mut proposition_label_map = IndexMap::new();

    for element in anno.propositions() {
        let (Some(id), Some(label)) = (element.attr("id"), element.attr("argument_label"))
        else {
            continue;
        };
        if !all_argument_labels.iter().any(|l| l == label) {
            continue;
        }
        argument_label_map.insert(id.to_string(), label.to_string());
        if let Some(ref_reco) = element.attr("ref_reco_label") {
            refreco_map.insert(id.to_string(), ref_reco.to_string());
            if let Some(argument) = reco.get_argument(label) {
                if let Some(step) = argument.pcs.iter().find(|p| p.label() == ref_reco) {
                    proposition_label_map
                        .insert(id.to_string(), step.proposition_label().to_string());
                }
            }
        }
    }

    Labels {
        all_argument_labels,
        all_annotation_ids,
        argument_label_map,
        refreco_map,
        proposition_label_map,
    }
}

fn annotation_ids_of(data: &veridown_argdown::DataMap) -> Option<Vec<String>> {
    data.get("annotation_ids")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().map(crate::request::scalar_string).collect())
}

/// Normalize the anchored pair to (reconstruction, annotation).
fn oriented<'a>(
    ctx: &'a VerificationRequest,
    filters: &PairFilters,
) -> Option<(&'a PrimaryData, &'a PrimaryData)> {
    locate_pair(ctx, filters, default_argdown, default_xml)
}

// ---------------------------------------------------------------------------
// Element coherence
// ---------------------------------------------------------------------------

/// Every proposition element must resolve to an argument and a step of the
/// reconstruction, and the step's proposition must list the element's id in
/// its `annotation_ids` (and conversely, no dangling or shared ids).
pub struct ArgannoInfrecoElemCohereHandler {
    name: String,
    filters: PairFilters,
}

impl ArgannoInfrecoElemCohereHandler {
    pub fn new(name: impl Into<String>, filters: PairFilters) -> Self {
        Self {
            name: name.into(),
            filters,
        }
    }

    fn check(reco: &ArgdownGraph, anno: &AnnotationTree) -> Vec<String> {
        let labels = collect_labels(reco, anno);
        let mut msgs = Vec::new();

        // annotation → argdown
        for element in anno.propositions() {
            let id = element.attr("id").unwrap_or("?");
            let Some(arg_label) = element.attr("argument_label") else {
                msgs.push(format!(
                    "Proposition element with id={id} lacks an 'argument_label' attribute."
                ));
                continue;
            };
            if !labels.all_argument_labels.iter().any(|l| l == arg_label) {
                msgs.push(format!(
                    "Illegal 'argument_label' reference of proposition element with id={id}: \
                     No argument with label '{arg_label}' in the Argdown snippet."
                ));
                continue;
            }
            let Some(ref_reco) = element.attr("ref_reco_label") else {
                continue;
            };
            let Some(argument) = reco.get_argument(arg_label) else {
                continue;
            };
            if argument.pcs.is_empty() {
                continue;
            }
            let Some(step) = argument.pcs.iter().find(|p| p.label() == ref_reco) else {
                msgs.push(format!(
                    "Illegal 'ref_reco_label' reference of proposition element with id={id}: \
                     No premise or conclusion with label '{ref_reco}' in argument '{arg_label}'."
                ));
                continue;
            };
            let Some(proposition) = reco.get_proposition(step.proposition_label()) else {
                continue;
            };
            let id_refs = annotation_ids_of(&proposition.data).unwrap_or_default();
            if !id_refs.iter().any(|r| r == id) {
                msgs.push(format!(
                    "Label reference mismatch: proposition element with id={id} in the annotation \
                     references (via ref_reco) the proposition '{}' of argument '{arg_label}', but \
                     the annotation_ids={id_refs:?} of that proposition do not include the id={id}.",
                    step.label()
                ));
            }
        }

        // argdown → annotation
        for argument in &reco.arguments {
            let Some(arg_label) = &argument.label else {
                continue;
            };
            if !labels.argument_label_map.values().any(|l| l == arg_label) {
                msgs.push(format!(
                    "Free floating argument: Argument '{arg_label}' does not have any \
                     corresponding elements in the annotation."
                ));
            }
            for step in &argument.pcs {
                let Some(proposition) = reco.get_proposition(step.proposition_label()) else {
                    continue;
                };
                let Some(id_refs) = annotation_ids_of(&proposition.data) else {
                    msgs.push(format!(
                        "Missing 'annotation_ids' attribute in proposition '{}' of argument '{arg_label}'.",
                        step.label()
                    ));
                    continue;
                };
                for id_ref in id_refs {
                    if !labels.all_annotation_ids.iter().any(|i| i == &id_ref) {
                        msgs.push(format!(
                            "Illegal 'annotation_ids' reference in proposition '{}' of argument \
                             '{arg_label}': No proposition element with id='{id_ref}' in the annotation.",
                            step.label()
                        ));
                    }
                }
            }
        }

        // no annotation id may be claimed by two distinct propositions
        for i in 0..reco.propositions.len() {
            for j in (i + 1)..reco.propositions.len() {
                let first = &reco.propositions[i];
                let second = &reco.propositions[j];
                let ids_first = annotation_ids_of(&first.data).unwrap_or_default();
                let ids_second = annotation_ids_of(&second.data).unwrap_or_default();
                let shared: Vec<String> = ids_first
                    .iter()
                    .filter(|id| ids_second.contains(id))
                    .map(|id| format!("'{id}'"))
                    .collect();
                if !shared.is_empty() {
                    msgs.push(format!(
                        "Label reference mismatch: annotation text segment(s) {} are referenced \
                         by distinct propositions in the Argdown argument reconstruction \
                         ('{}', '{}').",
                        shared.join(", "),
                        first.label,
                        second.label
                    ));
                }
            }
        }

        msgs
    }
}

impl Handler for ArgannoInfrecoElemCohereHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let filters = self.filters.clone();
        evaluate_pairs(
            request,
            |a, b, ctx| is_anchored_pair(a, b, ctx, &filters, default_argdown, default_xml),
            |_a, _b, ctx| {
                let Some((reco_item, anno_item)) = oriented(ctx, &filters) else {
                    return Ok(None);
                };
                let (Some(reco), Some(anno)) = (reco_item.argdown(), anno_item.annotation())
                else {
                    return Ok(None);
                };
                let msgs = Self::check(reco, anno);
                let refs = vec![reco_item.id.clone(), anno_item.id.clone()];
                Ok(Some(if msgs.is_empty() {
                    CheckResult::valid(&name, refs)
                } else {
                    CheckResult::invalid(&name, refs, msgs.join(" - "))
                }))
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Relation coherence
// ---------------------------------------------------------------------------

/// Annotated support/attack edges must be mirrored by inferential or
/// dialectical relations of the reconstruction.
pub struct ArgannoInfrecoRelationCohereHandler {
    name: String,
    filters: PairFilters,
    from_key: String,
}

impl ArgannoInfrecoRelationCohereHandler {
    pub fn new(name: impl Into<String>, filters: PairFilters, from_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filters,
            from_key: from_key.into(),
        }
    }

    fn relations_with_valence(
        reco: &ArgdownGraph,
        from: &[Option<&String>],
        to: &[Option<&String>],
        valence: Valence,
    ) -> bool {
        for source in from.iter().flatten() {
            for target in to.iter().flatten() {
                if reco
                    .relations_between(source, target)
                    .iter()
                    .any(|r| r.valence == valence)
                {
                    return true;
                }
            }
        }
        false
    }

    fn check(&self, reco: &ArgdownGraph, anno: &AnnotationTree) -> Vec<String> {
        let labels = collect_labels(reco, anno);
        let mut msgs = Vec::new();

        let mut support_edges: Vec<(String, String)> = Vec::new();
        let mut attack_edges: Vec<(String, String)> = Vec::new();
        for element in anno.propositions() {
            let Some(from_id) = element.attr("id") else {
                continue;
            };
            for target in element.list_attr("supports") {
                if labels.all_annotation_ids.contains(&target) {
                    support_edges.push((from_id.to_string(), target));
                }
            }
            for target in element.list_attr("attacks") {
                if labels.all_annotation_ids.contains(&target) {
                    attack_edges.push((from_id.to_string(), target));
                }
            }
        }

        for (from_id, to_id) in &support_edges {
            let arglabel_from = labels.argument_label_map.get(from_id);
            let arglabel_to = labels.argument_label_map.get(to_id);
            let proplabel_from = labels.proposition_label_map.get(from_id);
            let proplabel_to = labels.proposition_label_map.get(to_id);

            let (Some(arglabel_from), Some(arglabel_to)) = (arglabel_from, arglabel_to) else {
                msgs.push(format!(
                    "Annotated support relation {from_id} -> {to_id} is not matched by any \
                     relation in the reconstruction (illegal argument_labels)."
                ));
                continue;
            };

            if arglabel_from != arglabel_to {
                let matched = Self::relations_with_valence(
                    reco,
                    &[Some(arglabel_from), proplabel_from],
                    &[Some(arglabel_to), proplabel_to],
                    Valence::Support,
                );
                if !matched {
                    msgs.push(format!(
                        "Proposition elements {from_id} and {to_id} are annotated to support \
                         each other, but none of the corresponding Argdown elements \
                         <{arglabel_from}>/[{}] supports <{arglabel_to}> or [{}].",
                        proplabel_from.map(String::as_str).unwrap_or("?"),
                        proplabel_to.map(String::as_str).unwrap_or("?"),
                    ));
                }
                continue;
            }

            let (Some(argument), Some(ref_from), Some(ref_to)) = (
                reco.get_argument(arglabel_from),
                labels.refreco_map.get(from_id),
                labels.refreco_map.get(to_id),
            ) else {
                continue;
            };
            if !props_used_in_inference(argument, ref_to, &self.from_key)
                .iter()
                .any(|label| label == ref_from)
            {
                msgs.push(format!(
                    "Annotated support relation {from_id} -> {to_id} is not matched by the \
                     inferential relations in the argument '{arglabel_from}'."
                ));
            }
        }

        for (from_id, to_id) in &attack_edges {
            let arglabel_from = labels.argument_label_map.get(from_id);
            let arglabel_to = labels.argument_label_map.get(to_id);
            let proplabel_from = labels.proposition_label_map.get(from_id);
            let proplabel_to = labels.proposition_label_map.get(to_id);

            let (Some(arglabel_from), Some(arglabel_to)) = (arglabel_from, arglabel_to) else {
                msgs.push(format!(
                    "Annotated attack relation from {from_id} to {to_id} is not matched by any \
                     relation in the reconstruction (illegal argument_labels)."
                ));
                continue;
            };

            if arglabel_from == arglabel_to {
                msgs.push(format!(
                    "Text segments assigned to the same argument cannot attack each other \
                     ({from_id} attacks {to_id} while both are assigned to {arglabel_from})."
                ));
                continue;
            }

            let matched = Self::relations_with_valence(
                reco,
                &[Some(arglabel_from), proplabel_from],
                &[Some(arglabel_to), proplabel_to],
                Valence::Attack,
            );
            if !matched {
                msgs.push(format!(
                    "Proposition elements {from_id} and {to_id} are annotated to attack each \
                     other, but none of the corresponding Argdown elements <{arglabel_from}>/[{}] \
                     attacks <{arglabel_to}> or [{}].",
                    proplabel_from.map(String::as_str).unwrap_or("?"),
                    proplabel_to.map(String::as_str).unwrap_or("?"),
                ));
            }
        }

        msgs
    }
}

impl Handler for ArgannoInfrecoRelationCohereHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let filters = self.filters.clone();
        evaluate_pairs(
            request,
            |a, b, ctx| is_anchored_pair(a, b, ctx, &filters, default_argdown, default_xml),
            |_a, _b, ctx| {
                let Some((reco_item, anno_item)) = oriented(ctx, &filters) else {
                    return Ok(None);
                };
                let (Some(reco), Some(anno)) = (reco_item.argdown(), anno_item.annotation())
                else {
                    return Ok(None);
                };
                let msgs = self.check(reco, anno);
                let refs = vec![reco_item.id.clone(), anno_item.id.clone()];
                Ok(Some(if msgs.is_empty() {
                    CheckResult::valid(&name, refs)
                } else {
                    CheckResult::invalid(&name, refs, msgs.join(" - "))
                }))
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Composites
// ---------------------------------------------------------------------------

/// Element plus relation coherence for annotation ↔ informal reconstruction.
pub fn arganno_infreco_coherence(filters: PairFilters, from_key: &str) -> CompositeHandler {
    CompositeHandler::new(
        "ArgannoInfrecoCoherenceHandler",
        vec![
            Box::new(ArgannoInfrecoElemCohereHandler::new(
                "ArgannoInfrecoElemCohereHandler",
                filters.clone(),
            )),
            Box::new(ArgannoInfrecoRelationCohereHandler::new(
                "ArgannoInfrecoRelationCohereHandler",
                filters,
                from_key,
            )),
        ],
    )
}

/// The arganno ↔ logreco rules coincide with the infreco ones.
pub fn arganno_logreco_coherence(filters: PairFilters, from_key: &str) -> CompositeHandler {
    CompositeHandler::new(
        "ArgannoLogrecoCoherenceHandler",
        vec![
            Box::new(ArgannoInfrecoElemCohereHandler::new(
                "ArgannoInfrecoElemCohereHandler",
                filters.clone(),
            )),
            Box::new(ArgannoInfrecoRelationCohereHandler::new(
                "ArgannoInfrecoRelationCohereHandler",
                filters,
                from_key,
            )),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::default_processing;

    fn processed(inputs: &str) -> VerificationRequest {
        let mut request = VerificationRequest::new(inputs, None);
        default_processing().process(&mut request);
        request
    }

    const COHERENT: &str = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"2\">P.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: []}\n-- {from: ['1']} --\n(2) P. {annotation_ids: ['i1']}\n```\n";

    #[test]
    fn coherent_pair_passes_element_check() {
        let mut request = processed(COHERENT);
        arganno_infreco_coherence(PairFilters::default(), "from").process(&mut request);
        assert!(request.is_valid(), "results: {:#?}", request.results);
        // result references both items, reconstruction first
        let result = request.results.last().unwrap();
        assert_eq!(
            result.verification_data_references,
            vec!["argdown_0".to_string(), "xml_0".to_string()]
        );
    }

    #[test]
    fn unknown_argument_label_flagged() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"Z\" ref_reco_label=\"2\">P.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: []}\n-- {from: ['1']} --\n(2) P. {annotation_ids: ['i1']}\n```\n";
        let mut request = processed(inputs);
        ArgannoInfrecoElemCohereHandler::new("elem", PairFilters::default())
            .process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(
            message.contains("No argument with label 'Z'"),
            "got: {message}"
        );
    }

    #[test]
    fn unknown_ref_reco_label_flagged() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"9\">P.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: []}\n-- {from: ['1']} --\n(2) P. {annotation_ids: ['i1']}\n```\n";
        let mut request = processed(inputs);
        ArgannoInfrecoElemCohereHandler::new("elem", PairFilters::default())
            .process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("No premise or conclusion with label '9'"));
    }

    #[test]
    fn missing_back_reference_flagged() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"2\">P.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: []}\n-- {from: ['1']} --\n(2) P. {annotation_ids: []}\n```\n";
        let mut request = processed(inputs);
        ArgannoInfrecoElemCohereHandler::new("elem", PairFilters::default())
            .process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("do not include the id=i1"));
    }

    #[test]
    fn shared_annotation_id_flagged() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"1\">X.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: ['i1']}\n-- {from: ['1']} --\n(2) P. {annotation_ids: ['i1']}\n```\n";
        let mut request = processed(inputs);
        ArgannoInfrecoElemCohereHandler::new("elem", PairFilters::default())
            .process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("referenced by distinct propositions"));
    }

    #[test]
    fn intra_argument_support_follows_inference() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"1\" supports=\"i2\">X.</proposition> <proposition id=\"i2\" argument_label=\"A\" ref_reco_label=\"2\">P.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: ['i1']}\n-- {from: ['1']} --\n(2) P. {annotation_ids: ['i2']}\n```\n";
        let mut request = processed(inputs);
        ArgannoInfrecoRelationCohereHandler::new("rel", PairFilters::default(), "from")
            .process(&mut request);
        assert!(request.results[0].is_valid, "{:#?}", request.results);
    }

    #[test]
    fn unmatched_intra_argument_support_flagged() {
        // i2 supports i1, but the inference runs the other way
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"1\">X.</proposition> <proposition id=\"i2\" argument_label=\"A\" ref_reco_label=\"2\" supports=\"i1\">P.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: ['i1']}\n-- {from: ['1']} --\n(2) P. {annotation_ids: ['i2']}\n```\n";
        let mut request = processed(inputs);
        ArgannoInfrecoRelationCohereHandler::new("rel", PairFilters::default(), "from")
            .process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("not matched by the inferential relations"));
    }

    #[test]
    fn same_argument_attack_flagged() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"1\" attacks=\"i2\">X.</proposition> <proposition id=\"i2\" argument_label=\"A\" ref_reco_label=\"2\">P.</proposition>\n```\n```argdown\n<A>\n(1) X {annotation_ids: ['i1']}\n-- {from: ['1']} --\n(2) P. {annotation_ids: ['i2']}\n```\n";
        let mut request = processed(inputs);
        ArgannoInfrecoRelationCohereHandler::new("rel", PairFilters::default(), "from")
            .process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("cannot attack each other"));
    }

    #[test]
    fn cross_argument_support_needs_relation() {
        // two arguments without any dialectical link between them
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" ref_reco_label=\"2\" supports=\"i2\">X.</proposition> <proposition id=\"i2\" argument_label=\"B\" ref_reco_label=\"2\">Y.</proposition>\n```\n```argdown\n<A>\n(1) One. {annotation_ids: []}\n-- {from: ['1']} --\n(2) X. {annotation_ids: ['i1']}\n\n<B>\n(1) Other. {annotation_ids: []}\n-- {from: ['1']} --\n(2) Y. {annotation_ids: ['i2']}\n```\n";
        let mut request = processed(inputs);
        ArgannoInfrecoRelationCohereHandler::new("rel", PairFilters::default(), "from")
            .process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("annotated to support each other"));
    }
}
