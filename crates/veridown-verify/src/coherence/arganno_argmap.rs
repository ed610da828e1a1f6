//! Coherence between an xml annotation and an argument map: annotated text
//! segments reference map nodes via `argument_label`, and annotated
//! support/attack edges mirror the map's dialectical relations.

use veridown_anno::AnnotationTree;
use veridown_argdown::{ArgdownGraph, DialecticalType, Valence};
use veridown_types::{CheckResult, Result};

use crate::handler::{evaluate_pairs, CompositeHandler, Handler};
use crate::request::{PrimaryData, VerificationRequest};

use super::{default_argdown, default_xml, is_anchored_pair, locate_pair, PairFilters};

fn oriented<'a>(
    ctx: &'a VerificationRequest,
    filters: &PairFilters,
) -> Option<(&'a PrimaryData, &'a PrimaryData)> {
    locate_pair(ctx, filters, default_argdown, default_xml)
}

fn map_node_labels(map: &ArgdownGraph) -> Vec<String> {
    map.arguments
        .iter()
        .filter_map(|a| a.label.clone())
        .chain(
            map.propositions
                .iter()
                .filter(|p| !p.auto_label)
                .map(|p| p.label.clone()),
        )
        .collect()
}

/// annotation id → map node label, for elements whose label resolves.
fn node_label_map(map: &ArgdownGraph, anno: &AnnotationTree) -> Vec<(String, String)> {
    let labels = map_node_labels(map);
    anno.propositions()
        .iter()
        .filter_map(|e| {
            let id = e.attr("id")?;
            let label = e.attr("argument_label")?;
            labels
                .iter()
                .any(|l| l == label)
                .then(|| (id.to_string(), label.to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Element coherence
// ---------------------------------------------------------------------------

/// Every annotated segment's `argument_label` names a map node, and every
/// map node is anchored in at least one annotated segment.
pub struct ArgannoArgmapElemCohereHandler {
    name: String,
    filters: PairFilters,
}

impl ArgannoArgmapElemCohereHandler {
    pub fn new(name: impl Into<String>, filters: PairFilters) -> Self {
        Self {
            name: name.into(),
            filters,
        }
    }

    fn check(map: &ArgdownGraph, anno: &AnnotationTree) -> Vec<String> {
        let labels = map_node_labels(map);
        let mut msgs = Vec::new();

        for element in anno.propositions() {
            let id = element.attr("id").unwrap_or("?");
            match element.attr("argument_label") {
                None => msgs.push(format!(
                    "Proposition element with id={id} lacks an 'argument_label' attribute."
                )),
                Some(label) if !labels.iter().any(|l| l == label) => msgs.push(format!(
                    "Illegal 'argument_label' reference of proposition element with id={id}: \
                     No node with label '{label}' in the argument map."
                )),
                Some(_) => {}
            }
        }

        let referenced = node_label_map(map, anno);
        for label in &labels {
            if !referenced.iter().any(|(_, l)| l == label) {
                msgs.push(format!(
                    "Free floating node: Node '{label}' of the argument map does not have any \
                     corresponding elements in the annotation."
                ));
            }
        }

        msgs
    }
}

impl Handler for ArgannoArgmapElemCohereHandler {
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
                let Some((map_item, anno_item)) = oriented(ctx, &filters) else {
                    return Ok(None);
                };
                let (Some(map), Some(anno)) = (map_item.argdown(), anno_item.annotation())
                else {
                    return Ok(None);
                };
                let msgs = Self::check(map, anno);
                let refs = vec![map_item.id.clone(), anno_item.id.clone()];
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

/// Annotated support/attack edges must be mirrored by map relations of the
/// same valence, and sketched map relations between annotated nodes must be
/// annotated somewhere in the text.
pub struct ArgannoArgmapRelationCohereHandler {
    name: String,
    filters: PairFilters,
}

impl ArgannoArgmapRelationCohereHandler {
    pub fn new(name: impl Into<String>, filters: PairFilters) -> Self {
        Self {
            name: name.into(),
            filters,
        }
    }

    fn check(map: &ArgdownGraph, anno: &AnnotationTree) -> Vec<String> {
        let node_map = node_label_map(map, anno);
        let label_of = |id: &str| -> Option<&str> {
            node_map
                .iter()
                .find(|(node_id, _)| node_id == id)
                .map(|(_, label)| label.as_str())
        };
        let all_ids: Vec<String> = anno
            .propositions()
            .iter()
            .filter_map(|p| p.attr("id"))
            .map(str::to_string)
            .collect();

        let mut msgs = Vec::new();
        let mut annotated: Vec<(String, String, Valence)> = Vec::new();

        for element in anno.propositions() {
            let Some(from_id) = element.attr("id") else {
                continue;
            };
            for (attr, valence) in [("supports", Valence::Support), ("attacks", Valence::Attack)]
            {
                for to_id in element.list_attr(attr) {
                    if !all_ids.contains(&to_id) {
                        continue;
                    }
                    let (Some(from_label), Some(to_label)) =
                        (label_of(from_id), label_of(&to_id))
                    else {
                        msgs.push(format!(
                            "Annotated {attr} relation {from_id} -> {to_id} cannot be matched \
                             against the argument map (illegal argument_labels)."
                        ));
                        continue;
                    };
                    if from_label == to_label {
                        continue;
                    }
                    annotated.push((from_label.to_string(), to_label.to_string(), valence));
                    let mirrored = map
                        .relations_between(from_label, to_label)
                        .iter()
                        .any(|r| r.valence == valence);
                    if !mirrored {
                        msgs.push(format!(
                            "Proposition elements {from_id} and {to_id} are annotated with a \
                             {} relation, but the argument map does not relate '{from_label}' \
                             to '{to_label}' accordingly.",
                            valence.as_str()
                        ));
                    }
                }
            }
        }

        // sketched map relations between annotated nodes must be annotated
        let annotated_labels: Vec<&str> =
            node_map.iter().map(|(_, label)| label.as_str()).collect();
        for relation in &map.dialectical_relations {
            if !relation.dialectics.contains(&DialecticalType::Sketched) {
                continue;
            }
            if relation.valence == Valence::Contradict {
                continue;
            }
            if !annotated_labels.contains(&relation.source.as_str())
                || !annotated_labels.contains(&relation.target.as_str())
            {
                continue;
            }
            let covered = annotated.iter().any(|(from, to, valence)| {
                from == &relation.source && to == &relation.target && *valence == relation.valence
            });
            if !covered {
                msgs.push(format!(
                    "Dialectical {} relation from '{}' to '{}' in the argument map is not \
                     annotated in the source text.",
                    relation.valence.as_str(),
                    relation.source,
                    relation.target
                ));
            }
        }

        msgs
    }
}

impl Handler for ArgannoArgmapRelationCohereHandler {
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
                let Some((map_item, anno_item)) = oriented(ctx, &filters) else {
                    return Ok(None);
                };
                let (Some(map), Some(anno)) = (map_item.argdown(), anno_item.annotation())
                else {
                    return Ok(None);
                };
                let msgs = Self::check(map, anno);
                let refs = vec![map_item.id.clone(), anno_item.id.clone()];
                Ok(Some(if msgs.is_empty() {
                    CheckResult::valid(&name, refs)
                } else {
                    CheckResult::invalid(&name, refs, msgs.join(" - "))
                }))
            },
        )
    }
}

/// Element plus relation coherence for annotation ↔ argument map.
pub fn arganno_argmap_coherence(filters: PairFilters) -> CompositeHandler {
    CompositeHandler::new(
        "ArgannoArgmapCoherenceHandler",
        vec![
            Box::new(ArgannoArgmapElemCohereHandler::new(
                "ArgannoArgmapElemCohereHandler",
                filters.clone(),
            )),
            Box::new(ArgannoArgmapRelationCohereHandler::new(
                "ArgannoArgmapRelationCohereHandler",
                filters,
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

    const COHERENT: &str = "```xml\n<proposition id=\"i1\" argument_label=\"A\" supports=\"i2\">Because.</proposition> <proposition id=\"i2\" argument_label=\"C\">Claim.</proposition>\n```\n```argdown\n[C]: Claim.\n  <+ <A>: Because.\n```\n";

    #[test]
    fn coherent_annotation_and_map_pass() {
        let mut request = processed(COHERENT);
        arganno_argmap_coherence(PairFilters::default()).process(&mut request);
        assert!(request.is_valid(), "results: {:#?}", request.results);
    }

    #[test]
    fn unknown_node_label_flagged() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"Z\">x</proposition>\n```\n```argdown\n[C]: Claim.\n```\n";
        let mut request = processed(inputs);
        ArgannoArgmapElemCohereHandler::new("elem", PairFilters::default())
            .process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(message.contains("No node with label 'Z'"), "got {message}");
    }

    #[test]
    fn free_floating_map_node_flagged() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"C\">x</proposition>\n```\n```argdown\n[C]: Claim.\n  <+ <A>: Unanchored.\n```\n";
        let mut request = processed(inputs);
        ArgannoArgmapElemCohereHandler::new("elem", PairFilters::default())
            .process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("Free floating node: Node 'A'"));
    }

    #[test]
    fn unmirrored_annotated_attack_flagged() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\" attacks=\"i2\">x</proposition> <proposition id=\"i2\" argument_label=\"C\">y</proposition>\n```\n```argdown\n[C]: Claim.\n  <+ <A>: Supports, not attacks.\n```\n";
        let mut request = processed(inputs);
        ArgannoArgmapRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(
            message.contains("annotated with a ATTACK relation"),
            "got {message}"
        );
    }

    #[test]
    fn unannotated_sketched_relation_flagged() {
        let inputs = "```xml\n<proposition id=\"i1\" argument_label=\"A\">x</proposition> <proposition id=\"i2\" argument_label=\"C\">y</proposition>\n```\n```argdown\n[C]: Claim.\n  <+ <A>: Because.\n```\n";
        let mut request = processed(inputs);
        ArgannoArgmapRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(
            message.contains("relation from 'A' to 'C' in the argument map is not annotated"),
            "got {message}"
        );
    }
}
