//! Coherence between an argument map and an informal reconstruction: the
//! same labels on both sides, and every sketched edge grounded in the
//! premise-conclusion structures.

use veridown_argdown::{ArgdownGraph, DialecticalType, PcsItem, Valence};
use veridown_types::{CheckResult, Result};

use crate::dialectics::{are_contradictory, are_identical};
use crate::handler::{evaluate_pairs, CompositeHandler, Handler};
use crate::request::{PrimaryData, VerificationRequest};

use super::{default_map, default_reco, is_anchored_pair, locate_pair, PairFilters};

fn oriented<'a>(
    ctx: &'a VerificationRequest,
    filters: &PairFilters,
) -> Option<(&'a PrimaryData, &'a PrimaryData)> {
    locate_pair(ctx, filters, default_map, default_reco)
}

fn unique_labels<I: IntoIterator<Item = Option<String>>>(labels: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels.into_iter().flatten() {
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

pub(super) fn elem_messages(map: &ArgdownGraph, reco: &ArgdownGraph) -> Vec<String> {
    let map_labels = unique_labels(map.arguments.iter().map(|a| a.label.clone()));
    let reco_labels = unique_labels(reco.arguments.iter().map(|a| a.label.clone()));
    let map_prop_labels = unique_labels(
        map.propositions
            .iter()
            .filter(|p| !p.auto_label)
            .map(|p| Some(p.label.clone())),
    );
    let reco_prop_labels = unique_labels(
        reco.propositions
            .iter()
            .map(|p| Some(p.label.clone())),
    );

    let mut msgs = Vec::new();
    for label in &map_labels {
        if !reco_labels.contains(label) {
            msgs.push(format!(
                "Argument <{label}> in map is not reconstructed (argument label mismatch)."
            ));
        }
    }
    for label in &reco_labels {
        if !map_labels.contains(label) {
            msgs.push(format!(
                "Reconstructed argument <{label}> is not in the map (argument label mismatch)."
            ));
        }
    }
    for label in &map_prop_labels {
        if !reco_prop_labels.contains(label) {
            msgs.push(format!(
                "Claim [{label}] in argument map has no corresponding proposition in \
                 reconstructions (proposition label mismatch)."
            ));
        }
    }
    msgs
}

// ---------------------------------------------------------------------------
// Element coherence
// ---------------------------------------------------------------------------

/// Map and reconstruction use the same argument labels, and every map claim
/// reappears as a proposition of the reconstruction.
pub struct ArgmapInfrecoElemCohereHandler {
    name: String,
    filters: PairFilters,
}

impl ArgmapInfrecoElemCohereHandler {
    pub fn new(name: impl Into<String>, filters: PairFilters) -> Self {
        Self {
            name: name.into(),
            filters,
        }
    }
}

impl Handler for ArgmapInfrecoElemCohereHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let filters = self.filters.clone();
        evaluate_pairs(
            request,
            |a, b, ctx| is_anchored_pair(a, b, ctx, &filters, default_map, default_reco),
            |_a, _b, ctx| {
                let Some((map_item, reco_item)) = oriented(ctx, &filters) else {
                    return Ok(None);
                };
                let (Some(map), Some(reco)) = (map_item.argdown(), reco_item.argdown()) else {
                    return Ok(None);
                };
                let msgs = elem_messages(map, reco);
                let refs = vec![map_item.id.clone(), reco_item.id.clone()];
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

/// Every sketched dialectical edge of the map must be grounded in the
/// reconstruction: supports via conclusion/premise identity, attacks via
/// contradiction.
pub struct ArgmapInfrecoRelationCohereHandler {
    name: String,
    filters: PairFilters,
}

impl ArgmapInfrecoRelationCohereHandler {
    pub fn new(name: impl Into<String>, filters: PairFilters) -> Self {
        Self {
            name: name.into(),
            filters,
        }
    }

    fn check(map: &ArgdownGraph, reco: &ArgdownGraph) -> Vec<String> {
        let mut msgs = Vec::new();

        for relation in &map.dialectical_relations {
            if !relation.dialectics.contains(&DialecticalType::Sketched) {
                continue;
            }
            let source_is_argument = map
                .arguments
                .iter()
                .any(|a| a.label.as_deref() == Some(relation.source.as_str()));
            let target_is_argument = map
                .arguments
                .iter()
                .any(|a| a.label.as_deref() == Some(relation.target.as_str()));

            match (source_is_argument, target_is_argument) {
                (true, true) => {
                    let (Some(source), Some(target)) = (
                        reco.get_argument(&relation.source),
                        reco.get_argument(&relation.target),
                    ) else {
                        continue;
                    };
                    let Some(conclusion) = source
                        .pcs
                        .last()
                        .map(PcsItem::proposition_label)
                        .and_then(|l| reco.get_proposition(l))
                    else {
                        continue;
                    };
                    if target.pcs.is_empty() {
                        continue;
                    }
                    let premises = target
                        .pcs
                        .iter()
                        .filter(|p| !p.is_conclusion())
                        .filter_map(|p| reco.get_proposition(p.proposition_label()));
                    match relation.valence {
                        Valence::Support => {
                            let grounded = premises
                                .into_iter()
                                .any(|p| are_identical(Some(p), Some(conclusion)));
                            if !grounded {
                                msgs.push(format!(
                                    "Sketched support relation from <{}> to <{}> in argument map \
                                     is not grounded in the argument reconstruction, conclusion \
                                     of <{}> does not figure as premise in <{}>.",
                                    relation.source, relation.target, relation.source, relation.target
                                ));
                            }
                        }
                        Valence::Attack => {
                            let grounded = premises
                                .into_iter()
                                .any(|p| are_contradictory(Some(p), Some(conclusion), reco));
                            if !grounded {
                                msgs.push(format!(
                                    "Sketched attack relation from <{}> to <{}> in argument map \
                                     is not grounded in the argument reconstruction, conclusion \
                                     of <{}> does not contradict any premise in <{}>.",
                                    relation.source, relation.target, relation.source, relation.target
                                ));
                            }
                        }
                        Valence::Contradict => {}
                    }
                }
                (false, true) => {
                    let Some(source) = reco.get_proposition(&relation.source) else {
                        continue;
                    };
                    let Some(target) = reco.get_argument(&relation.target) else {
                        continue;
                    };
                    if target.pcs.is_empty() {
                        continue;
                    }
                    let premises = target
                        .pcs
                        .iter()
                        .filter(|p| !p.is_conclusion())
                        .filter_map(|p| reco.get_proposition(p.proposition_label()));
                    match relation.valence {
                        Valence::Support => {
                            if !premises
                                .into_iter()
                                .any(|p| are_identical(Some(p), Some(source)))
                            {
                                msgs.push(format!(
                                    "Sketched support relation from [{}] to <{}> in argument map \
                                     is not grounded in the argument reconstruction, proposition \
                                     [{}] does not figure as premise in <{}>.",
                                    relation.source, relation.target, relation.source, relation.target
                                ));
                            }
                        }
                        Valence::Attack => {
                            if !premises
                                .into_iter()
                                .any(|p| are_contradictory(Some(p), Some(source), reco))
                            {
                                msgs.push(format!(
                                    "Sketched attack relation from [{}] to <{}> in argument map \
                                     is not grounded in the argument reconstruction, proposition \
                                     [{}] does not contradict any premise in <{}>.",
                                    relation.source, relation.target, relation.source, relation.target
                                ));
                            }
                        }
                        Valence::Contradict => {}
                    }
                }
                (true, false) => {
                    let Some(source) = reco.get_argument(&relation.source) else {
                        continue;
                    };
                    let Some(target) = reco.get_proposition(&relation.target) else {
                        continue;
                    };
                    let Some(conclusion) = source
                        .pcs
                        .last()
                        .map(PcsItem::proposition_label)
                        .and_then(|l| reco.get_proposition(l))
                    else {
                        continue;
                    };
                    match relation.valence {
                        Valence::Support => {
                            if !are_identical(Some(conclusion), Some(target)) {
                                msgs.push(format!(
                                    "Sketched support relation from <{}> to [{}] in argument map \
                                     is not grounded in the argument reconstruction, proposition \
                                     [{}] does not figure as conclusion in <{}>.",
                                    relation.source, relation.target, relation.target, relation.source
                                ));
                            }
                        }
                        Valence::Attack => {
                            if !are_contradictory(Some(conclusion), Some(target), reco) {
                                msgs.push(format!(
                                    "Sketched attack relation from <{}> to [{}] in argument map \
                                     is not grounded in the argument reconstruction, proposition \
                                     [{}] does not contradict the conclusion of <{}>.",
                                    relation.source, relation.target, relation.target, relation.source
                                ));
                            }
                        }
                        Valence::Contradict => {}
                    }
                }
                (false, false) => {}
            }
        }

        msgs
    }
}

impl Handler for ArgmapInfrecoRelationCohereHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let filters = self.filters.clone();
        evaluate_pairs(
            request,
            |a, b, ctx| is_anchored_pair(a, b, ctx, &filters, default_map, default_reco),
            |_a, _b, ctx| {
                let Some((map_item, reco_item)) = oriented(ctx, &filters) else {
                    return Ok(None);
                };
                let (Some(map), Some(reco)) = (map_item.argdown(), reco_item.argdown()) else {
                    return Ok(None);
                };
                let msgs = Self::check(map, reco);
                let refs = vec![map_item.id.clone(), reco_item.id.clone()];
                Ok(Some(if msgs.is_empty() {
                    CheckResult::valid(&name, refs)
                } else {
                    CheckResult::invalid(&name, refs, msgs.join(" - "))
                }))
            },
        )
    }
}

/// Element plus relation coherence for map ↔ informal reconstruction.
pub fn argmap_infreco_coherence(filters: PairFilters) -> CompositeHandler {
    CompositeHandler::new(
        "ArgmapInfrecoCoherenceHandler",
        vec![
            Box::new(ArgmapInfrecoElemCohereHandler::new(
                "ArgmapInfrecoElemCohereHandler",
                filters.clone(),
            )),
            Box::new(ArgmapInfrecoRelationCohereHandler::new(
                "ArgmapInfrecoRelationCohereHandler",
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

    fn two_blocks(map: &str, reco: &str) -> String {
        format!(
            "```argdown {{filename=\"map.ad\"}}\n{map}\n```\n```argdown {{filename=\"reconstructions.ad\"}}\n{reco}\n```\n"
        )
    }

    #[test]
    fn matching_labels_pass() {
        let inputs = two_blocks(
            "[C]: Claim.\n  <+ <A>: Because.",
            "<A>: Because.\n\n(1) Reason. {annotation_ids: []}\n-- {from: ['1']} --\n(2) [C]: Claim.",
        );
        let mut request = processed(&inputs);
        ArgmapInfrecoElemCohereHandler::new("elem", PairFilters::default())
            .process(&mut request);
        assert!(request.results[0].is_valid, "{:#?}", request.results);
    }

    #[test]
    fn label_mismatches_flagged_both_ways() {
        let inputs = two_blocks("[C]: Claim.\n  <+ <A>: Because.", "<B>\n(1) X.\n-- {from: ['1']} --\n(2) Y.");
        let mut request = processed(&inputs);
        ArgmapInfrecoElemCohereHandler::new("elem", PairFilters::default())
            .process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(message.contains("Argument <A> in map is not reconstructed"));
        assert!(message.contains("Reconstructed argument <B> is not in the map"));
        assert!(message.contains("Claim [C] in argument map has no corresponding proposition"));
    }

    #[test]
    fn grounded_support_passes_relation_check() {
        let inputs = two_blocks(
            "[C]: Claim.\n  <+ <A>: Because.",
            "<A>: Because.\n\n(1) Reason.\n-- {from: ['1']} --\n(2) [C]: Claim.",
        );
        let mut request = processed(&inputs);
        ArgmapInfrecoRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        assert!(request.results[0].is_valid, "{:#?}", request.results);
    }

    #[test]
    fn ungrounded_argument_support_flagged() {
        let inputs = two_blocks(
            "<B>: Target.\n  <+ <A>: Because.",
            "<A>: Because.\n\n(1) One.\n-- {from: ['1']} --\n(2) Link.\n\n<B>: Target.\n\n(1) Unrelated.\n-- {from: ['1']} --\n(2) Out.",
        );
        let mut request = processed(&inputs);
        ArgmapInfrecoRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(
            message.contains("conclusion of <A> does not figure as premise in <B>"),
            "got: {message}"
        );
    }

    #[test]
    fn grounded_attack_via_negation_passes() {
        let inputs = two_blocks(
            "<B>: Target.\n  <- <A>: Objection.",
            "<A>: Objection.\n\n(1) One.\n-- {from: ['1']} --\n(2) NOT: Link.\n\n<B>: Target.\n\n(1) Link.\n-- {from: ['1']} --\n(2) Out.",
        );
        let mut request = processed(&inputs);
        ArgmapInfrecoRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        assert!(request.results[0].is_valid, "{:#?}", request.results);
    }

    #[test]
    fn claim_to_argument_support_requires_premise() {
        let inputs = two_blocks(
            "[C]: Premise claim.\n  +> <A>: Uses it.",
            "[C]: Premise claim.\n\n<A>: Uses it.\n\n(1) Something else.\n-- {from: ['1']} --\n(2) Out.",
        );
        let mut request = processed(&inputs);
        ArgmapInfrecoRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(
            message.contains("proposition [C] does not figure as premise in <A>"),
            "got: {message}"
        );
    }

    #[test]
    fn composite_runs_both_handlers() {
        let inputs = two_blocks(
            "[C]: Claim.\n  <+ <A>: Because.",
            "<A>: Because.\n\n(1) Reason.\n-- {from: ['1']} --\n(2) [C]: Claim.",
        );
        let mut request = processed(&inputs);
        argmap_infreco_coherence(PairFilters::default()).process(&mut request);
        assert_eq!(
            request.executed_handlers,
            vec![
                "ArgmapInfrecoCoherenceHandler".to_string(),
                "ArgmapInfrecoElemCohereHandler".to_string(),
                "ArgmapInfrecoRelationCohereHandler".to_string(),
            ]
        );
        assert!(request.is_valid(), "{:#?}", request.results);
    }
}
