//! Coherence between an argument map and a logical reconstruction. On top
//! of label identity, every sketched map edge must be matched by a grounded
//! relation of the reconstruction, and every grounded relation must be
//! captured by the map at least indirectly.

use veridown_argdown::{ArgdownGraph, DialecticalType, Valence};
use veridown_types::{CheckResult, Result};

use crate::dialectics::{indirectly_attacks, indirectly_supports};
use crate::handler::{evaluate_pairs, CompositeHandler, Handler};
use crate::request::{PrimaryData, VerificationRequest};

use super::argmap_infreco::elem_messages;
use super::{default_map, default_reco, is_anchored_pair, locate_pair, PairFilters};

fn oriented<'a>(
    ctx: &'a VerificationRequest,
    filters: &PairFilters,
) -> Option<(&'a PrimaryData, &'a PrimaryData)> {
    locate_pair(ctx, filters, default_map, default_reco)
}

// ---------------------------------------------------------------------------
// Element coherence
// ---------------------------------------------------------------------------

/// Same label identity rules as for informal reconstructions.
pub struct ArgmapLogrecoElemCohereHandler {
    name: String,
    filters: PairFilters,
}

impl ArgmapLogrecoElemCohereHandler {
    pub fn new(name: impl Into<String>, filters: PairFilters) -> Self {
        Self {
            name: name.into(),
            filters,
        }
    }
}

impl Handler for ArgmapLogrecoElemCohereHandler {
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

/// Sketched map edges must be matched by grounded reconstruction relations
/// of the same valence; grounded reconstruction relations must be captured
/// by the map, where reachability through same-valence edges counts as
/// indirect support and an odd number of attacks as indirect attack.
pub struct ArgmapLogrecoRelationCohereHandler {
    name: String,
    filters: PairFilters,
}

impl ArgmapLogrecoRelationCohereHandler {
    pub fn new(name: impl Into<String>, filters: PairFilters) -> Self {
        Self {
            name: name.into(),
            filters,
        }
    }

    fn check(map: &ArgdownGraph, reco: &ArgdownGraph) -> Vec<String> {
        let mut msgs = Vec::new();

        let reco_labels: Vec<&str> = reco
            .arguments
            .iter()
            .filter_map(|a| a.label.as_deref())
            .chain(reco.propositions.iter().map(|p| p.label.as_str()))
            .collect();
        let map_labels: Vec<&str> = map
            .arguments
            .iter()
            .filter_map(|a| a.label.as_deref())
            .chain(map.propositions.iter().map(|p| p.label.as_str()))
            .collect();

        for relation in &map.dialectical_relations {
            if !relation.dialectics.contains(&DialecticalType::Sketched) {
                continue;
            }
            if !reco_labels.contains(&relation.source.as_str())
                || !reco_labels.contains(&relation.target.as_str())
            {
                continue;
            }
            let matches = reco.relations_between(&relation.source, &relation.target);
            if matches.iter().any(|m| {
                m.valence == relation.valence && m.dialectics.contains(&DialecticalType::Grounded)
            }) {
                continue;
            }
            if !matches.iter().any(|m| m.valence == relation.valence) {
                msgs.push(format!(
                    "Dialectical {} relation from node '{}' to node '{}' in argument map is not \
                     matched by any relation in the argument reconstruction.",
                    relation.valence.as_str(),
                    relation.source,
                    relation.target
                ));
                continue;
            }
            msgs.push(format!(
                "Dialectical {} relation from node '{}' to node '{}' in argument map is not \
                 grounded in logical argument reconstructions.",
                relation.valence.as_str(),
                relation.source,
                relation.target
            ));
        }

        for relation in &reco.dialectical_relations {
            if !relation.dialectics.contains(&DialecticalType::Grounded) {
                continue;
            }
            if !map_labels.contains(&relation.source.as_str())
                || !map_labels.contains(&relation.target.as_str())
            {
                continue;
            }
            match relation.valence {
                Valence::Support => {
                    if !indirectly_supports(&relation.source, &relation.target, map) {
                        msgs.push(format!(
                            "According to the argument reconstructions, item '{}' supports item \
                             '{}', but this dialectical relation is not captured in the argument map.",
                            relation.source, relation.target
                        ));
                    }
                }
                Valence::Attack => {
                    if !indirectly_attacks(&relation.source, &relation.target, map) {
                        msgs.push(format!(
                            "According to the argument reconstructions, item '{}' attacks item \
                             '{}', but this dialectical relation is not captured in the argument map.",
                            relation.source, relation.target
                        ));
                    }
                }
                Valence::Contradict => {}
            }
        }

        msgs
    }
}

impl Handler for ArgmapLogrecoRelationCohereHandler {
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

/// Element plus relation coherence for map ↔ logical reconstruction.
pub fn argmap_logreco_coherence(filters: PairFilters) -> CompositeHandler {
    CompositeHandler::new(
        "ArgmapLogrecoCoherenceHandler",
        vec![
            Box::new(ArgmapLogrecoElemCohereHandler::new(
                "ArgmapLogrecoElemCohereHandler",
                filters.clone(),
            )),
            Box::new(ArgmapLogrecoRelationCohereHandler::new(
                "ArgmapLogrecoRelationCohereHandler",
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

    const GROUNDED_RECO: &str = "<A>: Because.\n\n(1) One.\n-- {from: ['1']} --\n(2) Link.\n\n<B>: Target.\n\n(1) Link.\n-- {from: ['1']} --\n(2) [C]: Out.";

    #[test]
    fn sketched_edge_matched_by_grounded_relation_passes() {
        let inputs = two_blocks("[C]: Out.\n  <+ <B>: Target.\n    <+ <A>: Because.", GROUNDED_RECO);
        let mut request = processed(&inputs);
        ArgmapLogrecoRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        assert!(request.results[0].is_valid, "{:#?}", request.results);
    }

    #[test]
    fn unmatched_sketched_edge_flagged() {
        let inputs = two_blocks(
            "[C]: Out.\n  <+ <B>: Target.\n  <+ <A>: Because.",
            "<A>: Because.\n\n(1) One.\n-- {from: ['1']} --\n(2) Unrelated.\n\n<B>: Target.\n\n(1) Link.\n-- {from: ['1']} --\n(2) [C]: Out.",
        );
        let mut request = processed(&inputs);
        ArgmapLogrecoRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(
            message.contains("SUPPORT relation from node 'A' to node 'C'"),
            "got: {message}"
        );
        assert!(message.contains("not matched by any relation"));
    }

    #[test]
    fn grounded_relation_missing_from_map_flagged() {
        // reco grounds A -> B, but the map only relates B -> C
        let inputs = two_blocks("[C]: Out.\n  <+ <B>: Target.\n\n<A>: Because.", GROUNDED_RECO);
        let mut request = processed(&inputs);
        ArgmapLogrecoRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(
            message.contains("item 'A' supports item 'B', but this dialectical relation is not captured"),
            "got: {message}"
        );
    }

    #[test]
    fn indirect_support_through_map_chain_accepted() {
        // reco grounds A -> C (conclusion identity); map routes A -> B -> C
        let inputs = two_blocks(
            "[C]: Out.\n  <+ <B>: Target.\n    <+ <A>: Because.",
            GROUNDED_RECO,
        );
        let mut request = processed(&inputs);
        ArgmapLogrecoRelationCohereHandler::new("rel", PairFilters::default())
            .process(&mut request);
        assert!(request.results[0].is_valid, "{:#?}", request.results);
    }

    #[test]
    fn elem_handler_reuses_label_rules() {
        let inputs = two_blocks("[C]: Out.\n  <+ <A>: Because.", "<A>\n(1) X.\n-- {from: ['1']} --\n(2) [C]: Out.");
        let mut request = processed(&inputs);
        argmap_logreco_coherence(PairFilters::default()).process(&mut request);
        assert!(request.is_valid(), "{:#?}", request.results);
    }
}
