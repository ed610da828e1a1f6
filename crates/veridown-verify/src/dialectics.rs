//! Dialectical helpers shared by the coherence handlers: proposition
//! identity and contradiction, inferential use, and indirect reachability
//! through a map's relation graph.

use std::collections::BTreeSet;

use veridown_argdown::{ArgdownGraph, Argument, Proposition, Valence};

/// Two propositions are identical when they share a label or an exact text.
pub fn are_identical(a: Option<&Proposition>, b: Option<&Proposition>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };
    if a.label == b.label {
        return true;
    }
    a.texts.iter().any(|ta| b.texts.contains(ta))
}

/// Two propositions contradict when one's text is the `NOT: `-negation of
/// the other's, or the graph carries an explicit CONTRADICT relation.
pub fn are_contradictory(
    a: Option<&Proposition>,
    b: Option<&Proposition>,
    graph: &ArgdownGraph,
) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };
    let negated = |x: &Proposition, y: &Proposition| {
        x.texts.iter().any(|tx| {
            y.texts
                .iter()
                .any(|ty| tx.strip_prefix("NOT: ") == Some(ty.as_str()))
        })
    };
    if negated(a, b) || negated(b, a) {
        return true;
    }
    graph.dialectical_relations.iter().any(|r| {
        r.valence == Valence::Contradict
            && ((r.source == a.label && r.target == b.label)
                || (r.source == b.label && r.target == a.label))
    })
}

/// Labels of all steps used directly or transitively in the inference to
/// the step labeled `target`, following `from` references backwards.
pub fn props_used_in_inference(argument: &Argument, target: &str, from_key: &str) -> Vec<String> {
    let mut used: BTreeSet<String> = BTreeSet::new();
    let mut queue = vec![target.to_string()];
    while let Some(label) = queue.pop() {
        let Some(step) = argument.pcs.iter().find(|p| p.label() == label) else {
            continue;
        };
        let Some(inference_data) = step.inference_data() else {
            continue;
        };
        for reference in crate::infreco::from_refs(inference_data, from_key).unwrap_or_default() {
            if used.insert(reference.clone()) {
                queue.push(reference);
            }
        }
    }
    used.into_iter().collect()
}

/// Reachability along SUPPORT edges only.
pub fn indirectly_supports(source: &str, target: &str, graph: &ArgdownGraph) -> bool {
    reachable_with_polarity(source, target, graph, true)
}

/// Reachability where exactly the final polarity is negative: a path of
/// supports ending in one attack, in any arrangement with an odd number of
/// attacks collapsing to a net attack.
pub fn indirectly_attacks(source: &str, target: &str, graph: &ArgdownGraph) -> bool {
    reachable_with_polarity(source, target, graph, false)
}

/// Walk the relation graph tracking polarity: SUPPORT keeps it, ATTACK and
/// CONTRADICT flip it. Visited (node, polarity) pairs bound the walk, so
/// cyclic maps terminate.
fn reachable_with_polarity(
    source: &str,
    target: &str,
    graph: &ArgdownGraph,
    want_positive: bool,
) -> bool {
    let mut visited: BTreeSet<(String, bool)> = BTreeSet::new();
    let mut stack: Vec<(String, bool)> = vec![(source.to_string(), true)];

    while let Some((node, positive)) = stack.pop() {
        if node == target && node != source {
            if positive == want_positive {
                return true;
            }
        }
        if !visited.insert((node.clone(), positive)) {
            continue;
        }
        for relation in &graph.dialectical_relations {
            if relation.source != node {
                continue;
            }
            let next_positive = match relation.valence {
                Valence::Support => positive,
                Valence::Attack | Valence::Contradict => !positive,
            };
            stack.push((relation.target.clone(), next_positive));
        }
    }
    false
}
