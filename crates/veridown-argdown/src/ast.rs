//! AST for the parsed Argdown subset: propositions, arguments with
//! premise-conclusion structures, and dialectical relations.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Inline YAML-flavored data attached to statements and inference lines.
pub type DataMap = IndexMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Dialectical relations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Valence {
    Support,
    Attack,
    Contradict,
}

impl Valence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Valence::Support => "SUPPORT",
            Valence::Attack => "ATTACK",
            Valence::Contradict => "CONTRADICT",
        }
    }
}

/// Provenance of a dialectical relation: sketched in a map, grounded in a
/// premise-conclusion structure, or axiomatic between propositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialecticalType {
    Sketched,
    Grounded,
    Axiomatic,
}

/// A directed labeled edge between node labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialecticalRelation {
    pub source: String,
    pub target: String,
    pub valence: Valence,
    pub dialectics: BTreeSet<DialecticalType>,
}

// ---------------------------------------------------------------------------
// Propositions
// ---------------------------------------------------------------------------

/// A labeled statement. Statements written without an explicit `[label]`
/// receive an auto-generated one, flagged via `auto_label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposition {
    pub label: String,
    pub auto_label: bool,
    pub texts: Vec<String>,
    pub data: DataMap,
}

// ---------------------------------------------------------------------------
// Arguments and premise-conclusion structures
// ---------------------------------------------------------------------------

/// A single step of a premise-conclusion structure, e.g. `(2)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcsStatement {
    pub label: String,
    pub proposition_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PcsItem {
    Premise(PcsStatement),
    Conclusion {
        statement: PcsStatement,
        inference_data: DataMap,
    },
}

impl PcsItem {
    pub fn label(&self) -> &str {
        match self {
            PcsItem::Premise(s) => &s.label,
            PcsItem::Conclusion { statement, .. } => &statement.label,
        }
    }

    pub fn proposition_label(&self) -> &str {
        match self {
            PcsItem::Premise(s) => &s.proposition_label,
            PcsItem::Conclusion { statement, .. } => &statement.proposition_label,
        }
    }

    pub fn is_conclusion(&self) -> bool {
        matches!(self, PcsItem::Conclusion { .. })
    }

    pub fn inference_data(&self) -> Option<&DataMap> {
        match self {
            PcsItem::Premise(_) => None,
            PcsItem::Conclusion { inference_data, .. } => Some(inference_data),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub label: Option<String>,
    pub gists: Vec<String>,
    pub pcs: Vec<PcsItem>,
    pub data: DataMap,
}

// ---------------------------------------------------------------------------
// The parsed document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgdownGraph {
    pub arguments: Vec<Argument>,
    pub propositions: Vec<Proposition>,
    pub dialectical_relations: Vec<DialecticalRelation>,
}

impl ArgdownGraph {
    pub fn get_argument(&self, label: &str) -> Option<&Argument> {
        self.arguments
            .iter()
            .find(|a| a.label.as_deref() == Some(label))
    }

    pub fn get_proposition(&self, label: &str) -> Option<&Proposition> {
        self.propositions.iter().find(|p| p.label == label)
    }

    /// All relations from `source` to `target`, any valence.
    pub fn relations_between(&self, source: &str, target: &str) -> Vec<&DialecticalRelation> {
        self.dialectical_relations
            .iter()
            .filter(|r| r.source == source && r.target == target)
            .collect()
    }

    /// Count of distinct map nodes (labeled propositions plus arguments).
    pub fn node_count(&self) -> usize {
        let labeled_props = self.propositions.iter().filter(|p| !p.auto_label).count();
        labeled_props + self.arguments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcs_item_accessors() {
        let premise = PcsItem::Premise(PcsStatement {
            label: "1".into(),
            proposition_label: "P1".into(),
        });
        assert_eq!(premise.label(), "1");
        assert!(!premise.is_conclusion());
        assert!(premise.inference_data().is_none());

        let mut inf = DataMap::new();
        inf.insert("from".into(), serde_json::json!(["1"]));
        let conclusion = PcsItem::Conclusion {
            statement: PcsStatement {
                label: "2".into(),
                proposition_label: "P2".into(),
            },
            inference_data: inf,
        };
        assert!(conclusion.is_conclusion());
        assert_eq!(
            conclusion.inference_data().unwrap()["from"],
            serde_json::json!(["1"])
        );
    }

    #[test]
    fn graph_lookups() {
        let graph = ArgdownGraph {
            arguments: vec![Argument {
                label: Some("A".into()),
                ..Default::default()
            }],
            propositions: vec![Proposition {
                label: "C".into(),
                auto_label: false,
                texts: vec!["Claim.".into()],
                data: DataMap::new(),
            }],
            dialectical_relations: vec![DialecticalRelation {
                source: "A".into(),
                target: "C".into(),
                valence: Valence::Support,
                dialectics: [DialecticalType::Sketched].into(),
            }],
        };
        assert!(graph.get_argument("A").is_some());
        assert!(graph.get_argument("B").is_none());
        assert!(graph.get_proposition("C").is_some());
        assert_eq!(graph.relations_between("A", "C").len(), 1);
        assert!(graph.relations_between("C", "A").is_empty());
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn valence_names() {
        assert_eq!(Valence::Support.as_str(), "SUPPORT");
        assert_eq!(Valence::Attack.as_str(), "ATTACK");
        assert_eq!(Valence::Contradict.as_str(), "CONTRADICT");
    }
}
