//! First-order formula AST and symbol queries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A first-order formula over predicates applied to identifier terms.
/// Atoms with no arguments act as propositional variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formula {
    Atom { pred: String, args: Vec<String> },
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    All(String, Box<Formula>),
    Exists(String, Box<Formula>),
}

impl Formula {
    pub fn atom(pred: impl Into<String>) -> Self {
        Formula::Atom {
            pred: pred.into(),
            args: Vec::new(),
        }
    }

    pub fn not(inner: Formula) -> Self {
        Formula::Not(Box::new(inner))
    }

    /// All predicate symbols with their arities.
    pub fn predicates(&self) -> BTreeSet<(String, usize)> {
        let mut out = BTreeSet::new();
        self.walk(&mut |f| {
            if let Formula::Atom { pred, args } = f {
                out.insert((pred.clone(), args.len()));
            }
        });
        out
    }

    /// Zero-arity atoms (propositional variables).
    pub fn propositional_variables(&self) -> BTreeSet<String> {
        self.predicates()
            .into_iter()
            .filter(|(_, arity)| *arity == 0)
            .map(|(name, _)| name)
            .collect()
    }

    /// Identifiers appearing as arguments without a binding quantifier.
    pub fn constants(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_constants(&mut Vec::new(), &mut out);
        out
    }

    fn collect_constants(&self, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
        match self {
            Formula::Atom { args, .. } => {
                for arg in args {
                    if !bound.contains(arg) {
                        out.insert(arg.clone());
                    }
                }
            }
            Formula::Not(inner) => inner.collect_constants(bound, out),
            Formula::And(a, b)
            | Formula::Or(a, b)
            | Formula::Implies(a, b)
            | Formula::Iff(a, b) => {
                a.collect_constants(bound, out);
                b.collect_constants(bound, out);
            }
            Formula::All(var, inner) | Formula::Exists(var, inner) => {
                bound.push(var.clone());
                inner.collect_constants(bound, out);
                bound.pop();
            }
        }
    }

    /// All symbols a declarations map may cover: predicates, propositional
    /// variables, and constants.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> =
            self.predicates().into_iter().map(|(name, _)| name).collect();
        out.extend(self.constants());
        out
    }

    /// Flatten a conjunction tree into its conjuncts.
    pub fn conjuncts(&self) -> Vec<&Formula> {
        match self {
            Formula::And(a, b) => {
                let mut out = a.conjuncts();
                out.extend(b.conjuncts());
                out
            }
            other => vec![other],
        }
    }

    fn walk(&self, visit: &mut impl FnMut(&Formula)) {
        visit(self);
        match self {
            Formula::Atom { .. } => {}
            Formula::Not(inner) | Formula::All(_, inner) | Formula::Exists(_, inner) => {
                inner.walk(visit)
            }
            Formula::And(a, b)
            | Formula::Or(a, b)
            | Formula::Implies(a, b)
            | Formula::Iff(a, b) => {
                a.walk(visit);
                b.walk(visit);
            }
        }
    }

    /// Substitute a variable by a constant (used by quantifier expansion).
    pub(crate) fn substitute(&self, var: &str, value: &str) -> Formula {
        match self {
            Formula::Atom { pred, args } => Formula::Atom {
                pred: pred.clone(),
                args: args
                    .iter()
                    .map(|a| if a == var { value.to_string() } else { a.clone() })
                    .collect(),
            },
            Formula::Not(inner) => Formula::not(inner.substitute(var, value)),
            Formula::And(a, b) => Formula::And(
                Box::new(a.substitute(var, value)),
                Box::new(b.substitute(var, value)),
            ),
            Formula::Or(a, b) => Formula::Or(
                Box::new(a.substitute(var, value)),
                Box::new(b.substitute(var, value)),
            ),
            Formula::Implies(a, b) => Formula::Implies(
                Box::new(a.substitute(var, value)),
                Box::new(b.substitute(var, value)),
            ),
            Formula::Iff(a, b) => Formula::Iff(
                Box::new(a.substitute(var, value)),
                Box::new(b.substitute(var, value)),
            ),
            Formula::All(v, inner) if v != var => {
                Formula::All(v.clone(), Box::new(inner.substitute(var, value)))
            }
            Formula::Exists(v, inner) if v != var => {
                Formula::Exists(v.clone(), Box::new(inner.substitute(var, value)))
            }
            shadowed => shadowed.clone(),
        }
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Formula::Atom { pred, args } => {
                if args.is_empty() {
                    write!(f, "{pred}")
                } else {
                    write!(f, "{pred}({})", args.join(","))
                }
            }
            Formula::Not(inner) => write!(f, "-{inner}"),
            Formula::And(a, b) => write!(f, "({a} & {b})"),
            Formula::Or(a, b) => write!(f, "({a} | {b})"),
            Formula::Implies(a, b) => write!(f, "({a} -> {b})"),
            Formula::Iff(a, b) => write!(f, "({a} <-> {b})"),
            Formula::All(var, inner) => write!(f, "all {var}.{inner}"),
            Formula::Exists(var, inner) => write!(f, "exists {var}.{inner}"),
        }
    }
}

/// Render a formula as a rough natural-language sentence, resolving symbols
/// through a declarations map where possible.
pub fn render_nl(formula: &Formula, declarations: &dyn Fn(&str) -> Option<String>) -> String {
    match formula {
        Formula::Atom { pred, args } => {
            let meaning = declarations(pred).unwrap_or_else(|| pred.clone());
            if args.is_empty() {
                meaning
            } else {
                let rendered: Vec<String> = args
                    .iter()
                    .map(|a| declarations(a).unwrap_or_else(|| a.clone()))
                    .collect();
                format!("{} applies to {}", meaning, rendered.join(" and "))
            }
        }
        Formula::Not(inner) => format!("it is not the case that {}", render_nl(inner, declarations)),
        Formula::And(a, b) => format!(
            "{} and {}",
            render_nl(a, declarations),
            render_nl(b, declarations)
        ),
        Formula::Or(a, b) => format!(
            "{} or {}",
            render_nl(a, declarations),
            render_nl(b, declarations)
        ),
        Formula::Implies(a, b) => format!(
            "if {} then {}",
            render_nl(a, declarations),
            render_nl(b, declarations)
        ),
        Formula::Iff(a, b) => format!(
            "{} if and only if {}",
            render_nl(a, declarations),
            render_nl(b, declarations)
        ),
        Formula::All(var, inner) => {
            format!("for every {var}, {}", render_nl(inner, declarations))
        }
        Formula::Exists(var, inner) => {
            format!("there is some {var} such that {}", render_nl(inner, declarations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn symbol_queries() {
        let f = parse("all x.(F(x) -> G(x,a))").unwrap();
        assert_eq!(
            f.predicates(),
            BTreeSet::from([("F".to_string(), 1), ("G".to_string(), 2)])
        );
        assert_eq!(f.constants(), BTreeSet::from(["a".to_string()]));
        assert!(f.propositional_variables().is_empty());
    }

    #[test]
    fn propositional_variables_detected() {
        let f = parse("p & (q -> r)").unwrap();
        assert_eq!(
            f.propositional_variables(),
            BTreeSet::from(["p".to_string(), "q".to_string(), "r".to_string()])
        );
    }

    #[test]
    fn conjuncts_flatten() {
        let f = parse("p & q & r").unwrap();
        let parts: Vec<String> = f.conjuncts().iter().map(|c| c.to_string()).collect();
        assert_eq!(parts, vec!["p", "q", "r"]);
    }

    #[test]
    fn display_round_trips_through_parser() {
        let f = parse("all x.(F(x) -> -G(x))").unwrap();
        let reparsed = parse(&f.to_string()).unwrap();
        assert_eq!(f, reparsed);
    }

    #[test]
    fn substitution_respects_shadowing() {
        let f = parse("F(x) & all x.G(x)").unwrap();
        let sub = f.substitute("x", "a");
        assert_eq!(sub.to_string(), "(F(a) & all x.G(x))");
    }

    #[test]
    fn render_nl_uses_declarations() {
        let f = parse("p -> q").unwrap();
        let decls = |s: &str| match s {
            "p" => Some("it rains".to_string()),
            "q" => Some("the street is wet".to_string()),
            _ => None,
        };
        assert_eq!(render_nl(&f, &decls), "if it rains then the street is wet");
    }
}
