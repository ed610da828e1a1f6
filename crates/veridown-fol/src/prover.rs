//! Entailment checking behind a pluggable `Prover` seam.
//!
//! The default implementation is a bounded model checker: quantifiers are
//! instantiated over the constants occurring in the sequent (plus one fresh
//! constant when none occur) and all interpretations of the resulting ground
//! atoms are enumerated. Exact for the quantifier-free fragment; a
//! single-constant-domain approximation otherwise.

use std::collections::BTreeSet;

use veridown_types::VerificationError;

use crate::syntax::Formula;

/// Deductive entailment interface used by the logical reconstruction checks.
pub trait Prover: Send + Sync {
    /// Does the conjunction of `premises` entail `conclusion`?
    fn entails(&self, premises: &[Formula], conclusion: &Formula) -> Result<bool, VerificationError>;

    /// Is `formula` valid (true under every interpretation)?
    fn is_valid(&self, formula: &Formula) -> Result<bool, VerificationError> {
        self.entails(&[], formula)
    }
}

/// Finite-model entailment checker.
pub struct ModelChecker {
    /// Refuse sequents whose ground atom count exceeds this bound.
    pub max_atoms: usize,
}

impl Default for ModelChecker {
    fn default() -> Self {
        Self { max_atoms: 18 }
    }
}

impl ModelChecker {
    fn domain(&self, formulas: &[&Formula]) -> Vec<String> {
        let mut constants: BTreeSet<String> = BTreeSet::new();
        for formula in formulas {
            constants.extend(formula.constants());
        }
        if constants.is_empty() {
            constants.insert("c0".to_string());
        }
        constants.into_iter().collect()
    }

    fn ground_atoms(&self, formulas: &[&Formula], domain: &[String]) -> Vec<Formula> {
        let mut predicates: BTreeSet<(String, usize)> = BTreeSet::new();
        for formula in formulas {
            predicates.extend(formula.predicates());
        }
        let mut atoms = Vec::new();
        for (pred, arity) in predicates {
            let mut tuples: Vec<Vec<String>> = vec![Vec::new()];
            for _ in 0..arity {
                tuples = tuples
                    .into_iter()
                    .flat_map(|tuple| {
                        domain.iter().map(move |value| {
                            let mut next = tuple.clone();
                            next.push(value.clone());
                            next
                        })
                    })
                    .collect();
            }
            for args in tuples {
                atoms.push(Formula::Atom {
                    pred: pred.clone(),
                    args,
                });
            }
        }
        atoms
    }

    fn eval(formula: &Formula, domain: &[String], truth: &dyn Fn(&Formula) -> bool) -> bool {
        match formula {
            Formula::Atom { .. } => truth(formula),
            Formula::Not(inner) => !Self::eval(inner, domain, truth),
            Formula::And(a, b) => {
                Self::eval(a, domain, truth) && Self::eval(b, domain, truth)
            }
            Formula::Or(a, b) => Self::eval(a, domain, truth) || Self::eval(b, domain, truth),
            Formula::Implies(a, b) => {
                !Self::eval(a, domain, truth) || Self::eval(b, domain, truth)
            }
            Formula::Iff(a, b) => Self::eval(a, domain, truth) == Self::eval(b, domain, truth),
            Formula::All(var, inner) => domain
                .iter()
                .all(|value| Self::eval(&inner.substitute(var, value), domain, truth)),
            Formula::Exists(var, inner) => domain
                .iter()
                .any(|value| Self::eval(&inner.substitute(var, value), domain, truth)),
        }
    }
}

impl Prover for ModelChecker {
    fn entails(
        &self,
        premises: &[Formula],
        conclusion: &Formula,
    ) -> Result<bool, VerificationError> {
        let mut all: Vec<&Formula> = premises.iter().collect();
        all.push(conclusion);

        let domain = self.domain(&all);
        let atoms = self.ground_atoms(&all, &domain);
        if atoms.len() > self.max_atoms {
            return Err(VerificationError::Verification(format!(
                "sequent too large for model checking: {} ground atoms (limit {})",
                atoms.len(),
                self.max_atoms
            )));
        }

        let combinations: u64 = 1 << atoms.len();
        for bits in 0..combinations {
            let truth = |atom: &Formula| -> bool {
                atoms
                    .iter()
                    .position(|a| a == atom)
                    .map(|i| bits & (1 << i) != 0)
                    .unwrap_or(false)
            };
            let premises_hold = premises
                .iter()
                .all(|p| Self::eval(p, &domain, &truth));
            if premises_hold && !Self::eval(conclusion, &domain, &truth) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn checker() -> ModelChecker {
        ModelChecker::default()
    }

    fn formulas(sources: &[&str]) -> Vec<Formula> {
        sources.iter().map(|s| parse(s).unwrap()).collect()
    }

    #[test]
    fn modus_ponens_is_valid() {
        let premises = formulas(&["p", "p -> q"]);
        let conclusion = parse("q").unwrap();
        assert!(checker().entails(&premises, &conclusion).unwrap());
    }

    #[test]
    fn affirming_the_consequent_is_invalid() {
        let premises = formulas(&["q", "p -> q"]);
        let conclusion = parse("p").unwrap();
        assert!(!checker().entails(&premises, &conclusion).unwrap());
    }

    #[test]
    fn conjunction_introduction() {
        let premises = formulas(&["p", "q"]);
        let conclusion = parse("p & q").unwrap();
        assert!(checker().entails(&premises, &conclusion).unwrap());
    }

    #[test]
    fn universal_instantiation() {
        let premises = formulas(&["all x.(F(x) -> G(x))", "F(a)"]);
        let conclusion = parse("G(a)").unwrap();
        assert!(checker().entails(&premises, &conclusion).unwrap());
    }

    #[test]
    fn universal_not_entailed_by_instance() {
        let premises = formulas(&["F(a)", "F(b)"]);
        let conclusion = parse("G(a)").unwrap();
        assert!(!checker().entails(&premises, &conclusion).unwrap());
    }

    #[test]
    fn excluded_middle_is_valid() {
        assert!(checker().is_valid(&parse("p | -p").unwrap()).unwrap());
        assert!(!checker().is_valid(&parse("p").unwrap()).unwrap());
    }

    #[test]
    fn premise_relevance_detectable() {
        // q is irrelevant: dropping it keeps the inference valid
        let all = formulas(&["p", "q", "p -> r"]);
        let conclusion = parse("r").unwrap();
        let without_q: Vec<Formula> = vec![all[0].clone(), all[2].clone()];
        assert!(checker().entails(&all, &conclusion).unwrap());
        assert!(checker().entails(&without_q, &conclusion).unwrap());
    }

    #[test]
    fn oversized_sequent_is_rejected() {
        // 3 constants, binary predicate over 5 constants would exceed the bound
        let small = ModelChecker { max_atoms: 3 };
        let premises = formulas(&["R(a,b) & R(b,c) & R(c,d)"]);
        let conclusion = parse("R(a,d)").unwrap();
        let err = small.entails(&premises, &conclusion).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
