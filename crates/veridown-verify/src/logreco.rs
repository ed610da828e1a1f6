//! Logical reconstruction checks (the logreco family).
//!
//! Builds on the infreco invariants; these handlers additionally parse each
//! proposition's `formalization` and `declarations`, check declaration
//! consistency, and delegate deductive validity and premise relevance to a
//! [`Prover`].

use std::collections::BTreeMap;
use std::sync::Arc;

use veridown_argdown::{ArgdownGraph, Argument};
use veridown_fol::{Formula, ModelChecker, Prover};
use veridown_types::{CheckResult, Dtype, Result};

use crate::handler::{evaluate_items, CompositeHandler, Handler, ItemFilter};
use crate::infreco::from_refs;
use crate::request::VerificationRequest;

fn arg_label(argument: &Argument) -> String {
    match &argument.label {
        Some(label) => format!("<{label}>"),
        None => "<unlabeled argument>".to_string(),
    }
}

/// Parsed formalizations of one snippet: proposition label → formula, plus
/// the merged symbol declarations.
#[derive(Debug, Default, Clone)]
pub struct Formalizations {
    pub expressions: BTreeMap<String, Formula>,
    pub declarations: BTreeMap<String, String>,
}

/// Collect and parse the formalizations of every proposition used in an
/// argument's premise-conclusion structure. Problems are reported as
/// messages; parsable material is still collected.
fn collect_formalizations(
    graph: &ArgdownGraph,
    formalization_key: &str,
    declarations_key: &str,
) -> (Formalizations, Vec<String>) {
    let mut out = Formalizations::default();
    let mut msgs = Vec::new();

    for argument in &graph.arguments {
        let label = arg_label(argument);
        for step in &argument.pcs {
            let prop_label = step.proposition_label();
            let Some(proposition) = graph.get_proposition(prop_label) else {
                continue;
            };
            if out.expressions.contains_key(prop_label) {
                continue;
            }

            match proposition.data.get(formalization_key) {
                None => msgs.push(format!(
                    "In {label}: Proposition ({}) lacks a '{formalization_key}' entry.",
                    step.label()
                )),
                Some(raw) => {
                    let source = match raw {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    match veridown_fol::parse(&source) {
                        Ok(formula) => {
                            out.expressions.insert(prop_label.to_string(), formula);
                        }
                        Err(error) => msgs.push(format!(
                            "In {label}: Formalization of ({}) is not well-formed: {error}",
                            step.label()
                        )),
                    }
                }
            }

            if let Some(serde_json::Value::Object(declarations)) =
                proposition.data.get(declarations_key)
            {
                for (symbol, meaning) in declarations {
                    let meaning = match meaning {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    match out.declarations.get(symbol) {
                        Some(existing) if existing != &meaning => msgs.push(format!(
                            "Duplicate declaration of symbol '{symbol}': '{existing}' vs '{meaning}'."
                        )),
                        _ => {
                            out.declarations.insert(symbol.clone(), meaning);
                        }
                    }
                }
            }
        }
    }

    // every symbol used in a formalization must be declared
    for (prop_label, formula) in &out.expressions {
        for symbol in formula.symbols() {
            if !out.declarations.contains_key(&symbol) {
                msgs.push(format!(
                    "Missing declaration for symbol '{symbol}' used in the formalization of [{prop_label}]."
                ));
            }
        }
    }

    (out, msgs)
}

// ---------------------------------------------------------------------------
// WellFormedFormulasHandler
// ---------------------------------------------------------------------------

/// Parses all formalizations and declarations; stores the aggregated
/// expression and declaration maps as result details and request artifacts.
pub struct WellFormedFormulasHandler {
    name: String,
    filter: Option<ItemFilter>,
    formalization_key: String,
    declarations_key: String,
}

impl WellFormedFormulasHandler {
    pub fn new(
        name: impl Into<String>,
        filter: Option<ItemFilter>,
        formalization_key: impl Into<String>,
        declarations_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            formalization_key: formalization_key.into(),
            declarations_key: declarations_key.into(),
        }
    }
}

impl Handler for WellFormedFormulasHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let mut artifacts: Option<(serde_json::Value, serde_json::Value)> = None;

        let formalization_key = self.formalization_key.clone();
        let declarations_key = self.declarations_key.clone();
        let artifacts_slot = std::cell::RefCell::new(&mut artifacts);

        evaluate_items(request, Dtype::Argdown, self.filter.as_ref(), |item, _ctx| {
            let Some(graph) = item.argdown() else {
                return Ok(None);
            };
            let (formalizations, msgs) =
                collect_formalizations(graph, &formalization_key, &declarations_key);

            let expressions_json = serde_json::Value::Object(
                formalizations
                    .expressions
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.to_string())))
                    .collect(),
            );
            let declarations_json = serde_json::Value::Object(
                formalizations
                    .declarations
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect(),
            );
            **artifacts_slot.borrow_mut() =
                Some((expressions_json.clone(), declarations_json.clone()));

            let mut details = serde_json::Map::new();
            details.insert("all_expressions".to_string(), expressions_json);
            details.insert("all_declarations".to_string(), declarations_json);

            Ok(Some(if msgs.is_empty() {
                CheckResult::valid(&name, vec![item.id.clone()]).with_details(details)
            } else {
                CheckResult::invalid(&name, vec![item.id.clone()], msgs.join(" "))
                    .with_details(details)
            }))
        })?;
        drop(artifacts_slot);

        if let Some((expressions, declarations)) = artifacts {
            request
                .artifacts
                .insert("all_expressions".to_string(), expressions);
            request
                .artifacts
                .insert("all_declarations".to_string(), declarations);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GloballyConsistentDeclarationsHandler
// ---------------------------------------------------------------------------

/// The same symbol must carry the same meaning across all arguments of a
/// snippet.
pub struct GloballyConsistentDeclarationsHandler {
    name: String,
    filter: Option<ItemFilter>,
    declarations_key: String,
}

impl GloballyConsistentDeclarationsHandler {
    pub fn new(
        name: impl Into<String>,
        filter: Option<ItemFilter>,
        declarations_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            declarations_key: declarations_key.into(),
        }
    }
}

impl Handler for GloballyConsistentDeclarationsHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let declarations_key = self.declarations_key.clone();
        evaluate_items(request, Dtype::Argdown, self.filter.as_ref(), |item, _ctx| {
            let Some(graph) = item.argdown() else {
                return Ok(None);
            };
            let mut seen: BTreeMap<String, (String, String)> = BTreeMap::new();
            let mut msgs = Vec::new();
            for argument in &graph.arguments {
                let label = arg_label(argument);
                for step in &argument.pcs {
                    let Some(proposition) = graph.get_proposition(step.proposition_label())
                    else {
                        continue;
                    };
                    let Some(serde_json::Value::Object(declarations)) =
                        proposition.data.get(&declarations_key)
                    else {
                        continue;
                    };
                    for (symbol, meaning) in declarations {
                        let meaning = match meaning {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        match seen.get(symbol) {
                            Some((prior_arg, prior_meaning))
                                if prior_meaning != &meaning && prior_arg != &label =>
                            {
                                msgs.push(format!(
                                    "Symbol '{symbol}' is declared as '{prior_meaning}' in {prior_arg} but as '{meaning}' in {label}."
                                ));
                            }
                            Some(_) => {}
                            None => {
                                seen.insert(symbol.clone(), (label.clone(), meaning));
                            }
                        }
                    }
                }
            }
            Ok(Some(if msgs.is_empty() {
                CheckResult::valid(&name, vec![item.id.clone()])
            } else {
                CheckResult::invalid(&name, vec![item.id.clone()], msgs.join(" "))
            }))
        })
    }
}

// ---------------------------------------------------------------------------
// DeductiveValidityHandler
// ---------------------------------------------------------------------------

/// Every inference step must be deductively valid: the premises referenced
/// in the `from` list must entail the conclusion.
pub struct DeductiveValidityHandler {
    name: String,
    filter: Option<ItemFilter>,
    from_key: String,
    formalization_key: String,
    declarations_key: String,
    prover: Arc<dyn Prover>,
}

impl DeductiveValidityHandler {
    pub fn new(
        name: impl Into<String>,
        filter: Option<ItemFilter>,
        from_key: impl Into<String>,
        formalization_key: impl Into<String>,
        declarations_key: impl Into<String>,
        prover: Arc<dyn Prover>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            from_key: from_key.into(),
            formalization_key: formalization_key.into(),
            declarations_key: declarations_key.into(),
            prover,
        }
    }

    fn step_premises(
        argument: &Argument,
        position: usize,
        refs: &[String],
        expressions: &BTreeMap<String, Formula>,
    ) -> Option<Vec<Formula>> {
        let mut premises = Vec::new();
        for reference in refs {
            let step = argument.pcs[..position]
                .iter()
                .find(|p| p.label() == reference.as_str())?;
            premises.push(expressions.get(step.proposition_label())?.clone());
        }
        Some(premises)
    }
}

impl Handler for DeductiveValidityHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let from_key = self.from_key.clone();
        let formalization_key = self.formalization_key.clone();
        let declarations_key = self.declarations_key.clone();
        let prover = Arc::clone(&self.prover);

        evaluate_items(request, Dtype::Argdown, self.filter.as_ref(), |item, _ctx| {
            let Some(graph) = item.argdown() else {
                return Ok(None);
            };
            let (formalizations, problems) =
                collect_formalizations(graph, &formalization_key, &declarations_key);
            if !problems.is_empty() {
                // formalization defects are WellFormedFormulasHandler's call
                return Ok(None);
            }

            let mut msgs = Vec::new();
            for argument in &graph.arguments {
                let label = arg_label(argument);
                for (position, step) in argument.pcs.iter().enumerate() {
                    let Some(inference_data) = step.inference_data() else {
                        continue;
                    };
                    let Some(refs) = from_refs(inference_data, &from_key) else {
                        continue;
                    };
                    let Some(conclusion) =
                        formalizations.expressions.get(step.proposition_label())
                    else {
                        continue;
                    };
                    let Some(premises) = Self::step_premises(
                        argument,
                        position,
                        &refs,
                        &formalizations.expressions,
                    ) else {
                        continue;
                    };
                    if !prover.entails(&premises, conclusion)? {
                        msgs.push(format!(
                            "In {label}: The inference to conclusion ({}) is not deductively valid.",
                            step.label()
                        ));
                    }
                }
            }
            Ok(Some(if msgs.is_empty() {
                CheckResult::valid(&name, vec![item.id.clone()])
            } else {
                CheckResult::invalid(&name, vec![item.id.clone()], msgs.join(" "))
            }))
        })
    }
}

// ---------------------------------------------------------------------------
// RelevanceOfPremisesHandler
// ---------------------------------------------------------------------------

/// Dropping any single referenced premise must break the inference.
pub struct RelevanceOfPremisesHandler {
    name: String,
    filter: Option<ItemFilter>,
    from_key: String,
    formalization_key: String,
    declarations_key: String,
    prover: Arc<dyn Prover>,
}

impl RelevanceOfPremisesHandler {
    pub fn new(
        name: impl Into<String>,
        filter: Option<ItemFilter>,
        from_key: impl Into<String>,
        formalization_key: impl Into<String>,
        declarations_key: impl Into<String>,
        prover: Arc<dyn Prover>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            from_key: from_key.into(),
            formalization_key: formalization_key.into(),
            declarations_key: declarations_key.into(),
            prover,
        }
    }
}

impl Handler for RelevanceOfPremisesHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let from_key = self.from_key.clone();
        let formalization_key = self.formalization_key.clone();
        let declarations_key = self.declarations_key.clone();
        let prover = Arc::clone(&self.prover);

        evaluate_items(request, Dtype::Argdown, self.filter.as_ref(), |item, _ctx| {
            let Some(graph) = item.argdown() else {
                return Ok(None);
            };
            let (formalizations, problems) =
                collect_formalizations(graph, &formalization_key, &declarations_key);
            if !problems.is_empty() {
                return Ok(None);
            }

            let mut msgs = Vec::new();
            for argument in &graph.arguments {
                let label = arg_label(argument);
                for (position, step) in argument.pcs.iter().enumerate() {
                    let Some(inference_data) = step.inference_data() else {
                        continue;
                    };
                    let Some(refs) = from_refs(inference_data, &from_key) else {
                        continue;
                    };
                    let Some(conclusion) =
                        formalizations.expressions.get(step.proposition_label())
                    else {
                        continue;
                    };
                    let Some(premises) = DeductiveValidityHandler::step_premises(
                        argument,
                        position,
                        &refs,
                        &formalizations.expressions,
                    ) else {
                        continue;
                    };
                    if !prover.entails(&premises, conclusion)? {
                        // not valid in the first place; validity handler reports it
                        continue;
                    }
                    for (index, reference) in refs.iter().enumerate() {
                        let mut reduced = premises.clone();
                        reduced.remove(index);
                        if prover.entails(&reduced, conclusion)? {
                            msgs.push(format!(
                                "In {label}: Premise ({reference}) is not relevant for the inference to conclusion ({}).",
                                step.label()
                            ));
                        }
                    }
                }
            }
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

/// The logreco composite appended after the (tailored) infreco composite.
pub fn logreco_composite(
    filter: Option<ItemFilter>,
    from_key: &str,
    formalization_key: &str,
    declarations_key: &str,
) -> CompositeHandler {
    let prover: Arc<dyn Prover> = Arc::new(ModelChecker::default());
    CompositeHandler::new(
        "LogRecoCompositeHandler",
        vec![
            Box::new(WellFormedFormulasHandler::new(
                "LogReco.WellFormedFormulasHandler",
                filter.clone(),
                formalization_key,
                declarations_key,
            )),
            Box::new(GloballyConsistentDeclarationsHandler::new(
                "LogReco.GloballyConsistentDeclarationsHandler",
                filter.clone(),
                declarations_key,
            )),
            Box::new(DeductiveValidityHandler::new(
                "LogReco.DeductiveValidityHandler",
                filter.clone(),
                from_key,
                formalization_key,
                declarations_key,
                Arc::clone(&prover),
            )),
            Box::new(RelevanceOfPremisesHandler::new(
                "LogReco.RelevanceOfPremisesHandler",
                filter,
                from_key,
                formalization_key,
                declarations_key,
                prover,
            )),
        ],
    )
}
