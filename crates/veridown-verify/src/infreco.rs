//! Informal reconstruction checks (the infreco family).
//!
//! One invariant per handler, evaluated over every argdown item that passes
//! the role filter.

use veridown_argdown::{ArgdownGraph, Argument, DialecticalType};
use veridown_types::{CheckResult, Dtype, Result};

use crate::handler::{evaluate_items, CompositeHandler, Handler, ItemFilter};
use crate::request::{scalar_string, VerificationRequest};

fn arg_label(argument: &Argument) -> String {
    match &argument.label {
        Some(label) => format!("<{label}>"),
        None => "<unlabeled argument>".to_string(),
    }
}

/// The `from` list of a conclusion's inference data, rendered as strings.
pub fn from_refs(data: &veridown_argdown::DataMap, from_key: &str) -> Option<Vec<String>> {
    data.get(from_key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().map(scalar_string).collect())
}

/// Scaffolding for graph-only checks: a named, filtered handler whose
/// closure maps a graph to an optional failure message.
macro_rules! infreco_handler {
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
                evaluate_items(request, Dtype::Argdown, self.filter.as_ref(), |item, _ctx| {
                    let Some(graph) = item.argdown() else {
                        return Ok(None);
                    };
                    #[allow(clippy::redundant_closure_call)]
                    let message: Option<Option<String>> = ($evaluate)(graph);
                    Ok(message.map(|message| match message {
                        None => CheckResult::valid(&name, vec![item.id.clone()]),
                        Some(msg) => CheckResult::invalid(&name, vec![item.id.clone()], msg),
                    }))
                })
            }
        }
    };
}

// The closures below return `None` to skip the item entirely, `Some(None)`
// for a passing result, and `Some(Some(msg))` for a failure.

infreco_handler!(
    /// At least one argument is present.
    HasArgumentsHandler,
    |graph: &ArgdownGraph| {
        if graph.arguments.is_empty() {
            Some(Some("No arguments found in the argdown data.".to_string()))
        } else {
            Some(None)
        }
    }
);

infreco_handler!(
    /// Exactly one argument is present.
    HasUniqueArgumentHandler,
    |graph: &ArgdownGraph| {
        let msg = match graph.arguments.len() {
            0 => Some("No arguments found in the argdown data.".to_string()),
            1 => None,
            _ => Some("More than one argument found in the argdown data.".to_string()),
        };
        Some(msg)
    }
);

infreco_handler!(
    /// Every argument has a premise-conclusion structure.
    HasPCSHandler,
    |graph: &ArgdownGraph| {
        if graph.arguments.is_empty() {
            return None;
        }
        let missing: Vec<String> = graph
            .arguments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.pcs.is_empty())
            .map(|(idx, a)| match &a.label {
                Some(label) => format!("<{label}>"),
                None => format!("Argument #{}", idx + 1),
            })
            .collect();
        Some((!missing.is_empty()).then(|| {
            format!(
                "The following arguments lack premise conclusion structure: {}",
                missing.join(", ")
            )
        }))
    }
);

infreco_handler!(
    /// Every premise-conclusion structure starts with a premise.
    StartsWithPremiseHandler,
    |graph: &ArgdownGraph| {
        let invalid: Vec<String> = graph
            .arguments
            .iter()
            .filter(|a| a.pcs.first().is_some_and(|p| p.is_conclusion()))
            .map(arg_label)
            .collect();
        Some((!invalid.is_empty()).then(|| {
            format!(
                "The following arguments do not start with a premise: {}",
                invalid.join(", ")
            )
        }))
    }
);

infreco_handler!(
    /// Every premise-conclusion structure ends with a conclusion.
    EndsWithConclusionHandler,
    |graph: &ArgdownGraph| {
        let invalid: Vec<String> = graph
            .arguments
            .iter()
            .filter(|a| a.pcs.last().is_some_and(|p| !p.is_conclusion()))
            .map(arg_label)
            .collect();
        Some((!invalid.is_empty()).then(|| {
            format!(
                "The following arguments do not end with a conclusion: {}",
                invalid.join(", ")
            )
        }))
    }
);

infreco_handler!(
    /// Arguments carry at most one gist.
    NotMultipleGistsHandler,
    |graph: &ArgdownGraph| {
        let invalid: Vec<String> = graph
            .arguments
            .iter()
            .filter(|a| a.gists.len() > 1)
            .map(arg_label)
            .collect();
        Some((!invalid.is_empty()).then(|| {
            format!(
                "The following arguments have alternative gists (and are declared multiple times): {}",
                invalid.join(", ")
            )
        }))
    }
);

infreco_handler!(
    /// No duplicate step labels within an argument.
    NoDuplicatePCSLabelsHandler,
    |graph: &ArgdownGraph| {
        let mut invalid = Vec::new();
        for argument in &graph.arguments {
            if argument.pcs.is_empty() {
                continue;
            }
            let labels: Vec<String> =
                argument.pcs.iter().map(|p| p.label().to_string()).collect();
            let dupes = crate::util::duplicates(&labels);
            if !dupes.is_empty() {
                let rendered: Vec<String> =
                    dupes.iter().map(|l| format!("({l})")).collect();
                invalid.push(format!(
                    "{} (duplicates: {})",
                    arg_label(argument),
                    rendered.join(", ")
                ));
            }
        }
        Some((!invalid.is_empty()).then(|| {
            format!(
                "The following arguments have duplicate premise/conclusion labels: {}",
                invalid.join(", ")
            )
        }))
    }
);

infreco_handler!(
    /// Every argument has a label.
    HasLabelHandler,
    |graph: &ArgdownGraph| {
        let unlabeled: Vec<String> = graph
            .arguments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.label.is_none())
            .map(|(idx, _)| format!("Argument #{}", idx + 1))
            .collect();
        Some((!unlabeled.is_empty()).then(|| {
            format!("The following arguments lack labels: {}", unlabeled.join(", "))
        }))
    }
);

infreco_handler!(
    /// Every argument has a gist.
    HasGistHandler,
    |graph: &ArgdownGraph| {
        let invalid: Vec<String> = graph
            .arguments
            .iter()
            .filter(|a| a.gists.is_empty())
            .map(arg_label)
            .collect();
        Some((!invalid.is_empty()).then(|| {
            format!("The following arguments lack gists: {}", invalid.join(", "))
        }))
    }
);

infreco_handler!(
    /// No propositions outside any argument.
    NoExtraPropositionsHandler,
    |graph: &ArgdownGraph| {
        let pcs_props: Vec<&str> = graph
            .arguments
            .iter()
            .flat_map(|a| a.pcs.iter().map(|p| p.proposition_label()))
            .collect();
        let outside: Vec<String> = graph
            .propositions
            .iter()
            .filter(|p| !pcs_props.contains(&p.label.as_str()))
            .map(|p| format!("[{}]", p.label))
            .collect();
        Some((!outside.is_empty()).then(|| {
            format!(
                "Argdown snippet contains propositions not used in any argument: {}.",
                outside.join(", ")
            )
        }))
    }
);

infreco_handler!(
    /// Only relations grounded in premise-conclusion structures may appear.
    OnlyGroundedDialecticalRelationsHandler,
    |graph: &ArgdownGraph| {
        let sketched = graph.dialectical_relations.iter().any(|r| {
            r.dialectics.len() != 1 || !r.dialectics.contains(&DialecticalType::Grounded)
        });
        Some(sketched.then(|| "Argdown snippet defines dialectical relations.".to_string()))
    }
);

infreco_handler!(
    /// No inline data on propositions (strict informal profile).
    NoPropInlineDataHandler,
    |graph: &ArgdownGraph| {
        let found = graph.propositions.iter().any(|p| !p.data.is_empty());
        Some(found.then(|| "Some propositions contain yaml inline data.".to_string()))
    }
);

infreco_handler!(
    /// No inline data on arguments (strict informal profile).
    NoArgInlineDataHandler,
    |graph: &ArgdownGraph| {
        let found = graph.arguments.iter().any(|a| !a.data.is_empty());
        Some(found.then(|| "Some arguments contain yaml inline data.".to_string()))
    }
);

// ---------------------------------------------------------------------------
// Count and inference-data handlers (carry parameters)
// ---------------------------------------------------------------------------

/// At least N arguments are present.
pub struct HasAtLeastNArgumentsHandler {
    name: String,
    filter: Option<ItemFilter>,
    n: usize,
}

impl HasAtLeastNArgumentsHandler {
    pub fn new(name: impl Into<String>, filter: Option<ItemFilter>, n: usize) -> Self {
        Self {
            name: name.into(),
            filter,
            n,
        }
    }
}

impl Handler for HasAtLeastNArgumentsHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        evaluate_items(request, Dtype::Argdown, self.filter.as_ref(), |item, _ctx| {
            let Some(graph) = item.argdown() else {
                return Ok(None);
            };
            let size = graph.arguments.len();
            Ok(Some(if size < self.n {
                CheckResult::invalid(
                    &name,
                    vec![item.id.clone()],
                    format!("Not enough arguments (found {size}, expected ≥{}).", self.n),
                )
            } else {
                CheckResult::valid(&name, vec![item.id.clone()])
            }))
        })
    }
}

/// Every conclusion carries inference data with a non-empty `from` list.
pub struct HasInferenceDataHandler {
    name: String,
    filter: Option<ItemFilter>,
    from_key: String,
}

impl HasInferenceDataHandler {
    pub fn new(
        name: impl Into<String>,
        filter: Option<ItemFilter>,
        from_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            from_key: from_key.into(),
        }
    }
}

impl Handler for HasInferenceDataHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let from_key = self.from_key.clone();
        evaluate_items(request, Dtype::Argdown, self.filter.as_ref(), |item, _ctx| {
            let Some(graph) = item.argdown() else {
                return Ok(None);
            };
            let mut msgs = Vec::new();
            for argument in &graph.arguments {
                let label = arg_label(argument);
                for step in &argument.pcs {
                    let Some(inference_data) = step.inference_data() else {
                        continue;
                    };
                    if inference_data.is_empty() {
                        msgs.push(format!(
                            "In {label}: Inference to conclusion {} lacks yaml inference information.",
                            step.label()
                        ));
                        continue;
                    }
                    match inference_data.get(&from_key) {
                        None => msgs.push(format!(
                            "In {label}: Inference to conclusion {} inference information lacks '{from_key}' key.",
                            step.label()
                        )),
                        Some(value) if !value.is_array() => msgs.push(format!(
                            "In {label}: Inference to conclusion {} inference information '{from_key}' value is not a list.",
                            step.label()
                        )),
                        Some(value) if value.as_array().is_some_and(|l| l.is_empty()) => {
                            msgs.push(format!(
                                "In {label}: Inference to conclusion {} inference information '{from_key}' value is empty.",
                                step.label()
                            ))
                        }
                        Some(_) => {}
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

/// Every `from` reference points to an earlier step of the same argument.
pub struct PropRefsExistHandler {
    name: String,
    filter: Option<ItemFilter>,
    from_key: String,
}

impl PropRefsExistHandler {
    pub fn new(
        name: impl Into<String>,
        filter: Option<ItemFilter>,
        from_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            from_key: from_key.into(),
        }
    }
}

impl Handler for PropRefsExistHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let from_key = self.from_key.clone();
        evaluate_items(request, Dtype::Argdown, self.filter.as_ref(), |item, _ctx| {
            let Some(graph) = item.argdown() else {
                return Ok(None);
            };
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
                    let earlier: Vec<&str> = argument.pcs[..position]
                        .iter()
                        .map(|p| p.label())
                        .collect();
                    for reference in refs {
                        if !earlier.contains(&reference.as_str()) {
                            msgs.push(format!(
                                "In {label}: Item '{reference}' in inference information of conclusion {} does not refer to a previously introduced premise or conclusion.",
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

/// Every step except the final conclusion is used in some inference.
pub struct UsesAllPropsHandler {
    name: String,
    filter: Option<ItemFilter>,
    from_key: String,
}

impl UsesAllPropsHandler {
    pub fn new(
        name: impl Into<String>,
        filter: Option<ItemFilter>,
        from_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            from_key: from_key.into(),
        }
    }
}

impl Handler for UsesAllPropsHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let name = self.name.clone();
        let from_key = self.from_key.clone();
        evaluate_items(request, Dtype::Argdown, self.filter.as_ref(), |item, _ctx| {
            let Some(graph) = item.argdown() else {
                return Ok(None);
            };
            let mut msgs = Vec::new();
            for argument in &graph.arguments {
                if argument.pcs.is_empty() {
                    continue;
                }
                let mut used: Vec<String> = Vec::new();
                for step in &argument.pcs {
                    if let Some(inference_data) = step.inference_data() {
                        used.extend(from_refs(inference_data, &from_key).unwrap_or_default());
                    }
                }
                let unused: Vec<String> = argument.pcs[..argument.pcs.len() - 1]
                    .iter()
                    .filter(|p| !used.iter().any(|u| u == p.label()))
                    .map(|p| format!("({})", p.label()))
                    .collect();
                if !unused.is_empty() {
                    msgs.push(format!(
                        "In {}: Some propositions are not explicitly used in any inferences: {}.",
                        arg_label(argument),
                        unused.join(", ")
                    ));
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

/// The full infreco composite with every handler of the family; builders
/// tailor this set per verifier.
pub fn infreco_composite(filter: Option<ItemFilter>, from_key: &str) -> CompositeHandler {
    CompositeHandler::new(
        "InfRecoCompositeHandler",
        vec![
            Box::new(HasArgumentsHandler::new("InfReco.HasArgumentsHandler", filter.clone())),
            Box::new(HasUniqueArgumentHandler::new(
                "InfReco.HasUniqueArgumentHandler",
                filter.clone(),
            )),
            Box::new(HasPCSHandler::new("InfReco.HasPCSHandler", filter.clone())),
            Box::new(StartsWithPremiseHandler::new(
                "InfReco.StartsWithPremiseHandler",
                filter.clone(),
            )),
            Box::new(EndsWithConclusionHandler::new(
                "InfReco.EndsWithConclusionHandler",
                filter.clone(),
            )),
            Box::new(NotMultipleGistsHandler::new(
                "InfReco.NotMultipleGistsHandler",
                filter.clone(),
            )),
            Box::new(NoDuplicatePCSLabelsHandler::new(
                "InfReco.NoDuplicatePCSLabelsHandler",
                filter.clone(),
            )),
            Box::new(HasLabelHandler::new("InfReco.HasLabelHandler", filter.clone())),
            Box::new(HasGistHandler::new("InfReco.HasGistHandler", filter.clone())),
            Box::new(HasInferenceDataHandler::new(
                "InfReco.HasInferenceDataHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(PropRefsExistHandler::new(
                "InfReco.PropRefsExistHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(UsesAllPropsHandler::new(
                "InfReco.UsesAllPropsHandler",
                filter.clone(),
                from_key,
            )),
            Box::new(NoExtraPropositionsHandler::new(
                "InfReco.NoExtraPropositionsHandler",
                filter.clone(),
            )),
            Box::new(OnlyGroundedDialecticalRelationsHandler::new(
                "InfReco.OnlyGroundedDialecticalRelationsHandler",
                filter.clone(),
            )),
            Box::new(NoPropInlineDataHandler::new(
                "InfReco.NoPropInlineDataHandler",
                filter.clone(),
            )),
            Box::new(NoArgInlineDataHandler::new(
                "InfReco.NoArgInlineDataHandler",
                filter,
            )),
        ],
    )
}
