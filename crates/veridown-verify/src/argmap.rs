//! Argument map checks (the argmap family). Maps stay at the macro level:
//! labeled nodes, unambiguous labels, no premise-conclusion structures.

use veridown_argdown::ArgdownGraph;
use veridown_types::{CheckResult, Dtype, Result};

use crate::handler::{evaluate_items, CompositeHandler, Handler, ItemFilter};
use crate::request::VerificationRequest;
use crate::util::shorten;

macro_rules! argmap_handler {
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
                    let message: Option<String> = ($evaluate)(graph);
                    Ok(Some(match message {
                        None => CheckResult::valid(&name, vec![item.id.clone()]),
                        Some(msg) => CheckResult::invalid(&name, vec![item.id.clone()], msg),
                    }))
                })
            }
        }
    };
}

argmap_handler!(
    /// Every claim node carries an explicit label and a non-empty text.
    CompleteClaimsHandler,
    |graph: &ArgdownGraph| {
        let incomplete: Vec<String> = graph
            .propositions
            .iter()
            .filter(|p| p.auto_label)
            .map(|p| match p.texts.first().filter(|t| !t.is_empty()) {
                Some(text) => shorten(text, 40),
                None => "Empty claim".to_string(),
            })
            .collect();
        (!incomplete.is_empty())
            .then(|| format!("Missing labels for nodes: {}", incomplete.join(", ")))
    }
);

argmap_handler!(
    /// No label is associated with more than one distinct text or gist.
    NoDuplicateLabelsHandler,
    |graph: &ArgdownGraph| {
        let mut duplicate_labels: Vec<String> = Vec::new();
        for claim in &graph.propositions {
            if claim.texts.len() > 1 && !claim.auto_label {
                duplicate_labels.push(claim.label.clone());
            }
        }
        for argument in &graph.arguments {
            if argument.gists.len() > 1 {
                if let Some(label) = &argument.label {
                    duplicate_labels.push(label.clone());
                }
            }
        }
        (!duplicate_labels.is_empty())
            .then(|| format!("Duplicate labels: {}", duplicate_labels.join(", ")))
    }
);

argmap_handler!(
    /// No argument carries a premise-conclusion structure.
    NoPCSHandler,
    |graph: &ArgdownGraph| {
        let with_pcs: Vec<String> = graph
            .arguments
            .iter()
            .filter(|a| !a.pcs.is_empty())
            .map(|a| match &a.label {
                Some(label) => format!("<{label}>"),
                None => "<unlabeled_argument>".to_string(),
            })
            .collect();
        (!with_pcs.is_empty()).then(|| {
            format!(
                "Found detailed reconstruction of individual argument(s) {} as premise-conclusion-structures.",
                with_pcs.join(", ")
            )
        })
    }
);

/// The default argmap composite.
pub fn argmap_composite(filter: Option<ItemFilter>) -> CompositeHandler {
    CompositeHandler::new(
        "ArgMapCompositeHandler",
        vec![
            Box::new(CompleteClaimsHandler::new(
                "ArgMap.CompleteClaimsHandler",
                filter.clone(),
            )),
            Box::new(NoDuplicateLabelsHandler::new(
                "ArgMap.NoDuplicateLabelsHandler",
                filter.clone(),
            )),
            Box::new(NoPCSHandler::new("ArgMap.NoPCSHandler", filter)),
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

    fn argdown(body: &str) -> String {
        format!("```argdown\n{body}\n```\n")
    }

    #[test]
    fn valid_map_passes_all_three_checks() {
        let mut request = processed(&argdown("[C]: Claim.\n  <+ <A>: Because."));
        argmap_composite(None).process(&mut request);
        assert!(request.is_valid(), "results: {:?}", request.results);
        assert_eq!(request.results.len(), 3);
        assert_eq!(
            request.executed_handlers,
            vec![
                "ArgMapCompositeHandler".to_string(),
                "ArgMap.CompleteClaimsHandler".to_string(),
                "ArgMap.NoDuplicateLabelsHandler".to_string(),
                "ArgMap.NoPCSHandler".to_string(),
            ]
        );
    }

    #[test]
    fn unlabeled_claim_flagged() {
        let mut request = processed(&argdown("[C]: Claim.\n  <+ Unlabeled reason text."));
        CompleteClaimsHandler::new("h", None).process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(message.contains("Missing labels for nodes"), "got {message}");
        assert!(message.contains("Unlabeled reason text."));
    }

    #[test]
    fn ambiguous_labels_flagged() {
        let mut request = processed(&argdown(
            "[C]: One reading.\n\n[C]: Another reading.\n\n<A>: First gist.\n\n<A>: Second gist.",
        ));
        NoDuplicateLabelsHandler::new("h", None).process(&mut request);
        let message = request.results[0].message.clone().unwrap();
        assert!(message.contains("Duplicate labels:"));
        assert!(message.contains('C') && message.contains('A'));
    }

    #[test]
    fn pcs_in_map_flagged() {
        let mut request = processed(&argdown(
            "[C]: Claim.\n  <+ <A>: Because.\n\n<A>\n(1) One.\n-- {from: ['1']} --\n(2) Two.",
        ));
        NoPCSHandler::new("h", None).process(&mut request);
        assert!(request.results[0]
            .message
            .as_deref()
            .unwrap()
            .contains("Found detailed reconstruction of individual argument(s) <A>"));
    }
}
