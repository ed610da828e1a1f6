//! Content-check handlers: assert that the input contains at least one
//! successfully parsed block of the expected kind.

use veridown_types::{CheckResult, Dtype, Result};

use crate::handler::{Handler, ItemFilter};
use crate::request::VerificationRequest;

fn existence_result(
    request: &VerificationRequest,
    name: &str,
    dtype: Dtype,
    filter: Option<&ItemFilter>,
    missing_message: &str,
) -> CheckResult {
    let found = request.verification_data.iter().find(|item| {
        item.dtype == dtype
            && item.artifact.is_some()
            && filter.map(|f| f(item)).unwrap_or(true)
    });
    match found {
        Some(item) => CheckResult::valid(name, vec![item.id.clone()]),
        None => CheckResult::invalid(name, vec![], missing_message),
    }
}

/// Checks that at least one xml annotation was extracted and parsed.
pub struct HasAnnotationsHandler {
    name: String,
    filter: Option<ItemFilter>,
}

impl HasAnnotationsHandler {
    pub fn new(filter: Option<ItemFilter>) -> Self {
        Self {
            name: "HasAnnotationsHandler".to_string(),
            filter,
        }
    }

    pub fn with_name(name: impl Into<String>, filter: Option<ItemFilter>) -> Self {
        Self {
            name: name.into(),
            filter,
        }
    }
}

impl Handler for HasAnnotationsHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let result = existence_result(
            request,
            &self.name,
            Dtype::Xml,
            self.filter.as_ref(),
            "No fenced xml block in the input text.",
        );
        request.add_result(result);
        Ok(())
    }
}

/// Checks that at least one argdown snippet was extracted and parsed.
pub struct HasArgdownHandler {
    name: String,
    filter: Option<ItemFilter>,
}

impl HasArgdownHandler {
    pub fn new(filter: Option<ItemFilter>) -> Self {
        Self {
            name: "HasArgdownHandler".to_string(),
            filter,
        }
    }

    pub fn with_name(name: impl Into<String>, filter: Option<ItemFilter>) -> Self {
        Self {
            name: name.into(),
            filter,
        }
    }
}

impl Handler for HasArgdownHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let result = existence_result(
            request,
            &self.name,
            Dtype::Argdown,
            self.filter.as_ref(),
            "No fenced argdown block in the input text.",
        );
        request.add_result(result);
        Ok(())
    }
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

    #[test]
    fn annotations_found() {
        let mut request = processed("```xml\n<proposition id=\"a\">t</proposition>\n```\n");
        HasAnnotationsHandler::new(None).process(&mut request);
        let result = request.results.last().unwrap();
        assert!(result.is_valid);
        assert_eq!(result.verification_data_references, vec!["xml_0".to_string()]);
    }

    #[test]
    fn missing_annotations_reported() {
        let mut request = processed("");
        HasAnnotationsHandler::new(None).process(&mut request);
        let result = request.results.last().unwrap();
        assert!(!result.is_valid);
        assert!(result.message.as_deref().unwrap().contains("No fenced xml block"));
    }

    #[test]
    fn argdown_existence_respects_parse_success() {
        let mut request = processed("```argdown\n[C]: Claim.\n```\n");
        HasArgdownHandler::new(None).process(&mut request);
        assert!(request.results.last().unwrap().is_valid);
    }
}
