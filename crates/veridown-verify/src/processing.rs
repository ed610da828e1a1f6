//! Input processing: fenced code block extraction and artifact parsing.

use indexmap::IndexMap;
use winnow::ascii::multispace0;
use winnow::combinator::{delimited, repeat};
use winnow::token::take_while;
use winnow::{ModalResult, Parser};

use veridown_types::{CheckResult, Dtype, Result};

use crate::handler::{CompositeHandler, Handler};
use crate::request::{Artifact, PrimaryData, VerificationRequest};

// ---------------------------------------------------------------------------
// Fenced-block metadata header
// ---------------------------------------------------------------------------

fn ws<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    multispace0.parse_next(input)
}

fn header_key<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
    })
    .parse_next(input)
}

fn header_value(input: &mut &str) -> ModalResult<String> {
    delimited('"', take_while(0.., |c| c != '"'), '"')
        .map(|s: &str| s.to_string())
        .parse_next(input)
}

fn header_entry(input: &mut &str) -> ModalResult<(String, String)> {
    let _ = ws.parse_next(input)?;
    let key = header_key.parse_next(input)?;
    let _ = (ws, '=', ws).parse_next(input)?;
    let value = header_value.parse_next(input)?;
    Ok((key.to_string(), value))
}

fn header(input: &mut &str) -> ModalResult<IndexMap<String, String>> {
    let entries: Vec<(String, String)> =
        delimited(('{', ws), repeat(0.., header_entry), (ws, '}')).parse_next(input)?;
    Ok(entries.into_iter().collect())
}

/// Parse the brace-delimited metadata header of an opening fence. Only
/// `key="value"` pairs are understood; a malformed header yields empty
/// metadata and the block is still extracted.
pub fn parse_metadata_header(raw: &str) -> IndexMap<String, String> {
    let mut remaining = raw.trim();
    if remaining.is_empty() {
        return IndexMap::new();
    }
    match header.parse_next(&mut remaining) {
        Ok(map) if remaining.trim().is_empty() => map,
        _ => {
            tracing::debug!(header = raw, "ignoring malformed metadata header");
            IndexMap::new()
        }
    }
}

// ---------------------------------------------------------------------------
// FencedCodeBlockExtractor
// ---------------------------------------------------------------------------

/// Scans the raw inputs for triple-backtick fenced blocks tagged `argdown`
/// or `xml`, yielding one [`PrimaryData`] per block. Without any fenced
/// block, the whole input is treated as a single argdown item (`input_0`).
pub struct FencedCodeBlockExtractor {
    name: String,
}

impl FencedCodeBlockExtractor {
    pub fn new() -> Self {
        Self {
            name: "FencedCodeBlockExtractor".to_string(),
        }
    }
}

impl Default for FencedCodeBlockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for FencedCodeBlockExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let mut items: Vec<PrimaryData> = Vec::new();
        let mut counters: IndexMap<Dtype, usize> = IndexMap::new();

        let mut open: Option<(Option<Dtype>, IndexMap<String, String>, Vec<&str>)> = None;
        for line in request.inputs.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") {
                match open.take() {
                    Some((dtype, metadata, content)) => {
                        if let Some(dtype) = dtype {
                            let index = counters.entry(dtype).or_insert(0);
                            let id = format!("{dtype}_{index}");
                            *index += 1;
                            items.push(PrimaryData::new(
                                id,
                                dtype,
                                content.join("\n"),
                                metadata,
                            ));
                        }
                        // blocks with unknown language tags are skipped
                    }
                    None => {
                        let rest = trimmed.trim_start_matches('`').trim();
                        let (tag, header_src) = match rest.find(|c: char| c.is_whitespace()) {
                            Some(at) => (&rest[..at], rest[at..].trim()),
                            None => (rest, ""),
                        };
                        let dtype = match tag {
                            "argdown" => Some(Dtype::Argdown),
                            "xml" => Some(Dtype::Xml),
                            _ => None,
                        };
                        let metadata = parse_metadata_header(header_src);
                        open = Some((dtype, metadata, Vec::new()));
                    }
                }
            } else if let Some((_, _, content)) = open.as_mut() {
                content.push(line);
            }
        }
        // an unclosed fence keeps its content
        if let Some((Some(dtype), metadata, content)) = open {
            let index = counters.entry(dtype).or_insert(0);
            let id = format!("{dtype}_{index}");
            items.push(PrimaryData::new(id, dtype, content.join("\n"), metadata));
        }

        if items.is_empty() {
            items.push(PrimaryData::new(
                "input_0",
                Dtype::Argdown,
                request.inputs.trim(),
                IndexMap::new(),
            ));
        }

        tracing::debug!(blocks = items.len(), "extracted fenced code blocks");
        request.verification_data = items;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parser handlers
// ---------------------------------------------------------------------------

/// Parses every argdown item's snippet into a graph; a parse failure is
/// recorded as an invalid result and leaves the artifact unset.
pub struct ArgdownParserHandler {
    name: String,
}

impl ArgdownParserHandler {
    pub fn new() -> Self {
        Self {
            name: "ArgdownParser".to_string(),
        }
    }
}

impl Default for ArgdownParserHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for ArgdownParserHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let mut failures = Vec::new();
        for item in &mut request.verification_data {
            if item.dtype != Dtype::Argdown || item.artifact.is_some() {
                continue;
            }
            match veridown_argdown::parse(&item.code_snippet) {
                Ok(graph) => item.artifact = Some(Artifact::Argdown(graph)),
                Err(error) => {
                    failures.push(CheckResult::invalid(
                        &self.name,
                        vec![item.id.clone()],
                        error.to_string(),
                    ));
                }
            }
        }
        for failure in failures {
            request.add_result(failure);
        }
        Ok(())
    }
}

/// Parses every xml item's snippet into an annotation tree.
pub struct AnnotationParserHandler {
    name: String,
}

impl AnnotationParserHandler {
    pub fn new() -> Self {
        Self {
            name: "XMLAnnotationParser".to_string(),
        }
    }
}

impl Default for AnnotationParserHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for AnnotationParserHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &mut VerificationRequest) -> Result<()> {
        let mut failures = Vec::new();
        for item in &mut request.verification_data {
            if item.dtype != Dtype::Xml || item.artifact.is_some() {
                continue;
            }
            match veridown_anno::parse(&item.code_snippet) {
                Ok(tree) => item.artifact = Some(Artifact::Annotation(tree)),
                Err(error) => {
                    failures.push(CheckResult::invalid(
                        &self.name,
                        vec![item.id.clone()],
                        error.to_string(),
                    ));
                }
            }
        }
        for failure in failures {
            request.add_result(failure);
        }
        Ok(())
    }
}

/// Extraction plus both parsers, the front of every multi-type pipeline.
pub fn default_processing() -> CompositeHandler {
    CompositeHandler::new(
        "DefaultProcessingHandler",
        vec![
            Box::new(FencedCodeBlockExtractor::new()),
            Box::new(ArgdownParserHandler::new()),
            Box::new(AnnotationParserHandler::new()),
        ],
    )
}
