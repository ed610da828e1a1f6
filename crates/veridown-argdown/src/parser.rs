//! Line-oriented parser producing an [`ArgdownGraph`].
//!
//! Handles the subset of Argdown the verification checks consume: labeled
//! claims `[C]: text`, arguments `<A>: gist`, indented dialectical relation
//! lines, premise-conclusion structures with `(n)` steps and `-- … --`
//! inference separators, and inline `{…}` data maps.

use std::collections::BTreeSet;
use std::collections::HashMap;

use indexmap::IndexMap;
use veridown_types::{Dtype, VerificationError};

use crate::ast::*;
use crate::data::{parse_data_map, split_trailing_data};

/// Strip `//` line comments and `/* */` block comments, preserving newlines
/// so line numbers stay correct.
pub(crate) fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        if i + 1 < len && bytes[i] == b'/' && bytes[i + 1] == b'/' {
            i += 2;
            while i < len && bytes[i] != b'\n' {
                i += 1;
            }
        } else if i + 1 < len && bytes[i] == b'/' && bytes[i + 1] == b'*' {
            i += 2;
            while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                if bytes[i] == b'\n' {
                    out.push('\n');
                }
                i += 1;
            }
            if i + 1 < len {
                i += 2;
            }
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Node references on relation lines and headers
// ---------------------------------------------------------------------------

/// `[C]`, `[C]: text`, `<A>`, `<A>: gist`, or bare text.
enum NodeRef {
    Claim { label: String, text: Option<String> },
    Argument { label: String, gist: Option<String> },
    Bare(String),
}

fn parse_node_ref(s: &str) -> NodeRef {
    let s = s.trim();
    for (open, close) in [('[', ']'), ('<', '>')] {
        if let Some(rest) = s.strip_prefix(open) {
            if let Some(end) = rest.find(close) {
                let label = rest[..end].trim().to_string();
                let after = rest[end + 1..].trim();
                let body = after
                    .strip_prefix(':')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);
                if !label.is_empty() {
                    return if open == '[' {
                        NodeRef::Claim { label, text: body }
                    } else {
                        NodeRef::Argument { label, gist: body }
                    };
                }
            }
        }
    }
    NodeRef::Bare(s.to_string())
}

/// Relation marker at the start of an indented line.
fn parse_marker(s: &str) -> Option<(&'static str, &str)> {
    for marker in ["<+", "+>", "<-", "->", "><", "<_", "_>", "+", "-", "_"] {
        if let Some(rest) = s.strip_prefix(marker) {
            // one-char markers must be followed by whitespace to avoid
            // swallowing e.g. "-3" in prose
            if marker.len() == 1 && !rest.starts_with(char::is_whitespace) {
                continue;
            }
            let fixed: &'static str = match marker {
                "<+" => "<+",
                "+>" => "+>",
                "<-" => "<-",
                "->" => "->",
                "><" => "><",
                "<_" => "<_",
                "_>" => "_>",
                "+" => "+",
                "-" => "-",
                _ => "_",
            };
            return Some((fixed, rest.trim_start()));
        }
    }
    None
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn is_inference_separator(trimmed: &str) -> bool {
    trimmed.starts_with("--") && (trimmed.chars().all(|c| c == '-') || trimmed.ends_with("--"))
}

/// Split off and parse a trailing `{…}` data map; a dangling `{` is an error.
fn extract_data(body: &str) -> Result<(String, DataMap), String> {
    let (text, data_src) = split_trailing_data(body);
    match data_src {
        Some(src) => {
            let data = parse_data_map(src)?;
            Ok((text, data))
        }
        None if text.contains('{') => Err("unterminated inline data map".to_string()),
        None => Ok((text, DataMap::new())),
    }
}

// ---------------------------------------------------------------------------
// Graph builder
// ---------------------------------------------------------------------------

#[derive(Default)]
struct GraphBuilder {
    props: IndexMap<String, Proposition>,
    text_index: HashMap<String, String>,
    auto_counter: usize,
    arguments: IndexMap<String, Argument>,
    anon_counter: usize,
    relations: Vec<DialecticalRelation>,
}

impl GraphBuilder {
    fn ensure_claim(&mut self, label: &str, text: Option<String>, data: DataMap) {
        let prop = self
            .props
            .entry(label.to_string())
            .or_insert_with(|| Proposition {
                label: label.to_string(),
                auto_label: false,
                texts: Vec::new(),
                data: DataMap::new(),
            });
        prop.auto_label = false;
        if let Some(text) = text {
            if !text.is_empty() && !prop.texts.contains(&text) {
                prop.texts.push(text);
            }
        }
        prop.data.extend(data);
    }

    fn auto_prop(&mut self, text: &str, data: DataMap) -> String {
        if let Some(label) = self.text_index.get(text) {
            let label = label.clone();
            if let Some(prop) = self.props.get_mut(&label) {
                prop.data.extend(data);
            }
            return label;
        }
        loop {
            self.auto_counter += 1;
            let label = format!("P{}", self.auto_counter);
            if self.props.contains_key(&label) {
                continue;
            }
            self.props.insert(
                label.clone(),
                Proposition {
                    label: label.clone(),
                    auto_label: true,
                    texts: vec![text.to_string()],
                    data,
                },
            );
            self.text_index.insert(text.to_string(), label.clone());
            return label;
        }
    }

    fn ensure_argument(&mut self, label: &str, gist: Option<String>, data: DataMap) -> String {
        let arg = self
            .arguments
            .entry(label.to_string())
            .or_insert_with(|| Argument {
                label: Some(label.to_string()),
                ..Default::default()
            });
        if let Some(gist) = gist {
            if !gist.is_empty() && !arg.gists.contains(&gist) {
                arg.gists.push(gist);
            }
        }
        arg.data.extend(data);
        label.to_string()
    }

    fn anonymous_argument(&mut self) -> String {
        self.anon_counter += 1;
        let key = format!("@anon{}", self.anon_counter);
        self.arguments.insert(key.clone(), Argument::default());
        key
    }

    fn add_relation(
        &mut self,
        source: String,
        target: String,
        valence: Valence,
        dialectic: DialecticalType,
    ) {
        if let Some(existing) = self
            .relations
            .iter_mut()
            .find(|r| r.source == source && r.target == target && r.valence == valence)
        {
            existing.dialectics.insert(dialectic);
            return;
        }
        self.relations.push(DialecticalRelation {
            source,
            target,
            valence,
            dialectics: BTreeSet::from([dialectic]),
        });
    }

    /// Register a node reference found on a relation line. Returns the node
    /// label and whether it denotes a proposition.
    fn register_node(&mut self, node: NodeRef, data: DataMap) -> (String, bool) {
        match node {
            NodeRef::Claim { label, text } => {
                self.ensure_claim(&label, text, data);
                (label, true)
            }
            NodeRef::Argument { label, gist } => {
                (self.ensure_argument(&label, gist, data), false)
            }
            NodeRef::Bare(text) => (self.auto_prop(&text, data), true),
        }
    }

    fn texts_of(&self, label: &str) -> &[String] {
        self.props
            .get(label)
            .map(|p| p.texts.as_slice())
            .unwrap_or(&[])
    }

    fn props_identical(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        self.texts_of(a)
            .iter()
            .any(|ta| self.texts_of(b).contains(ta))
    }

    fn props_contradictory(&self, a: &str, b: &str) -> bool {
        let negated = |x: &str, y: &str| {
            self.texts_of(x).iter().any(|tx| {
                self.texts_of(y)
                    .iter()
                    .any(|ty| tx.strip_prefix("NOT: ") == Some(ty.as_str()))
            })
        };
        if negated(a, b) || negated(b, a) {
            return true;
        }
        self.relations.iter().any(|r| {
            r.valence == Valence::Contradict
                && ((r.source == a && r.target == b) || (r.source == b && r.target == a))
        })
    }

    /// Derive relations grounded in premise-conclusion structures: a
    /// proposition supports the arguments using it as a premise, an argument
    /// supports its final conclusion, and arguments relate to each other via
    /// shared or contradicting conclusion/premise propositions.
    fn derive_grounded_relations(&mut self) {
        let args: Vec<(String, Vec<String>, Option<String>)> = self
            .arguments
            .iter()
            .filter(|(_, a)| !a.pcs.is_empty())
            .map(|(key, a)| {
                let premises: Vec<String> = a
                    .pcs
                    .iter()
                    .filter(|i| !i.is_conclusion())
                    .map(|i| i.proposition_label().to_string())
                    .collect();
                let conclusion = a
                    .pcs
                    .last()
                    .filter(|i| i.is_conclusion())
                    .map(|i| i.proposition_label().to_string());
                (key.clone(), premises, conclusion)
            })
            .collect();

        for (key, premises, conclusion) in &args {
            let arg_label = match self.arguments[key].label.clone() {
                Some(l) => l,
                None => continue,
            };
            for premise in premises {
                self.add_relation(
                    premise.clone(),
                    arg_label.clone(),
                    Valence::Support,
                    DialecticalType::Grounded,
                );
            }
            if let Some(conclusion) = conclusion {
                self.add_relation(
                    arg_label.clone(),
                    conclusion.clone(),
                    Valence::Support,
                    DialecticalType::Grounded,
                );
            }
        }

        for (key_a, _, conclusion_a) in &args {
            let Some(concl_a) = conclusion_a else { continue };
            let Some(label_a) = self.arguments[key_a].label.clone() else {
                continue;
            };
            for (key_b, premises_b, _) in &args {
                if key_a == key_b {
                    continue;
                }
                let Some(label_b) = self.arguments[key_b].label.clone() else {
                    continue;
                };
                for premise in premises_b {
                    if self.props_identical(concl_a, premise) {
                        self.add_relation(
                            label_a.clone(),
                            label_b.clone(),
                            Valence::Support,
                            DialecticalType::Grounded,
                        );
                    } else if self.props_contradictory(concl_a, premise) {
                        self.add_relation(
                            label_a.clone(),
                            label_b.clone(),
                            Valence::Attack,
                            DialecticalType::Grounded,
                        );
                    }
                }
            }
        }
    }

    fn finish(mut self) -> ArgdownGraph {
        self.derive_grounded_relations();
        ArgdownGraph {
            arguments: self.arguments.into_values().collect(),
            propositions: self.props.into_values().collect(),
            dialectical_relations: self.relations,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse an Argdown snippet into a graph.
pub fn parse(input: &str) -> Result<ArgdownGraph, VerificationError> {
    let stripped = strip_comments(input);
    let mut builder = GraphBuilder::default();

    // (indent, node label) of the current relation tree path
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut current_arg: Option<String> = None;
    let mut pending_inference: Option<DataMap> = None;
    let mut inference_block: Option<DataMap> = None;

    let parse_err = |line_no: usize, message: String| VerificationError::Parse {
        dtype: Dtype::Argdown,
        line: line_no,
        message,
    };

    for (idx, raw_line) in stripped.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() {
            stack.clear();
            continue;
        }

        // Inference separators and the multi-line inference block.
        if is_inference_separator(trimmed) {
            if trimmed.chars().all(|c| c == '-') && trimmed == "--" {
                match inference_block.take() {
                    Some(data) => pending_inference = Some(data),
                    None => inference_block = Some(DataMap::new()),
                }
            } else {
                let inner = trimmed
                    .trim_start_matches('-')
                    .trim_end_matches('-')
                    .trim();
                let (_, data) = extract_data(inner).map_err(|e| parse_err(line_no, e))?;
                pending_inference = Some(data);
            }
            continue;
        }
        if let Some(block) = inference_block.as_mut() {
            let (_, data) = extract_data(trimmed).map_err(|e| parse_err(line_no, e))?;
            block.extend(data);
            continue;
        }

        // Premise-conclusion step: `(1) text {data}`
        if let Some(rest) = trimmed.strip_prefix('(') {
            if let Some(end) = rest.find(')') {
                let step_label = rest[..end].trim();
                if !step_label.is_empty()
                    && step_label.chars().all(|c| c.is_ascii_alphanumeric())
                {
                    let body = rest[end + 1..].trim();
                    let (text, data) =
                        extract_data(body).map_err(|e| parse_err(line_no, e))?;
                    let prop_label = match parse_node_ref(&text) {
                        NodeRef::Claim { label, text } => {
                            builder.ensure_claim(&label, text, data);
                            label
                        }
                        NodeRef::Argument { .. } | NodeRef::Bare(_) => {
                            builder.auto_prop(text.trim(), data)
                        }
                    };
                    let statement = PcsStatement {
                        label: step_label.to_string(),
                        proposition_label: prop_label,
                    };
                    let item = match pending_inference.take() {
                        Some(inference_data) => PcsItem::Conclusion {
                            statement,
                            inference_data,
                        },
                        None => PcsItem::Premise(statement),
                    };
                    let key = match current_arg.clone() {
                        Some(key) => key,
                        None => {
                            let key = builder.anonymous_argument();
                            current_arg = Some(key.clone());
                            key
                        }
                    };
                    if let Some(arg) = builder.arguments.get_mut(&key) {
                        arg.pcs.push(item);
                    }
                    continue;
                }
            }
        }

        let indent = indent_width(raw_line);

        // Indented relation line: `  <+ <A>: gist`
        if indent > 0 {
            if let Some((marker, rest)) = parse_marker(trimmed) {
                let (text, data) = extract_data(rest).map_err(|e| parse_err(line_no, e))?;
                let (label, is_prop) = builder.register_node(parse_node_ref(&text), data);

                while let Some((top_indent, _)) = stack.last() {
                    if *top_indent >= indent {
                        stack.pop();
                    } else {
                        break;
                    }
                }
                if let Some((_, parent)) = stack.last().cloned() {
                    let parent_is_prop = builder.props.contains_key(&parent);
                    let dialectic = if is_prop && parent_is_prop {
                        DialecticalType::Axiomatic
                    } else {
                        DialecticalType::Sketched
                    };
                    let (source, target, valence) = match marker {
                        "<+" | "+" => (label.clone(), parent.clone(), Valence::Support),
                        "+>" => (parent.clone(), label.clone(), Valence::Support),
                        "<-" | "-" | "<_" | "_" => (label.clone(), parent.clone(), Valence::Attack),
                        "_>" | "->" => (parent.clone(), label.clone(), Valence::Attack),
                        _ => (label.clone(), parent.clone(), Valence::Contradict),
                    };
                    builder.add_relation(source.clone(), target.clone(), valence, dialectic);
                    if valence == Valence::Contradict {
                        builder.add_relation(target, source, valence, dialectic);
                    }
                }
                stack.push((indent, label));
                continue;
            }
        }

        // Top-level definitions and bare statements.
        let (text, data) = extract_data(trimmed).map_err(|e| parse_err(line_no, e))?;
        match parse_node_ref(&text) {
            NodeRef::Claim { label, text } => {
                builder.ensure_claim(&label, text, data);
                stack.clear();
                stack.push((indent, label));
                current_arg = None;
            }
            NodeRef::Argument { label, gist } => {
                let key = builder.ensure_argument(&label, gist, data);
                stack.clear();
                stack.push((indent, label));
                current_arg = Some(key);
            }
            NodeRef::Bare(text) => {
                let label = builder.auto_prop(&text, data);
                stack.clear();
                stack.push((indent, label));
                current_arg = None;
            }
        }
    }

    let graph = builder.finish();
    tracing::debug!(
        arguments = graph.arguments.len(),
        propositions = graph.propositions.len(),
        relations = graph.dialectical_relations.len(),
        "parsed argdown snippet"
    );
    Ok(graph)
}
