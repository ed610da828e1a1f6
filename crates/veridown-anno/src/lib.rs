//! Lenient parser for XML-style argumentative annotations.
//!
//! Annotated source texts are prose interleaved with markup elements such as
//! `<proposition id="p1" supports="p2">…</proposition>`. The material is not
//! well-formed XML (bare text at top level, unescaped characters), so this
//! is a tolerant tag scanner rather than a strict XML parser. Unclosed
//! elements are closed implicitly at end of input; stray closing tags are
//! ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use veridown_types::{Dtype, VerificationError};

// ---------------------------------------------------------------------------
// Tree model
// ---------------------------------------------------------------------------

/// One markup element with its attributes, inner text, and nested elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub attrs: IndexMap<String, String>,
    /// Concatenated text content, including text of nested elements.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// A list-valued attribute: items separated by commas or whitespace,
    /// tolerating the bracketed form `"['a', 'b']"`.
    pub fn list_attr(&self, name: &str) -> Vec<String> {
        let Some(raw) = self.attrs.get(name) else {
            return Vec::new();
        };
        raw.trim_matches(|c| c == '[' || c == ']')
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(|item| item.trim_matches(|c: char| c == '\'' || c == '"' || c.is_whitespace()))
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// True if any descendant element has the given name.
    pub fn has_nested(&self, name: &str) -> bool {
        self.children
            .iter()
            .any(|c| c.name == name || c.has_nested(name))
    }

    /// Compact source-like rendering used in diagnostic messages.
    pub fn repr(&self) -> String {
        let attrs: Vec<String> = self
            .attrs
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect();
        let open = if attrs.is_empty() {
            format!("<{}>", self.name)
        } else {
            format!("<{} {}>", self.name, attrs.join(" "))
        };
        format!("{open}{}</{}>", self.text, self.name)
    }
}

/// The parsed annotation: top-level elements plus the document's plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationTree {
    pub roots: Vec<Element>,
    text: String,
}

impl AnnotationTree {
    /// Plain text content of the whole document, markup removed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All elements in document order, nested elements included.
    pub fn all_elements(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        fn walk<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
            out.push(element);
            for child in &element.children {
                walk(child, out);
            }
        }
        for root in &self.roots {
            walk(root, &mut out);
        }
        out
    }

    /// All elements with the given name, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        self.all_elements()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }

    /// Shorthand for the elements every check iterates over.
    pub fn propositions(&self) -> Vec<&Element> {
        self.find_all("proposition")
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Scanner<'i> {
    input: &'i str,
    pos: usize,
    line: usize,
}

impl<'i> Scanner<'i> {
    fn err(&self, message: impl Into<String>) -> VerificationError {
        VerificationError::Parse {
            dtype: Dtype::Xml,
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        if c == '\n' {
            self.line += 1;
        }
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            self.bump();
        }
        self.input[start..self.pos].to_string()
    }

    /// Parse the inside of a tag after `<name`, up to and including `>`.
    /// Returns (attrs, self_closing).
    fn tag_rest(&mut self) -> Result<(IndexMap<String, String>, bool), VerificationError> {
        let mut attrs = IndexMap::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('>') => {
                    self.bump();
                    return Ok((attrs, false));
                }
                Some('/') => {
                    self.bump();
                    if self.peek() == Some('>') {
                        self.bump();
                        return Ok((attrs, true));
                    }
                    return Err(self.err("expected '>' after '/' in tag"));
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    let name = self.ident();
                    self.skip_ws();
                    if self.peek() == Some('=') {
                        self.bump();
                        self.skip_ws();
                        let quote = match self.peek() {
                            Some(q @ ('"' | '\'')) => {
                                self.bump();
                                q
                            }
                            _ => {
                                return Err(self.err(format!(
                                    "attribute '{name}' value must be quoted"
                                )))
                            }
                        };
                        let start = self.pos;
                        while self.peek().is_some_and(|c| c != quote) {
                            self.bump();
                        }
                        if self.peek().is_none() {
                            return Err(self.err(format!(
                                "unterminated value for attribute '{name}'"
                            )));
                        }
                        let value = self.input[start..self.pos].to_string();
                        self.bump();
                        attrs.insert(name, value);
                    } else {
                        // bare attribute
                        attrs.insert(name, String::new());
                    }
                }
                Some(other) => {
                    return Err(self.err(format!("unexpected '{other}' in tag")));
                }
                None => return Err(self.err("unterminated tag")),
            }
        }
    }
}

/// Parse an annotation snippet into an [`AnnotationTree`].
pub fn parse(input: &str) -> Result<AnnotationTree, VerificationError> {
    let mut scanner = Scanner {
        input,
        pos: 0,
        line: 1,
    };
    let mut doc_text = String::new();
    let mut roots: Vec<Element> = Vec::new();
    // open element stack
    let mut open: Vec<Element> = Vec::new();

    fn push_text(open: &mut [Element], doc_text: &mut String, text: &str) {
        doc_text.push_str(text);
        for element in open.iter_mut() {
            element.text.push_str(text);
        }
    }

    fn close_into(open: &mut Vec<Element>, roots: &mut Vec<Element>) {
        if let Some(done) = open.pop() {
            match open.last_mut() {
                Some(parent) => parent.children.push(done),
                None => roots.push(done),
            }
        }
    }

    while let Some(c) = scanner.peek() {
        if c != '<' {
            let start = scanner.pos;
            while scanner.peek().is_some_and(|c| c != '<') {
                scanner.bump();
            }
            push_text(&mut open, &mut doc_text, &scanner.input[start..scanner.pos]);
            continue;
        }

        // At '<': look ahead to decide between a tag and literal text.
        let rest = &scanner.input[scanner.pos + 1..];
        let mut chars = rest.chars();
        match chars.next() {
            Some('/') => {
                scanner.bump();
                scanner.bump();
                let name = scanner.ident();
                scanner.skip_ws();
                if scanner.peek() == Some('>') {
                    scanner.bump();
                } else {
                    return Err(scanner.err(format!("malformed closing tag '</{name}'")));
                }
                // close up to the matching open element; ignore stray closers
                if open.iter().any(|e| e.name == name) {
                    while let Some(top) = open.last() {
                        let matched = top.name == name;
                        close_into(&mut open, &mut roots);
                        if matched {
                            break;
                        }
                    }
                }
            }
            Some(c2) if c2.is_ascii_alphabetic() || c2 == '_' => {
                scanner.bump();
                let name = scanner.ident();
                let (attrs, self_closing) = scanner.tag_rest()?;
                let element = Element {
                    name,
                    attrs,
                    text: String::new(),
                    children: Vec::new(),
                };
                if self_closing {
                    match open.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => roots.push(element),
                    }
                } else {
                    open.push(element);
                }
            }
            _ => {
                // literal '<' in prose
                scanner.bump();
                push_text(&mut open, &mut doc_text, "<");
            }
        }
    }

    // implicitly close anything left open
    while !open.is_empty() {
        close_into(&mut open, &mut roots);
    }

    let tree = AnnotationTree {
        roots,
        text: doc_text,
    };
    tracing::debug!(
        elements = tree.all_elements().len(),
        "parsed annotation snippet"
    );
    Ok(tree)
}
