//! Parser for inline data maps: `{from: ["1", "2"], veracity: true}`.
//!
//! The notation is YAML flow style as it appears in Argdown snippets: bare
//! keys, values that are quoted strings (single or double quotes), lists,
//! numbers, booleans, or bare scalars.

use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, opt, separated};
use winnow::token::{literal, take_while};
use winnow::{ModalResult, Parser};

use crate::ast::DataMap;

fn ws<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    multispace0.parse_next(input)
}

/// Parse a bare key: [A-Za-z_][A-Za-z0-9_-]*
fn bare_key<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    )
        .take()
        .parse_next(input)
}

/// Parse a quoted string with either quote character. No escape handling;
/// inline data values in practice never contain quotes.
fn quoted_string(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_while(0.., |c| c != '"'), '"'),
        delimited('\'', take_while(0.., |c| c != '\''), '\''),
    ))
    .map(|s: &str| s.to_string())
    .parse_next(input)
}

fn list_value(input: &mut &str) -> ModalResult<serde_json::Value> {
    let items: Vec<serde_json::Value> = delimited(
        ('[', ws),
        separated(0.., scalar_value, (ws, ',', ws)),
        (ws, opt(','), ws, ']'),
    )
    .parse_next(input)?;
    Ok(serde_json::Value::Array(items))
}

/// A bare scalar: anything up to a delimiter, trimmed. Numbers and booleans
/// are recognized; everything else stays a string.
fn bare_scalar(input: &mut &str) -> ModalResult<serde_json::Value> {
    let raw: &str =
        take_while(1.., |c: char| !matches!(c, ',' | '}' | ']' | '\n')).parse_next(input)?;
    let raw = raw.trim();
    if raw == "true" {
        return Ok(serde_json::Value::Bool(true));
    }
    if raw == "false" {
        return Ok(serde_json::Value::Bool(false));
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(serde_json::json!(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Ok(serde_json::json!(f));
    }
    Ok(serde_json::Value::String(raw.to_string()))
}

fn scalar_value(input: &mut &str) -> ModalResult<serde_json::Value> {
    alt((quoted_string.map(serde_json::Value::String), bare_scalar)).parse_next(input)
}

fn map_value(input: &mut &str) -> ModalResult<serde_json::Value> {
    let map = data_map.parse_next(input)?;
    Ok(serde_json::Value::Object(map.into_iter().collect()))
}

fn value(input: &mut &str) -> ModalResult<serde_json::Value> {
    alt((map_value, list_value, scalar_value)).parse_next(input)
}

fn entry(input: &mut &str) -> ModalResult<(String, serde_json::Value)> {
    let key = alt((quoted_string, bare_key.map(str::to_string))).parse_next(input)?;
    let _ = (ws, ':', ws).parse_next(input)?;
    let val = value.parse_next(input)?;
    Ok((key, val))
}

fn data_map(input: &mut &str) -> ModalResult<DataMap> {
    let entries: Vec<(String, serde_json::Value)> = delimited(
        ('{', ws),
        separated(0.., entry, (ws, ',', ws)),
        (ws, opt(','), ws, '}'),
    )
    .parse_next(input)?;
    Ok(entries.into_iter().collect())
}

/// Parse a brace-delimited inline data map. The input must start at `{`.
pub fn parse_data_map(input: &str) -> Result<DataMap, String> {
    let mut remaining = input.trim();
    let map = data_map
        .parse_next(&mut remaining)
        .map_err(|e| format!("malformed inline data: {e}"))?;
    if !remaining.trim().is_empty() {
        return Err(format!("trailing content after inline data: '{remaining}'"));
    }
    Ok(map)
}

/// Split a statement line into its text and an optional trailing `{…}` map.
///
/// The brace scan starts from the end of the line so braces inside quoted
/// text do not confuse it.
pub fn split_trailing_data(line: &str) -> (String, Option<&str>) {
    let trimmed = line.trim_end();
    if !trimmed.ends_with('}') {
        return (trimmed.to_string(), None);
    }
    // walk backwards to the matching opening brace
    let bytes = trimmed.as_bytes();
    let mut depth = 0usize;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b'}' => depth += 1,
            b'{' => {
                depth -= 1;
                if depth == 0 {
                    let text = trimmed[..i].trim_end().to_string();
                    return (text, Some(&trimmed[i..]));
                }
            }
            _ => {}
        }
    }
    (trimmed.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map() {
        let map = parse_data_map("{}").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn quoted_lists_and_scalars() {
        let map = parse_data_map(r#"{from: ["1", '2'], n: 3, ok: true}"#).unwrap();
        assert_eq!(map["from"], serde_json::json!(["1", "2"]));
        assert_eq!(map["n"], serde_json::json!(3));
        assert_eq!(map["ok"], serde_json::json!(true));
    }

    #[test]
    fn single_quoted_values() {
        let map = parse_data_map("{from: ['1']}").unwrap();
        assert_eq!(map["from"], serde_json::json!(["1"]));
    }

    #[test]
    fn empty_list() {
        let map = parse_data_map("{annotation_ids: []}").unwrap();
        assert_eq!(map["annotation_ids"], serde_json::json!([]));
    }

    #[test]
    fn bare_string_value() {
        let map = parse_data_map("{formalization: p -> q}").unwrap();
        assert_eq!(map["formalization"], serde_json::json!("p -> q"));
    }

    #[test]
    fn nested_quotes_keep_arrow_text() {
        let map = parse_data_map(r#"{formalization: "all x.(F(x) -> G(x))"}"#).unwrap();
        assert_eq!(map["formalization"], serde_json::json!("all x.(F(x) -> G(x))"));
    }

    #[test]
    fn nested_map_values() {
        let map = parse_data_map(
            r#"{formalization: "F(a)", declarations: {a: "Socrates", F: "is mortal"}}"#,
        )
        .unwrap();
        assert_eq!(map["declarations"]["a"], serde_json::json!("Socrates"));
        assert_eq!(map["declarations"]["F"], serde_json::json!("is mortal"));
    }

    #[test]
    fn malformed_map_is_an_error() {
        assert!(parse_data_map("{from: [").is_err());
        assert!(parse_data_map("{from: ['1']} extra").is_err());
    }

    #[test]
    fn split_trailing_data_basic() {
        let (text, data) = split_trailing_data("P. {annotation_ids: ['i1']}");
        assert_eq!(text, "P.");
        assert_eq!(data, Some("{annotation_ids: ['i1']}"));
    }

    #[test]
    fn split_trailing_data_without_map() {
        let (text, data) = split_trailing_data("Just text.");
        assert_eq!(text, "Just text.");
        assert!(data.is_none());
    }

    #[test]
    fn split_trailing_data_nested_braces() {
        let (text, data) = split_trailing_data("X {meta: {inner: 1}}");
        assert_eq!(text, "X");
        assert_eq!(data, Some("{meta: {inner: 1}}"));
    }
}
