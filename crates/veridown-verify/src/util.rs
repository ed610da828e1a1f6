//! Small text helpers shared by the check families.

/// Collapse all whitespace runs to single spaces and trim.
pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove all whitespace.
pub fn strip_ws(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Shorten a text for diagnostic messages: collapse whitespace, then cut at
/// a word boundary and append an ellipsis when over `width`.
pub fn shorten(text: &str, width: usize) -> String {
    let collapsed = collapse_ws(text);
    if collapsed.chars().count() <= width {
        return collapsed;
    }
    let budget = width.saturating_sub(4);
    let mut cut = String::new();
    for word in collapsed.split(' ') {
        let candidate_len = if cut.is_empty() {
            word.chars().count()
        } else {
            cut.chars().count() + 1 + word.chars().count()
        };
        if candidate_len > budget {
            break;
        }
        if !cut.is_empty() {
            cut.push(' ');
        }
        cut.push_str(word);
    }
    if cut.is_empty() {
        cut = collapsed.chars().take(budget).collect();
    }
    format!("{cut} ...")
}

/// First-seen-order deduplication of labels that occur more than once.
pub fn duplicates(items: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if items.iter().filter(|other| *other == item).count() > 1 && !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_and_strip() {
        assert_eq!(collapse_ws("a\n  b\tc "), "a b c");
        assert_eq!(strip_ws("a b\nc"), "abc");
    }

    #[test]
    fn shorten_keeps_short_text() {
        assert_eq!(shorten("short text", 40), "short text");
    }

    #[test]
    fn shorten_cuts_at_word_boundary() {
        let out = shorten("one two three four five six seven", 18);
        assert!(out.ends_with(" ..."), "got: {out}");
        assert!(out.chars().count() <= 18);
    }

    #[test]
    fn duplicates_preserve_order() {
        let items: Vec<String> = ["a", "b", "a", "c", "b", "a"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(duplicates(&items), vec!["a".to_string(), "b".to_string()]);
    }
}
