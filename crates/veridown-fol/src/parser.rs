//! Recursive-descent parser for first-order formulas.
//!
//! Accepted notation (ASCII with unicode alternatives):
//! `->` / `→`, `<->` / `↔`, `&` / `∧`, `|` / `∨`, `-` / `not` / `¬`,
//! `all x.(…)` / `∀x.(…)`, `exists x.(…)` / `∃x.(…)`, `F(x,y)`, `p`.

use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, opt, preceded, separated};
use winnow::error::{ContextError, ErrMode};
use winnow::token::{literal, take_while};
use winnow::{ModalResult, Parser};

use veridown_types::VerificationError;

use crate::syntax::Formula;

fn ws<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    multispace0.parse_next(input)
}

fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn atom(input: &mut &str) -> ModalResult<Formula> {
    let pred = identifier.parse_next(input)?;
    let args: Option<Vec<&str>> = opt(delimited(
        ('(', ws),
        separated(1.., preceded(ws, identifier), (ws, ',')),
        (ws, ')'),
    ))
    .parse_next(input)?;
    Ok(Formula::Atom {
        pred: pred.to_string(),
        args: args
            .unwrap_or_default()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// Parse one of the word keywords with a proper word boundary, so that
/// identifiers like `allowed` or `note` stay atoms.
fn word_keyword<'i>(
    keywords: &'static [&'static str],
) -> impl FnMut(&mut &'i str) -> ModalResult<&'static str> {
    move |input: &mut &'i str| {
        let checkpoint = *input;
        let word = identifier.parse_next(input)?;
        match keywords.iter().find(|kw| **kw == word) {
            Some(kw) => Ok(kw),
            None => {
                *input = checkpoint;
                Err(ErrMode::Backtrack(ContextError::new()))
            }
        }
    }
}

fn quantified(input: &mut &str) -> ModalResult<Formula> {
    let quantifier = alt((
        word_keyword(&["all", "forall"]).value("all"),
        literal("∀").value("all"),
        word_keyword(&["exists"]).value("exists"),
        literal("∃").value("exists"),
    ))
    .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let var = identifier.parse_next(input)?;
    let _ = (ws, '.', ws).parse_next(input)?;
    let body = unary.parse_next(input)?;
    Ok(match quantifier {
        "all" => Formula::All(var.to_string(), Box::new(body)),
        _ => Formula::Exists(var.to_string(), Box::new(body)),
    })
}

fn parenthesized(input: &mut &str) -> ModalResult<Formula> {
    delimited(('(', ws), formula, (ws, ')')).parse_next(input)
}

fn negation(input: &mut &str) -> ModalResult<Formula> {
    let _ = alt((
        word_keyword(&["not"]).void(),
        literal("¬").void(),
        literal("-").void(),
        literal("!").void(),
    ))
    .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let inner = unary.parse_next(input)?;
    Ok(Formula::not(inner))
}

fn unary(input: &mut &str) -> ModalResult<Formula> {
    let _ = ws.parse_next(input)?;
    // `all`/`exists`/`not` are keywords, but only when not a predicate call:
    // `all x.…` is followed by an identifier and a dot, `allowed` is not.
    alt((quantified, negation, parenthesized, atom)).parse_next(input)
}

fn conjunction(input: &mut &str) -> ModalResult<Formula> {
    let first = unary.parse_next(input)?;
    let mut acc = first;
    loop {
        let _ = ws.parse_next(input)?;
        if opt(alt((literal("&"), literal("∧"), literal("/\\"))))
            .parse_next(input)?
            .is_none()
        {
            break;
        }
        let next = unary.parse_next(input)?;
        acc = Formula::And(Box::new(acc), Box::new(next));
    }
    Ok(acc)
}

fn disjunction(input: &mut &str) -> ModalResult<Formula> {
    let first = conjunction.parse_next(input)?;
    let mut acc = first;
    loop {
        let _ = ws.parse_next(input)?;
        if opt(alt((literal("|"), literal("∨"), literal("\\/"))))
            .parse_next(input)?
            .is_none()
        {
            break;
        }
        let next = conjunction.parse_next(input)?;
        acc = Formula::Or(Box::new(acc), Box::new(next));
    }
    Ok(acc)
}

/// Implication is right-associative: `a -> b -> c` is `a -> (b -> c)`.
fn implication(input: &mut &str) -> ModalResult<Formula> {
    let antecedent = disjunction.parse_next(input)?;
    let _ = ws.parse_next(input)?;
    if opt(alt((literal("->"), literal("→")))).parse_next(input)?.is_some() {
        let consequent = implication.parse_next(input)?;
        return Ok(Formula::Implies(Box::new(antecedent), Box::new(consequent)));
    }
    Ok(antecedent)
}

fn formula(input: &mut &str) -> ModalResult<Formula> {
    let first = implication.parse_next(input)?;
    let mut acc = first;
    loop {
        let _ = ws.parse_next(input)?;
        if opt(alt((literal("<->"), literal("↔"))))
            .parse_next(input)?
            .is_none()
        {
            break;
        }
        let next = implication.parse_next(input)?;
        acc = Formula::Iff(Box::new(acc), Box::new(next));
    }
    Ok(acc)
}

/// Parse a formalization string into a [`Formula`].
pub fn parse(input: &str) -> Result<Formula, VerificationError> {
    let mut remaining = input.trim();
    if remaining.is_empty() {
        return Err(VerificationError::Verification(
            "empty formalization".to_string(),
        ));
    }
    let parsed = formula.parse_next(&mut remaining).map_err(|e| {
        VerificationError::Verification(format!("cannot parse formula '{input}': {e}"))
    })?;
    let remaining = remaining.trim();
    if !remaining.is_empty() {
        return Err(VerificationError::Verification(format!(
            "cannot parse formula '{input}': trailing content '{remaining}'"
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propositional_connectives() {
        assert_eq!(parse("p & q").unwrap().to_string(), "(p & q)");
        assert_eq!(parse("p | q").unwrap().to_string(), "(p | q)");
        assert_eq!(parse("p -> q").unwrap().to_string(), "(p -> q)");
        assert_eq!(parse("p <-> q").unwrap().to_string(), "(p <-> q)");
        assert_eq!(parse("-p").unwrap().to_string(), "-p");
        assert_eq!(parse("not p").unwrap().to_string(), "-p");
    }

    #[test]
    fn precedence_and_grouping() {
        // & binds tighter than |, | tighter than ->
        assert_eq!(parse("p & q | r").unwrap().to_string(), "((p & q) | r)");
        assert_eq!(parse("p | q -> r").unwrap().to_string(), "((p | q) -> r)");
        assert_eq!(parse("(p | q) & r").unwrap().to_string(), "((p | q) & r)");
    }

    #[test]
    fn implication_is_right_associative() {
        assert_eq!(parse("p -> q -> r").unwrap().to_string(), "(p -> (q -> r))");
    }

    #[test]
    fn quantifiers_and_predicates() {
        let f = parse("all x.(F(x) -> G(x))").unwrap();
        assert_eq!(f.to_string(), "all x.(F(x) -> G(x))");
        let f = parse("exists y.(F(y) & G(y,a))").unwrap();
        assert_eq!(f.to_string(), "exists y.(F(y) & G(y,a))");
    }

    #[test]
    fn unicode_spellings() {
        assert_eq!(parse("p ∧ q").unwrap(), parse("p & q").unwrap());
        assert_eq!(parse("p ∨ q").unwrap(), parse("p | q").unwrap());
        assert_eq!(parse("p → q").unwrap(), parse("p -> q").unwrap());
        assert_eq!(parse("¬p").unwrap(), parse("-p").unwrap());
        assert_eq!(parse("∀x.F(x)").unwrap(), parse("all x.F(x)").unwrap());
    }

    #[test]
    fn identifier_starting_with_keyword_is_an_atom() {
        assert_eq!(parse("allowed").unwrap().to_string(), "allowed");
        assert_eq!(parse("note").unwrap().to_string(), "note");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("p &").is_err());
        assert!(parse("(p -> q").is_err());
        assert!(parse("p q").is_err());
    }
}
