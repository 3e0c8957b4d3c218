//! Deck equation tokenisation: turns a cell card's logical-expression text into a
//! [`LogicalExpression<i32>`] over resolved surface ids.
//!
//! Grounded on `original_source/core/formula/logical/lpolynomial.hpp`'s `fromString`:
//! recursively resolve a leading `#(...)` complement group via its own parse +
//! [`LogicalExpression::complement`], then split the remaining text on `:` (OR) at
//! bracket-depth zero, and within each OR term split on whitespace (AND) at depth zero,
//! recursing into parenthesised sub-expressions.

use crate::error::{GeomError, Location};
use crate::logic::LogicalExpression;

/// Parses `text` (deck equation syntax: `' '`=AND, `:`=OR, `#(...)`=complement,
/// `(...)`=grouping, signed integers or surface-name tokens as factors) into an
/// expression over resolved surface ids, using `name_to_id` to resolve each token.
pub fn parse_equation(
    text: &str,
    name_to_id: &impl Fn(&str) -> Option<i32>,
) -> Result<LogicalExpression<i32>, GeomError> {
    let tokens = tokenize(text)?;
    let (expr, rest) = parse_or(&tokens, name_to_id, text)?;
    if !rest.is_empty() {
        return Err(GeomError::InvalidEquation {
            text: text.to_string(),
            location: Location::unknown(),
            hint: "unexpected trailing tokens after a complete expression",
        });
    }
    Ok(expr)
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Factor(String),
    Colon,
    Complement,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<Token>, GeomError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            ':' => {
                tokens.push(Token::Colon);
                chars.next();
            }
            '#' => {
                tokens.push(Token::Complement);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            _ => {
                let mut factor = String::new();
                if c == '-' || c == '+' {
                    factor.push(c);
                    chars.next();
                }
                while let Some(&c2) = chars.peek() {
                    if c2.is_whitespace() || matches!(c2, ':' | '#' | '(' | ')') {
                        break;
                    }
                    factor.push(c2);
                    chars.next();
                }
                if factor.is_empty() || factor == "-" || factor == "+" {
                    return Err(GeomError::InvalidEquation {
                        text: text.to_string(),
                        location: Location::unknown(),
                        hint: "empty factor token",
                    });
                }
                tokens.push(Token::Factor(factor));
            }
        }
    }
    Ok(tokens)
}

/// `or_term (: or_term)*`
fn parse_or<'a>(
    tokens: &'a [Token],
    name_to_id: &impl Fn(&str) -> Option<i32>,
    original: &str,
) -> Result<(LogicalExpression<i32>, &'a [Token]), GeomError> {
    let (mut expr, mut rest) = parse_and(tokens, name_to_id, original)?;
    let mut terms = vec![expr];
    while let Some(Token::Colon) = rest.first() {
        let (next, remaining) = parse_and(&rest[1..], name_to_id, original)?;
        terms.push(next);
        rest = remaining;
    }
    expr = if terms.len() == 1 {
        terms.pop().unwrap()
    } else {
        LogicalExpression::or_of(terms)
    };
    Ok((expr, rest))
}

/// `factor+` (implicit AND by juxtaposition, stopping at `:` or a closing paren)
fn parse_and<'a>(
    tokens: &'a [Token],
    name_to_id: &impl Fn(&str) -> Option<i32>,
    original: &str,
) -> Result<(LogicalExpression<i32>, &'a [Token]), GeomError> {
    let mut terms = Vec::new();
    let mut rest = tokens;
    loop {
        match rest.first() {
            Some(Token::Factor(_)) | Some(Token::Complement) | Some(Token::LParen) => {
                let (term, remaining) = parse_factor(rest, name_to_id, original)?;
                terms.push(term);
                rest = remaining;
            }
            _ => break,
        }
    }
    if terms.is_empty() {
        return Err(GeomError::InvalidEquation {
            text: original.to_string(),
            location: Location::unknown(),
            hint: "expected at least one factor",
        });
    }
    Ok((LogicalExpression::and_of(terms), rest))
}

/// A single factor: a signed id/name, a `#(...)` complement group, or a parenthesised
/// sub-expression.
fn parse_factor<'a>(
    tokens: &'a [Token],
    name_to_id: &impl Fn(&str) -> Option<i32>,
    original: &str,
) -> Result<(LogicalExpression<i32>, &'a [Token]), GeomError> {
    match tokens.first() {
        Some(Token::Factor(name)) => {
            let id = resolve(name, name_to_id, original)?;
            Ok((LogicalExpression::factor(id), &tokens[1..]))
        }
        Some(Token::Complement) => {
            let rest = &tokens[1..];
            if rest.first() != Some(&Token::LParen) {
                return Err(GeomError::InvalidEquation {
                    text: original.to_string(),
                    location: Location::unknown(),
                    hint: "`#` must be followed by a parenthesised group",
                });
            }
            let (inner, after) = parse_paren(rest, name_to_id, original)?;
            Ok((inner.complement(), after))
        }
        Some(Token::LParen) => parse_paren(tokens, name_to_id, original),
        _ => Err(GeomError::InvalidEquation {
            text: original.to_string(),
            location: Location::unknown(),
            hint: "expected a factor, `#(...)`, or `(...)`",
        }),
    }
}

fn parse_paren<'a>(
    tokens: &'a [Token],
    name_to_id: &impl Fn(&str) -> Option<i32>,
    original: &str,
) -> Result<(LogicalExpression<i32>, &'a [Token]), GeomError> {
    assert_eq!(tokens.first(), Some(&Token::LParen));
    let (inner, rest) = parse_or(&tokens[1..], name_to_id, original)?;
    match rest.first() {
        Some(Token::RParen) => Ok((inner, &rest[1..])),
        _ => Err(GeomError::InvalidEquation {
            text: original.to_string(),
            location: Location::unknown(),
            hint: "unbalanced parentheses",
        }),
    }
}

fn resolve(
    token: &str,
    name_to_id: &impl Fn(&str) -> Option<i32>,
    _original: &str,
) -> Result<i32, GeomError> {
    if let Ok(n) = token.parse::<i32>() {
        return Ok(n);
    }
    name_to_id(token).ok_or_else(|| GeomError::UndefinedReference {
        name: token.to_string(),
        location: Location::unknown(),
        hint: "referenced surface is not registered",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(name: &str) -> Option<i32> {
        name.parse().ok()
    }

    #[test]
    fn simple_and_parses() {
        let e = parse_equation("1 -2 3", &ids).unwrap();
        assert_eq!(e.size(), 3);
    }

    #[test]
    fn or_splits_at_top_level() {
        let e = parse_equation("1 : 2", &ids).unwrap();
        match e {
            LogicalExpression::OrOf(terms) => assert_eq!(terms.len(), 2),
            _ => panic!("expected OrOf"),
        }
    }

    #[test]
    fn parenthesised_and_inside_or() {
        let e = parse_equation("(1 2):3", &ids).unwrap();
        match e {
            LogicalExpression::OrOf(terms) => assert_eq!(terms.len(), 2),
            _ => panic!("expected OrOf"),
        }
    }

    #[test]
    fn complement_group_parses() {
        let e = parse_equation("#(1 2)", &ids).unwrap();
        match e {
            LogicalExpression::OrOf(terms) => assert_eq!(terms.len(), 2),
            _ => panic!("expected OrOf from complemented AND"),
        }
    }

    #[test]
    fn unbalanced_parens_is_an_error() {
        let err = parse_equation("(1 2", &ids);
        assert!(matches!(err, Err(GeomError::InvalidEquation { .. })));
    }

    #[test]
    fn undefined_name_is_reported() {
        let err = parse_equation("topPlane", &|_| None);
        assert!(matches!(err, Err(GeomError::UndefinedReference { .. })));
    }
}
