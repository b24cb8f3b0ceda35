// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The `An+B` microsyntax (spec §4.6), e.g. `2n+1`, `odd`, `-n+3`, `2n + 1`.

use crate::error::{SyntaxError, TextPos};
use crate::token::{AnPlusB, Token};
use crate::token_source::TokenSource;

/// Parses an `An+B` value from a token stream.
///
/// Only the microsyntax itself, plus optional leading/trailing whitespace,
/// may appear: anything else is a syntax error. Token sources built from an
/// already-parsed component value list carry no source position, so errors
/// from this function always report `0:0`; only the tokenizer-backed entry
/// point can point at a real location.
pub(crate) fn parse<S: TokenSource>(source: &mut S) -> Result<AnPlusB, SyntaxError> {
    let mut p = Peekable::new(source);
    skip_whitespace(&mut p);

    let (a, b) = match p.next() {
        Token::Number { is_integer: true, value, .. } => (0, value as i32),
        Token::Dimension { is_integer: true, unit, value, .. } => {
            let a = value as i32;
            match classify_unit(&unit) {
                Some(UnitKind::Plain) => (a, trailing_b(&mut p)?),
                Some(UnitKind::Dash) => (a, -signless_suffix(&mut p)?),
                Some(UnitKind::DashDigits(d)) => (a, -d),
                None => return Err(err("unrecognized An+B dimension unit")),
            }
        }
        Token::Ident(ident) => {
            let lower = ident.to_ascii_lowercase();
            match lower.as_str() {
                "odd" => (2, 1),
                "even" => (2, 0),
                _ => {
                    let (sign, rest) =
                        if let Some(r) = lower.strip_prefix('-') { (-1, r) } else { (1, lower.as_str()) };
                    match classify_unit(rest) {
                        Some(UnitKind::Plain) => (sign, trailing_b(&mut p)?),
                        Some(UnitKind::Dash) => (sign, -signless_suffix(&mut p)?),
                        Some(UnitKind::DashDigits(d)) => (sign, -d),
                        None => return Err(err("unrecognized An+B identifier")),
                    }
                }
            }
        }
        Token::Delim('+') => match p.next() {
            Token::Ident(ident) => {
                let lower = ident.to_ascii_lowercase();
                match classify_unit(&lower) {
                    Some(UnitKind::Plain) => (1, trailing_b(&mut p)?),
                    Some(UnitKind::Dash) => (1, -signless_suffix(&mut p)?),
                    Some(UnitKind::DashDigits(d)) => (1, -d),
                    None => return Err(err("unrecognized An+B identifier after '+'")),
                }
            }
            _ => return Err(err("expected an identifier after '+'")),
        },
        _ => return Err(err("expected An+B syntax")),
    };

    skip_whitespace(&mut p);
    match p.next() {
        Token::Eof => Ok(AnPlusB { a, b }),
        _ => Err(err("unexpected content after An+B value")),
    }
}

enum UnitKind {
    /// Exactly `n`.
    Plain,
    /// Exactly `n-`, requiring a following signless integer.
    Dash,
    /// `n-` directly followed by one or more digits, e.g. `n-3`.
    DashDigits(i32),
}

fn classify_unit(unit: &str) -> Option<UnitKind> {
    if unit.eq_ignore_ascii_case("n") {
        return Some(UnitKind::Plain);
    }
    let digits = unit.strip_prefix("n-").or_else(|| unit.strip_prefix("N-"))?;
    if digits.is_empty() {
        Some(UnitKind::Dash)
    } else if digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok().map(UnitKind::DashDigits)
    } else {
        None
    }
}

/// After a bare `n` (dimension unit or identifier, sign already folded into
/// `a`), an optional B follows: either a signed integer token glued on with
/// no whitespace (`2n+1`), or a `+`/`-` (itself either glued on, as in
/// `2n+ 1`, or separated by whitespace, as in `2n + 1`) followed by optional
/// whitespace and a signless integer, or nothing at all (`n`, B defaults to
/// 0). "Skip ws" is unconditional before this dispatch, so whitespace may or
/// may not precede the sign/number token regardless of which form it is.
fn trailing_b<S: TokenSource>(p: &mut Peekable<S>) -> Result<i32, SyntaxError> {
    if p.peek() == Token::Whitespace {
        p.next();
    }

    match p.next() {
        Token::Eof => Ok(0),
        Token::Number { is_integer: true, repr, value, .. } if starts_with_sign(&repr) => Ok(value as i32),
        Token::Delim(sign @ ('+' | '-')) => {
            skip_whitespace(p);
            let b = signless_suffix(p)?;
            Ok(if sign == '-' { -b } else { b })
        }
        _ => Err(err("unexpected content after An+B value")),
    }
}

fn signless_suffix<S: TokenSource>(p: &mut Peekable<S>) -> Result<i32, SyntaxError> {
    skip_whitespace(p);
    match p.next() {
        Token::Number { is_integer: true, repr, value, .. } if !starts_with_sign(&repr) => Ok(value as i32),
        _ => Err(err("expected a signless integer")),
    }
}

fn starts_with_sign(repr: &str) -> bool {
    repr.starts_with('+') || repr.starts_with('-')
}

fn skip_whitespace<S: TokenSource>(p: &mut Peekable<S>) {
    while p.peek() == Token::Whitespace {
        p.next();
    }
}

fn err(message: &'static str) -> SyntaxError {
    SyntaxError { message, pos: TextPos::new(0, 0) }
}

/// One token of lookahead over a `TokenSource`, which otherwise only
/// supports strict consumption.
struct Peekable<'s, S: TokenSource> {
    source: &'s mut S,
    buffered: Option<Token>,
}

impl<'s, S: TokenSource> Peekable<'s, S> {
    fn new(source: &'s mut S) -> Self {
        Peekable { source, buffered: None }
    }

    fn peek(&mut self) -> Token {
        if self.buffered.is_none() {
            self.buffered = Some(self.source.next_token());
        }
        self.buffered.clone().unwrap()
    }

    fn next(&mut self) -> Token {
        self.buffered.take().unwrap_or_else(|| self.source.next_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_source::TokenizerSource;

    fn parse_str(src: &str) -> Result<AnPlusB, SyntaxError> {
        let mut source = TokenizerSource::new(src);
        parse(&mut source)
    }

    #[test]
    fn plain_integer_is_a_zero() {
        assert_eq!(parse_str("3").unwrap(), AnPlusB { a: 0, b: 3 });
        assert_eq!(parse_str("-3").unwrap(), AnPlusB { a: 0, b: -3 });
    }

    #[test]
    fn odd_and_even_keywords() {
        assert_eq!(parse_str("odd").unwrap(), AnPlusB { a: 2, b: 1 });
        assert_eq!(parse_str("EVEN").unwrap(), AnPlusB { a: 2, b: 0 });
    }

    #[test]
    fn bare_n_and_signed_n() {
        assert_eq!(parse_str("n").unwrap(), AnPlusB { a: 1, b: 0 });
        assert_eq!(parse_str("-n").unwrap(), AnPlusB { a: -1, b: 0 });
    }

    #[test]
    fn glued_dimension_and_signed_number() {
        assert_eq!(parse_str("2n+1").unwrap(), AnPlusB { a: 2, b: 1 });
        assert_eq!(parse_str("-2n-3").unwrap(), AnPlusB { a: -2, b: -3 });
    }

    #[test]
    fn whitespace_separated_sign_and_signless_integer() {
        assert_eq!(parse_str("2n + 1").unwrap(), AnPlusB { a: 2, b: 1 });
        assert_eq!(parse_str("2n - 1").unwrap(), AnPlusB { a: 2, b: -1 });
    }

    #[test]
    fn sign_glued_to_n_with_space_before_the_integer() {
        assert_eq!(parse_str("2n+ 1").unwrap(), AnPlusB { a: 2, b: 1 });
        assert_eq!(parse_str("n+ 5").unwrap(), AnPlusB { a: 1, b: 5 });
    }

    #[test]
    fn dash_suffix_forms() {
        assert_eq!(parse_str("n-3").unwrap(), AnPlusB { a: 1, b: -3 });
        assert_eq!(parse_str("-n-3").unwrap(), AnPlusB { a: -1, b: -3 });
        assert_eq!(parse_str("3n-1").unwrap(), AnPlusB { a: 3, b: -1 });
    }

    #[test]
    fn dash_form_requires_following_signless_integer() {
        assert_eq!(parse_str("n- 3").unwrap(), AnPlusB { a: 1, b: -3 });
        assert!(parse_str("n-").is_err());
        assert!(parse_str("n- +3").is_err());
    }

    #[test]
    fn whitespace_around_value_is_allowed() {
        assert_eq!(parse_str("  odd  ").unwrap(), AnPlusB { a: 2, b: 1 });
    }

    #[test]
    fn plus_then_ident_form() {
        assert_eq!(parse_str("+n").unwrap(), AnPlusB { a: 1, b: 0 });
    }

    #[test]
    fn whitespace_between_leading_plus_and_ident_is_a_syntax_error() {
        assert!(parse_str("+ n").is_err());
    }

    #[test]
    fn trailing_garbage_is_a_syntax_error() {
        assert!(parse_str("3x").is_err());
        assert!(parse_str("odd even").is_err());
    }
}
