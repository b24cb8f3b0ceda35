// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pull-based producer of one token per call against the `Stream` (spec
//! §4.3).

use log::warn;

use crate::cp;
use crate::error::TextPos;
use crate::stream::{CodePoint, Stream};
use crate::token::Token;

/// Consumes preprocessed code points and emits one `Token` per call.
pub struct Tokenizer {
    stream: Stream,
}

impl Tokenizer {
    /// Builds a tokenizer over raw source text.
    pub fn new(text: &str) -> Self {
        Tokenizer { stream: Stream::new(text) }
    }

    /// The position of the code point last produced by `next_token()`.
    pub(crate) fn text_pos(&self) -> TextPos {
        self.stream.text_pos()
    }

    /// Produces the next token.
    ///
    /// Once `Token::Eof` has been returned, every subsequent call returns
    /// `Token::Eof` again.
    pub fn next_token(&mut self) -> Token {
        self.consume_comments();

        match self.stream.consume() {
            Some(c) if cp::is_whitespace(c) => self.consume_whitespace(),
            Some('"') => self.consume_string('"'),
            Some('\'') => self.consume_string('\''),
            Some('#') => self.consume_hash_or_delim(),
            Some('(') => Token::LeftParen,
            Some(')') => Token::RightParen,
            Some(',') => Token::Comma,
            Some('+') => self.consume_plus_or_delim(),
            Some('-') => self.consume_minus_cdc_ident_or_delim(),
            Some('.') => self.consume_dot_or_delim(),
            Some(':') => Token::Colon,
            Some(';') => Token::Semicolon,
            Some('<') => self.consume_lt_cdo_or_delim(),
            Some('@') => self.consume_at_or_delim(),
            Some('[') => Token::LeftBracket,
            Some(']') => Token::RightBracket,
            Some('{') => Token::LeftBrace,
            Some('}') => Token::RightBrace,
            Some('\\') => self.consume_backslash_ident_or_delim(),
            Some(c) if cp::is_digit(c) => self.consume_numeric_token(c),
            Some(c) if cp::is_name_start(c) => self.consume_ident_like_token(c.to_string()),
            Some(c) => Token::Delim(c),
            None => Token::Eof,
        }
    }

    /// spec §4.3.1.
    ///
    /// A lone `/` immediately after `/*` does not satisfy the closer: the
    /// loop only stops once the *next* `*` is followed by `/`, so
    /// `/*/*/` is a single comment from the first `/*` to the final `*/`.
    fn consume_comments(&mut self) {
        loop {
            if self.stream.next2() != (Some('/'), Some('*')) {
                return;
            }
            self.stream.advance(2);

            loop {
                if !self.stream.advance_until('*', true) {
                    warn!("unterminated comment at {}", self.stream.text_pos());
                    return;
                }
                if self.stream.next() == Some('/') {
                    self.stream.advance(1);
                    break;
                }
            }
        }
    }

    fn consume_whitespace(&mut self) -> Token {
        while matches!(self.stream.next(), Some(c) if cp::is_whitespace(c)) {
            self.stream.advance(1);
        }
        Token::Whitespace
    }

    fn consume_hash_or_delim(&mut self) -> Token {
        let (n0, n1, n2) = self.stream.next3();
        let is_name_cp = matches!(n0, Some(c) if cp::is_name(c));
        let is_escape = is_valid_escape(n0, n1);

        if is_name_cp || is_escape {
            let is_id = would_start_identifier(n0, n1, n2);
            let value = self.consume_name();
            Token::Hash { value, is_id }
        } else {
            Token::Delim('#')
        }
    }

    fn consume_plus_or_delim(&mut self) -> Token {
        let (n0, n1, _n2) = self.stream.next3();
        if would_start_number(Some('+'), n0, n1) {
            self.consume_numeric_token('+')
        } else {
            Token::Delim('+')
        }
    }

    fn consume_minus_cdc_ident_or_delim(&mut self) -> Token {
        let (n0, n1, _n2) = self.stream.next3();
        if would_start_number(Some('-'), n0, n1) {
            self.consume_numeric_token('-')
        } else if (n0, n1) == (Some('-'), Some('>')) {
            self.stream.advance(2);
            Token::Cdc
        } else if would_start_identifier(Some('-'), n0, n1) {
            self.consume_ident_like_token("-".to_string())
        } else {
            Token::Delim('-')
        }
    }

    fn consume_dot_or_delim(&mut self) -> Token {
        let (n0, n1, _n2) = self.stream.next3();
        if would_start_number(Some('.'), n0, n1) {
            self.consume_numeric_token('.')
        } else {
            Token::Delim('.')
        }
    }

    fn consume_lt_cdo_or_delim(&mut self) -> Token {
        if self.stream.next3() == (Some('!'), Some('-'), Some('-')) {
            self.stream.advance(3);
            Token::Cdo
        } else {
            Token::Delim('<')
        }
    }

    fn consume_at_or_delim(&mut self) -> Token {
        let (n0, n1, n2) = self.stream.next3();
        if would_start_identifier(n0, n1, n2) {
            let name = self.consume_name();
            Token::AtKeyword(name)
        } else {
            Token::Delim('@')
        }
    }

    fn consume_backslash_ident_or_delim(&mut self) -> Token {
        if is_valid_escape(Some('\\'), self.stream.next()) {
            let first = self.consume_escaped_code_point();
            self.consume_ident_like_token(first.to_string())
        } else {
            warn!("invalid escape at {}", self.stream.text_pos());
            Token::Delim('\\')
        }
    }

    /// spec §4.3.2 / §4.3.12. `first` is the sign, digit or `.` that
    /// dispatch already consumed.
    fn consume_numeric_token(&mut self, first: char) -> Token {
        let (repr, value, is_integer) = self.consume_number(first);

        let (n0, n1, n2) = self.stream.next3();
        if would_start_identifier(n0, n1, n2) {
            let unit = self.consume_name();
            Token::Dimension { repr, unit, value, is_integer }
        } else if self.stream.next() == Some('%') {
            self.stream.advance(1);
            Token::Percentage { repr, value }
        } else {
            Token::Number { repr, value, is_integer }
        }
    }

    /// spec §4.3.12/§4.3.13. `first` (sign, digit or `.`) has already been
    /// consumed by the caller. Returns the consumed representation, its
    /// numeric value, and whether it was an integer representation.
    fn consume_number(&mut self, first: char) -> (String, f64, bool) {
        let mut repr = String::new();
        let mut is_integer = true;
        repr.push(first);

        if first != '.' {
            while matches!(self.stream.next(), Some(c) if cp::is_digit(c)) {
                repr.push(self.stream.consume().unwrap());
            }
        }

        if first == '.' {
            is_integer = false;
            while matches!(self.stream.next(), Some(c) if cp::is_digit(c)) {
                repr.push(self.stream.consume().unwrap());
            }
        } else if self.stream.next() == Some('.') && matches!(self.stream.next2().1, Some(c) if cp::is_digit(c)) {
            is_integer = false;
            repr.push(self.stream.consume().unwrap()); // '.'
            while matches!(self.stream.next(), Some(c) if cp::is_digit(c)) {
                repr.push(self.stream.consume().unwrap());
            }
        }

        if matches!(self.stream.next(), Some('e') | Some('E')) {
            let (_e, after_e, after_sign) = self.stream.next3();
            let exponent_digit_follows = match after_e {
                Some('+') | Some('-') => matches!(after_sign, Some(c) if cp::is_digit(c)),
                Some(c) if cp::is_digit(c) => true,
                _ => false,
            };

            if exponent_digit_follows {
                is_integer = false;
                repr.push(self.stream.consume().unwrap()); // 'e'/'E'
                if matches!(self.stream.next(), Some('+') | Some('-')) {
                    repr.push(self.stream.consume().unwrap());
                }
                while matches!(self.stream.next(), Some(c) if cp::is_digit(c)) {
                    repr.push(self.stream.consume().unwrap());
                }
            }
        }

        let value = repr.parse::<f64>().unwrap_or(0.0);
        (repr, value, is_integer)
    }

    /// spec §4.3.3. Produces the greatest run of name code points or valid
    /// escapes starting at the stream's current position, decoding escapes
    /// as it goes. Does not include any code point the caller already
    /// consumed (see `consume_ident_like_token` for that case).
    fn consume_name(&mut self) -> String {
        let mut out = String::new();
        loop {
            match self.stream.next() {
                Some(c) if cp::is_name(c) => {
                    out.push(c);
                    self.stream.advance(1);
                }
                n0 if is_valid_escape(n0, self.stream.next2().1) => {
                    self.stream.advance(1); // consume the backslash
                    out.push(self.consume_escaped_code_point());
                }
                _ => return out,
            }
        }
    }

    /// spec §4.3.4 (ident-like token: ident / function / url). `prefix` is
    /// whatever name content the caller already consumed and decoded (the
    /// name-start code point, a leading `-`, or a decoded leading escape).
    fn consume_ident_like_token(&mut self, prefix: String) -> Token {
        let mut name = prefix;
        name.push_str(&self.consume_name());

        if self.stream.next() != Some('(') {
            return Token::Ident(name);
        }
        self.stream.advance(1); // consume '('

        if !name.eq_ignore_ascii_case("url") {
            return Token::Function(name);
        }

        // While the next two code points are both whitespace, consume one.
        // This always leaves at most one whitespace code point unconsumed,
        // so that if we end up emitting Function("url") here, the ordinary
        // tokenizer loop produces a single Whitespace token for whatever
        // (possibly multi-code-point) run preceded the quote.
        while matches!(self.stream.next(), Some(c) if cp::is_whitespace(c))
            && matches!(self.stream.next2().1, Some(c) if cp::is_whitespace(c))
        {
            self.stream.advance(1);
        }

        let quote_follows = matches!(self.stream.next(), Some('"') | Some('\''))
            || (matches!(self.stream.next(), Some(c) if cp::is_whitespace(c))
                && matches!(self.stream.next2().1, Some('"') | Some('\'')));

        if quote_follows {
            Token::Function(name)
        } else {
            self.consume_url_token()
        }
    }

    /// spec §4.3.6 (consume a url token). Called with `url(` and any
    /// leading whitespace run (minus its last code point) already
    /// consumed.
    fn consume_url_token(&mut self) -> Token {
        let mut value = String::new();

        while matches!(self.stream.next(), Some(c) if cp::is_whitespace(c)) {
            self.stream.advance(1);
        }

        loop {
            match self.stream.consume() {
                Some(')') => return Token::Url(value),
                None => {
                    warn!("unterminated url() at {}", self.stream.text_pos());
                    return Token::Url(value);
                }
                Some(c) if cp::is_whitespace(c) => {
                    while matches!(self.stream.next(), Some(c) if cp::is_whitespace(c)) {
                        self.stream.advance(1);
                    }
                    match self.stream.next() {
                        Some(')') => {
                            self.stream.advance(1);
                            return Token::Url(value);
                        }
                        None => {
                            warn!("unterminated url() at {}", self.stream.text_pos());
                            return Token::Url(value);
                        }
                        _ => {
                            warn!("invalid url() at {}", self.stream.text_pos());
                            self.consume_bad_url_remnants();
                            return Token::BadUrl;
                        }
                    }
                }
                Some('"') | Some('\'') | Some('(') => {
                    warn!("invalid url() at {}", self.stream.text_pos());
                    self.consume_bad_url_remnants();
                    return Token::BadUrl;
                }
                Some(c) if cp::is_non_printable(c) => {
                    warn!("invalid url() at {}", self.stream.text_pos());
                    self.consume_bad_url_remnants();
                    return Token::BadUrl;
                }
                Some('\\') => {
                    if is_valid_escape(Some('\\'), self.stream.next()) {
                        value.push(self.consume_escaped_code_point());
                    } else {
                        warn!("invalid escape in url() at {}", self.stream.text_pos());
                        self.consume_bad_url_remnants();
                        return Token::BadUrl;
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    /// spec §4.3.4 "consume the remnants of a bad url".
    fn consume_bad_url_remnants(&mut self) {
        loop {
            match self.stream.consume() {
                Some(')') | None => return,
                Some('\\') if is_valid_escape(Some('\\'), self.stream.next()) => {
                    self.stream.advance(1);
                }
                _ => {}
            }
        }
    }

    /// spec §4.3.5 (string token).
    fn consume_string(&mut self, ending: char) -> Token {
        let mut value = String::new();
        loop {
            match self.stream.consume() {
                None => {
                    warn!("unterminated string at {}", self.stream.text_pos());
                    return Token::String(value);
                }
                Some(c) if c == ending => return Token::String(value),
                Some('\n') => {
                    warn!("unescaped newline in string at {}", self.stream.text_pos());
                    self.stream.reconsume();
                    return Token::BadString;
                }
                Some('\\') => match self.stream.next() {
                    None => {}
                    Some('\n') => {
                        self.stream.advance(1);
                    }
                    _ => value.push(self.consume_escaped_code_point()),
                },
                Some(c) => value.push(c),
            }
        }
    }

    /// spec §4.3.7 (consume an escaped code point). Assumes the leading
    /// `\` has already been consumed.
    fn consume_escaped_code_point(&mut self) -> char {
        match self.stream.consume() {
            Some(c) if cp::is_hex_digit(c) => {
                let mut hex = String::new();
                hex.push(c);
                while hex.len() < 6 {
                    match self.stream.next() {
                        Some(c) if cp::is_hex_digit(c) => {
                            hex.push(c);
                            self.stream.advance(1);
                        }
                        _ => break,
                    }
                }
                if matches!(self.stream.next(), Some(c) if cp::is_whitespace(c)) {
                    self.stream.advance(1);
                }

                let value = u32::from_str_radix(&hex, 16).unwrap_or(0);
                if value == 0 || cp::is_surrogate(value) || value > 0x10FFFF {
                    '\u{FFFD}'
                } else {
                    char::from_u32(value).unwrap_or('\u{FFFD}')
                }
            }
            Some(c) => c,
            None => {
                warn!("escape at end of input at {}", self.stream.text_pos());
                '\u{FFFD}'
            }
        }
    }
}

/// spec §4.3.7 "valid escape".
fn is_valid_escape(a: CodePoint, b: CodePoint) -> bool {
    a == Some('\\') && !matches!(b, Some('\n') | None)
}

/// spec §4.3.7 "would start an identifier".
fn would_start_identifier(a: CodePoint, b: CodePoint, c: CodePoint) -> bool {
    match a {
        Some('-') => matches!(b, Some(bc) if cp::is_name_start(bc)) || b == Some('-') || is_valid_escape(b, c),
        Some('\\') => is_valid_escape(a, b),
        Some(ac) => cp::is_name_start(ac),
        None => false,
    }
}

/// spec §4.3.7 "would start a number".
fn would_start_number(a: CodePoint, b: CodePoint, c: CodePoint) -> bool {
    match a {
        Some('+') | Some('-') => {
            matches!(b, Some(bc) if cp::is_digit(bc)) || (b == Some('.') && matches!(c, Some(cc) if cp::is_digit(cc)))
        }
        Some('.') => matches!(b, Some(bc) if cp::is_digit(bc)),
        Some(ac) => cp::is_digit(ac),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut t = Tokenizer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = t.next_token();
            let done = tok == Token::Eof;
            out.push(tok);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn hash_with_id_true_for_ident_like_name() {
        assert_eq!(tokens("#abc"), vec![Token::Hash { value: "abc".into(), is_id: true }, Token::Eof]);
    }

    #[test]
    fn hash_with_id_false_for_digit_led_name() {
        match &tokens("#123")[0] {
            Token::Hash { value, is_id } => {
                assert_eq!(value, "123");
                assert!(!is_id);
            }
            other => panic!("expected Hash, got {other:?}"),
        }
    }

    #[test]
    fn number_repr_preserves_source_text() {
        let toks = tokens("0.009");
        assert_eq!(toks[0], Token::Number { repr: "0.009".into(), value: 0.009, is_integer: false });

        let toks2 = tokens("9e-3");
        match &toks2[0] {
            Token::Number { repr, value, is_integer } => {
                assert_eq!(repr, "9e-3");
                assert!((value - 0.009).abs() < 1e-12);
                assert!(!is_integer);
            }
            other => panic!("expected Number, got {other:?}"),
        }
    }

    #[test]
    fn integer_flag_true_without_dot_or_exponent() {
        assert_eq!(tokens("42")[0], Token::Number { repr: "42".into(), value: 42.0, is_integer: true });
    }

    #[test]
    fn leading_dot_number_is_not_integer() {
        assert_eq!(tokens(".5")[0], Token::Number { repr: ".5".into(), value: 0.5, is_integer: false });
    }

    #[test]
    fn signed_number_keeps_sign_in_repr() {
        assert_eq!(tokens("-42")[0], Token::Number { repr: "-42".into(), value: -42.0, is_integer: true });
    }

    #[test]
    fn url_with_quote_after_whitespace_is_a_function_not_url_token() {
        let toks = tokens("url( \"x.png\" )");
        assert_eq!(
            toks,
            vec![
                Token::Function("url".into()),
                Token::Whitespace,
                Token::String("x.png".into()),
                Token::Whitespace,
                Token::RightParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn bare_url_is_tokenized_directly() {
        let toks = tokens("url(img.png)");
        assert_eq!(toks, vec![Token::Url("img.png".into()), Token::Eof]);
    }

    #[test]
    fn double_star_comment_closes_correctly() {
        assert_eq!(tokens("a/**/b"), vec![Token::Ident("a".into()), Token::Ident("b".into()), Token::Eof]);
    }

    #[test]
    fn overlapping_stars_comment_is_a_single_comment() {
        assert_eq!(tokens("/*/*/"), vec![Token::Eof]);
    }

    #[test]
    fn escaped_hex_decodes_to_code_point() {
        assert_eq!(tokens("\\41 ")[0], Token::Ident("A".into()));
    }

    #[test]
    fn escape_yielding_surrogate_or_overflow_becomes_replacement_char() {
        assert_eq!(tokens("\\d800 ")[0], Token::Ident("\u{FFFD}".into()));
        assert_eq!(tokens("\\110000 ")[0], Token::Ident("\u{FFFD}".into()));
    }

    #[test]
    fn unescaped_newline_in_string_is_bad_string_and_reconsumes_newline() {
        let mut t = Tokenizer::new("'abc\ndef'");
        assert_eq!(t.next_token(), Token::BadString);
        assert_eq!(t.next_token(), Token::Whitespace);
    }

    #[test]
    fn bad_url_skips_escaped_close_paren() {
        assert_eq!(tokens("url(a b\\))")[0], Token::BadUrl);
    }

    #[test]
    fn cdo_and_cdc() {
        assert_eq!(tokens("<!---->"), vec![Token::Cdo, Token::Cdc, Token::Eof]);
    }

    #[test]
    fn leading_minus_without_ident_or_number_is_delim() {
        assert_eq!(tokens("- ")[0], Token::Delim('-'));
    }

    #[test]
    fn leading_minus_followed_by_ident_chars_is_ident() {
        assert_eq!(tokens("-webkit-foo")[0], Token::Ident("-webkit-foo".into()));
    }

    #[test]
    fn escaped_first_code_point_of_ident_decodes_correctly() {
        assert_eq!(tokens("\\41 bc")[0], Token::Ident("Abc".into()));
    }
}
