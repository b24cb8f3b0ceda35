// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A token stream the parser can drive uniformly, whether it is produced
//! live by a `Tokenizer` or re-derived from an already-parsed list of
//! component values (spec §5.1: "parser entry points... conceptually
//! operate on a stream of tokens").

use crate::error::TextPos;
use crate::token::{BlockOpener, ComponentValue, Token};
use crate::tokenizer::Tokenizer;

/// Anything that can hand the parser one `Token` at a time.
///
/// Once exhausted, every implementation must keep returning `Token::Eof`
/// (mirroring `Tokenizer::next_token`'s own EOF-is-sticky contract).
pub trait TokenSource {
    fn next_token(&mut self) -> Token;

    /// The position of the last-produced token, for diagnostics.
    ///
    /// Sources with no natural notion of a source position (a re-flattened
    /// component value list) report `0:0`.
    fn position(&self) -> TextPos {
        TextPos::new(0, 0)
    }
}

/// The ordinary case: tokens produced on demand from source text.
pub struct TokenizerSource {
    tokenizer: Tokenizer,
}

impl TokenizerSource {
    pub fn new(text: &str) -> Self {
        TokenizerSource { tokenizer: Tokenizer::new(text) }
    }
}

impl TokenSource for TokenizerSource {
    fn next_token(&mut self) -> Token {
        self.tokenizer.next_token()
    }

    fn position(&self) -> TextPos {
        self.tokenizer.text_pos()
    }
}

/// One level of `ComponentValueSource`'s traversal: a slice still being
/// walked, and the token (if any) to emit once it's exhausted.
struct Frame<'a> {
    values: &'a [ComponentValue],
    index: usize,
    /// `None` only for the outermost frame, which has no closing token and
    /// instead yields `Eof` forever once exhausted.
    closer: Option<Token>,
}

/// Re-exposes an already-parsed `&[ComponentValue]` list as a flat token
/// stream, so the parser's recursive-descent algorithms (spec §5.4) can run
/// over a component-value list exactly as they would over fresh source
/// text. `Function` and `Block` values are split back into their opening
/// token, their contents (recursively), and a synthesized closing token.
pub struct ComponentValueSource<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> ComponentValueSource<'a> {
    pub fn new(values: &'a [ComponentValue]) -> Self {
        ComponentValueSource { stack: vec![Frame { values, index: 0, closer: None }] }
    }
}

impl<'a> TokenSource for ComponentValueSource<'a> {
    fn next_token(&mut self) -> Token {
        loop {
            let (values, index) = match self.stack.last() {
                Some(frame) => (frame.values, frame.index),
                None => return Token::Eof,
            };

            if index >= values.len() {
                if self.stack.len() == 1 {
                    return Token::Eof;
                }
                let frame = self.stack.pop().unwrap();
                return frame.closer.unwrap();
            }

            self.stack.last_mut().unwrap().index += 1;
            match &values[index] {
                ComponentValue::Token(t) => return t.clone(),
                ComponentValue::Function(f) => {
                    let name = f.name.clone();
                    self.stack.push(Frame { values: f.values.as_slice(), index: 0, closer: Some(Token::RightParen) });
                    return Token::Function(name);
                }
                ComponentValue::Block(b) => {
                    let opener = b.opener.opening_token();
                    let closer = Token::matching_closer(b.opener);
                    self.stack.push(Frame { values: b.values.as_slice(), index: 0, closer: Some(closer) });
                    return opener;
                }
            }
        }
    }
}

/// Lets the nine public entry points (spec §5.4) accept either raw source
/// text or an already-parsed component value list, generically.
pub trait IntoTokenSource<'a> {
    type Source: TokenSource;
    fn into_token_source(self) -> Self::Source;
}

impl<'a> IntoTokenSource<'a> for &'a str {
    type Source = TokenizerSource;
    fn into_token_source(self) -> TokenizerSource {
        TokenizerSource::new(self)
    }
}

impl<'a> IntoTokenSource<'a> for &'a [ComponentValue] {
    type Source = ComponentValueSource<'a>;
    fn into_token_source(self) -> ComponentValueSource<'a> {
        ComponentValueSource::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Function, SimpleBlock};

    #[test]
    fn tokenizer_source_forwards_tokens() {
        let mut src = TokenizerSource::new("a b");
        assert_eq!(src.next_token(), Token::Ident("a".into()));
        assert_eq!(src.next_token(), Token::Whitespace);
        assert_eq!(src.next_token(), Token::Ident("b".into()));
        assert_eq!(src.next_token(), Token::Eof);
        assert_eq!(src.next_token(), Token::Eof);
    }

    #[test]
    fn component_value_source_flattens_plain_tokens() {
        let values = vec![
            ComponentValue::Token(Token::Ident("a".into())),
            ComponentValue::Token(Token::Whitespace),
            ComponentValue::Token(Token::Ident("b".into())),
        ];
        let mut src = ComponentValueSource::new(&values);
        assert_eq!(src.next_token(), Token::Ident("a".into()));
        assert_eq!(src.next_token(), Token::Whitespace);
        assert_eq!(src.next_token(), Token::Ident("b".into()));
        assert_eq!(src.next_token(), Token::Eof);
        assert_eq!(src.next_token(), Token::Eof);
    }

    #[test]
    fn component_value_source_resynthesizes_function_tokens() {
        let values = vec![ComponentValue::Function(Function {
            name: "calc".into(),
            values: vec![ComponentValue::Token(Token::Number { repr: "1".into(), value: 1.0, is_integer: true })],
        })];
        let mut src = ComponentValueSource::new(&values);
        assert_eq!(src.next_token(), Token::Function("calc".into()));
        assert_eq!(src.next_token(), Token::Number { repr: "1".into(), value: 1.0, is_integer: true });
        assert_eq!(src.next_token(), Token::RightParen);
        assert_eq!(src.next_token(), Token::Eof);
    }

    #[test]
    fn component_value_source_resynthesizes_nested_blocks() {
        let values = vec![ComponentValue::Block(SimpleBlock {
            opener: BlockOpener::Bracket,
            values: vec![ComponentValue::Block(SimpleBlock { opener: BlockOpener::Paren, values: vec![] })],
        })];
        let mut src = ComponentValueSource::new(&values);
        assert_eq!(src.next_token(), Token::LeftBracket);
        assert_eq!(src.next_token(), Token::LeftParen);
        assert_eq!(src.next_token(), Token::RightParen);
        assert_eq!(src.next_token(), Token::RightBracket);
        assert_eq!(src.next_token(), Token::Eof);
        assert_eq!(src.next_token(), Token::Eof);
    }
}
