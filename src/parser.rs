// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The pushdown parser (spec §4.5) and the public entry points built from it
//! (spec §6).

use log::warn;

use crate::an_plus_b;
use crate::error::{SyntaxError, TextPos};
use crate::token::{
    AnPlusB, AtRule, BlockOpener, ComponentValue, Declaration, Function, QualifiedRule, Rule, SimpleBlock, Stylesheet,
    Token,
};
use crate::token_source::{ComponentValueSource, IntoTokenSource, TokenSource};

/// Maintains current/next token and a reconsume flag, mirroring `Stream` at
/// the token level (spec §4.5).
struct Parser<S: TokenSource> {
    source: S,
    current: Token,
    reconsume: bool,
}

impl<S: TokenSource> Parser<S> {
    fn new(source: S) -> Self {
        Parser { source, current: Token::Eof, reconsume: false }
    }

    fn consume(&mut self) -> Token {
        if self.reconsume {
            self.reconsume = false;
        } else {
            self.current = self.source.next_token();
        }
        self.current.clone()
    }

    /// Must not be called twice without an intervening `consume()`.
    fn reconsume(&mut self) {
        debug_assert!(!self.reconsume, "reconsume() called twice without an intervening consume()");
        self.reconsume = true;
    }

    /// Consumes `Whitespace` tokens until the next one is not.
    fn skip_whitespace(&mut self) {
        loop {
            if self.consume() != Token::Whitespace {
                self.reconsume();
                return;
            }
        }
    }

    fn position(&self) -> TextPos {
        self.source.position()
    }
}

/// An item from a "list of declarations" (spec §4.5.4), which may interleave
/// at-rules with ordinary declarations. `parse_list_of_declarations`
/// (spec §6) surfaces only the `Declaration` variants, matching its
/// documented return type; at-rules are still fully consumed here so the
/// underlying token stream stays correctly positioned.
enum DeclarationListItem {
    Declaration(Declaration),
    AtRule(AtRule),
}

/// spec §4.5.1.
fn consume_list_of_rules<S: TokenSource>(parser: &mut Parser<S>, top_level: bool) -> Vec<Rule> {
    let mut rules = Vec::new();
    loop {
        match parser.consume() {
            Token::Whitespace => continue,
            Token::Eof => return rules,
            Token::Cdo | Token::Cdc => {
                if top_level {
                    continue;
                }
                parser.reconsume();
                if let Some(rule) = consume_qualified_rule(parser) {
                    rules.push(Rule::Qualified(rule));
                }
            }
            Token::AtKeyword(_) => {
                parser.reconsume();
                rules.push(Rule::At(consume_at_rule(parser)));
            }
            _ => {
                parser.reconsume();
                if let Some(rule) = consume_qualified_rule(parser) {
                    rules.push(Rule::Qualified(rule));
                }
            }
        }
    }
}

/// spec §4.5.2. Must be called with an `AtKeyword` token pending.
fn consume_at_rule<S: TokenSource>(parser: &mut Parser<S>) -> AtRule {
    let name = match parser.consume() {
        Token::AtKeyword(name) => name,
        other => unreachable!("consume_at_rule expects a pending AtKeyword, found {other:?}"),
    };

    let mut prelude = Vec::new();
    loop {
        match parser.consume() {
            Token::Semicolon => return AtRule { name, prelude, block: None },
            Token::Eof => {
                warn!("unexpected EOF in at-rule prelude at {}", parser.position());
                return AtRule { name, prelude, block: None };
            }
            Token::LeftBrace => {
                let block = consume_simple_block(parser, BlockOpener::Brace);
                return AtRule { name, prelude, block: Some(block) };
            }
            _ => {
                parser.reconsume();
                prelude.push(consume_component_value(parser));
            }
        }
    }
}

/// spec §4.5.3.
fn consume_qualified_rule<S: TokenSource>(parser: &mut Parser<S>) -> Option<QualifiedRule> {
    let mut prelude = Vec::new();
    loop {
        match parser.consume() {
            Token::Eof => {
                warn!("unexpected EOF in qualified rule prelude at {}", parser.position());
                return None;
            }
            Token::LeftBrace => {
                let block = consume_simple_block(parser, BlockOpener::Brace);
                return Some(QualifiedRule { prelude, block });
            }
            _ => {
                parser.reconsume();
                prelude.push(consume_component_value(parser));
            }
        }
    }
}

/// spec §4.5.4.
fn consume_list_of_declarations<S: TokenSource>(parser: &mut Parser<S>) -> Vec<DeclarationListItem> {
    let mut items = Vec::new();
    loop {
        match parser.consume() {
            Token::Whitespace | Token::Semicolon => continue,
            Token::Eof => return items,
            Token::AtKeyword(_) => {
                parser.reconsume();
                items.push(DeclarationListItem::AtRule(consume_at_rule(parser)));
            }
            Token::Ident(_) => {
                parser.reconsume();
                let temp = collect_until_semicolon_or_eof(parser);
                let temp_source = ComponentValueSource::new(&temp);
                let mut temp_parser = Parser::new(temp_source);
                if let Some(decl) = consume_declaration(&mut temp_parser) {
                    items.push(DeclarationListItem::Declaration(decl));
                }
            }
            _ => {
                warn!("unexpected token in declaration list at {}", parser.position());
                parser.reconsume();
                discard_until_semicolon_or_eof(parser);
            }
        }
    }
}

/// Gathers component values (spec §4.5.4's "temporary list") up to, but not
/// including, the next top-level `Semicolon` or `EOF`.
fn collect_until_semicolon_or_eof<S: TokenSource>(parser: &mut Parser<S>) -> Vec<ComponentValue> {
    let mut values = Vec::new();
    loop {
        match parser.consume() {
            Token::Semicolon | Token::Eof => {
                parser.reconsume();
                return values;
            }
            _ => {
                parser.reconsume();
                values.push(consume_component_value(parser));
            }
        }
    }
}

fn discard_until_semicolon_or_eof<S: TokenSource>(parser: &mut Parser<S>) {
    loop {
        match parser.consume() {
            Token::Semicolon | Token::Eof => {
                parser.reconsume();
                return;
            }
            _ => {
                parser.reconsume();
                consume_component_value(parser);
            }
        }
    }
}

/// spec §4.5.5. Must be called with an `Ident` token pending.
fn consume_declaration<S: TokenSource>(parser: &mut Parser<S>) -> Option<Declaration> {
    let name = match parser.consume() {
        Token::Ident(name) => name,
        other => unreachable!("consume_declaration expects a pending Ident, found {other:?}"),
    };

    parser.skip_whitespace();
    if parser.consume() != Token::Colon {
        warn!("expected ':' in declaration '{name}' at {}", parser.position());
        return None;
    }
    parser.skip_whitespace();

    let mut value = Vec::new();
    loop {
        match parser.consume() {
            Token::Eof => break,
            _ => {
                parser.reconsume();
                value.push(consume_component_value(parser));
            }
        }
    }

    let important = strip_trailing_important(&mut value);
    strip_trailing_whitespace(&mut value);
    Some(Declaration { name, value, important })
}

/// Finds the last two *non-whitespace* elements, skipping over any
/// whitespace between them (and after them), not just a single trim-from-end
/// pass: `red ! important` and `red !important` must both be recognized.
fn strip_trailing_important(value: &mut Vec<ComponentValue>) -> bool {
    let mut idx = value.len();
    while idx > 0 && value[idx - 1].is_whitespace() {
        idx -= 1;
    }
    if idx == 0 {
        return false;
    }
    let important_idx = idx - 1;
    let is_important =
        matches!(&value[important_idx], ComponentValue::Token(Token::Ident(s)) if s.eq_ignore_ascii_case("important"));
    if !is_important {
        return false;
    }

    let mut idx = important_idx;
    while idx > 0 && value[idx - 1].is_whitespace() {
        idx -= 1;
    }
    if idx == 0 {
        return false;
    }
    let bang_idx = idx - 1;
    let is_bang = matches!(&value[bang_idx], ComponentValue::Token(Token::Delim('!')));
    if is_bang {
        value.truncate(bang_idx);
        true
    } else {
        false
    }
}

fn strip_trailing_whitespace(value: &mut Vec<ComponentValue>) {
    while matches!(value.last(), Some(v) if v.is_whitespace()) {
        value.pop();
    }
}

/// spec §4.5.6.
fn consume_component_value<S: TokenSource>(parser: &mut Parser<S>) -> ComponentValue {
    match parser.consume() {
        Token::LeftBrace => ComponentValue::Block(consume_simple_block(parser, BlockOpener::Brace)),
        Token::LeftBracket => ComponentValue::Block(consume_simple_block(parser, BlockOpener::Bracket)),
        Token::LeftParen => ComponentValue::Block(consume_simple_block(parser, BlockOpener::Paren)),
        Token::Function(name) => ComponentValue::Function(consume_function(parser, name)),
        other => ComponentValue::Token(other),
    }
}

/// spec §4.5.6. Must be called with the opener already consumed.
fn consume_simple_block<S: TokenSource>(parser: &mut Parser<S>, opener: BlockOpener) -> SimpleBlock {
    let closer = Token::matching_closer(opener);
    let mut values = Vec::new();
    loop {
        let tok = parser.consume();
        if tok == closer {
            return SimpleBlock { opener, values };
        }
        if tok == Token::Eof {
            warn!("unexpected EOF in simple block at {}", parser.position());
            return SimpleBlock { opener, values };
        }
        parser.reconsume();
        values.push(consume_component_value(parser));
    }
}

/// spec §4.5.6. Must be called with the `Function` token already consumed;
/// `name` is that token's name.
fn consume_function<S: TokenSource>(parser: &mut Parser<S>, name: String) -> Function {
    let mut values = Vec::new();
    loop {
        match parser.consume() {
            Token::RightParen => return Function { name, values },
            Token::Eof => {
                warn!("unexpected EOF in function '{name}' at {}", parser.position());
                return Function { name, values };
            }
            _ => {
                parser.reconsume();
                values.push(consume_component_value(parser));
            }
        }
    }
}

fn syntax_err<S: TokenSource>(parser: &Parser<S>, message: &'static str) -> SyntaxError {
    SyntaxError { message, pos: parser.position() }
}

/// Parses a complete stylesheet (spec §6). A leading `@charset` at-rule is
/// dropped, matching the invariant that `parse_stylesheet` never surfaces
/// one as its first rule (spec §3, §8).
pub fn parse_stylesheet<'a, T: IntoTokenSource<'a>>(src: T) -> Stylesheet {
    let mut parser = Parser::new(src.into_token_source());
    let mut rules = consume_list_of_rules(&mut parser, true);
    if matches!(rules.first(), Some(Rule::At(at)) if at.name.eq_ignore_ascii_case("charset")) {
        rules.remove(0);
    }
    Stylesheet { rules }
}

/// Parses a bare list of rules, without the top-level CDO/CDC skipping or
/// the `@charset` drop that `parse_stylesheet` applies (spec §6).
pub fn parse_list_of_rules<'a, T: IntoTokenSource<'a>>(src: T) -> Vec<Rule> {
    let mut parser = Parser::new(src.into_token_source());
    consume_list_of_rules(&mut parser, false)
}

impl Stylesheet {
    /// Parses a complete stylesheet from source text.
    ///
    /// Builder-style entry point mirroring the teacher crate's
    /// `StyleSheet::parse`/`StyleSheet::parse_more`: this is just
    /// `Stylesheet::default()` followed by one `parse_more` call, so further
    /// source text (another `<style>` block, a concatenated `@import`ed
    /// file, ...) can be folded into the same stylesheet afterwards without
    /// re-allocating the accumulated rule list.
    pub fn parse(text: &str) -> Self {
        let mut sheet = Stylesheet::default();
        sheet.parse_more(text);
        sheet
    }

    /// Parses `text` as a list of rules and appends them to this stylesheet.
    ///
    /// The `@charset` invariant (spec §3, §8) applies to the stylesheet as a
    /// whole, not to each chunk fed into it: a leading `@charset` is dropped
    /// only when `text`'s first rule would also be this stylesheet's first
    /// rule overall, i.e. when nothing has been parsed into it yet.
    pub fn parse_more(&mut self, text: &str) {
        let mut parser = Parser::new(text.into_token_source());
        let mut rules = consume_list_of_rules(&mut parser, true);
        if self.rules.is_empty() && matches!(rules.first(), Some(Rule::At(at)) if at.name.eq_ignore_ascii_case("charset"))
        {
            rules.remove(0);
        }
        self.rules.append(&mut rules);
    }
}

/// Parses a single rule. Only whitespace and EOF may follow it (spec §6).
pub fn parse_rule<'a, T: IntoTokenSource<'a>>(src: T) -> Result<Rule, SyntaxError> {
    let mut parser = Parser::new(src.into_token_source());
    parser.skip_whitespace();

    let rule = match parser.consume() {
        Token::Eof => return Err(syntax_err(&parser, "expected a rule")),
        Token::AtKeyword(_) => {
            parser.reconsume();
            Rule::At(consume_at_rule(&mut parser))
        }
        _ => {
            parser.reconsume();
            match consume_qualified_rule(&mut parser) {
                Some(rule) => Rule::Qualified(rule),
                None => return Err(syntax_err(&parser, "expected a qualified rule")),
            }
        }
    };

    parser.skip_whitespace();
    match parser.consume() {
        Token::Eof => Ok(rule),
        _ => Err(syntax_err(&parser, "unexpected content after rule")),
    }
}

/// Parses a single declaration (spec §6).
pub fn parse_declaration<'a, T: IntoTokenSource<'a>>(src: T) -> Result<Declaration, SyntaxError> {
    let mut parser = Parser::new(src.into_token_source());
    parser.skip_whitespace();

    match parser.consume() {
        Token::Ident(_) => {
            parser.reconsume();
            consume_declaration(&mut parser).ok_or_else(|| syntax_err(&parser, "invalid declaration"))
        }
        _ => Err(syntax_err(&parser, "expected an identifier")),
    }
}

/// Parses a list of declarations, dropping any interleaved at-rules (spec
/// §6 types this entry point's return as a sequence of `Declaration`).
pub fn parse_list_of_declarations<'a, T: IntoTokenSource<'a>>(src: T) -> Vec<Declaration> {
    let mut parser = Parser::new(src.into_token_source());
    consume_list_of_declarations(&mut parser)
        .into_iter()
        .filter_map(|item| match item {
            DeclarationListItem::Declaration(d) => Some(d),
            DeclarationListItem::AtRule(_) => None,
        })
        .collect()
}

/// Parses a single component value. Whitespace is permitted on either side
/// (spec §6).
pub fn parse_component_value<'a, T: IntoTokenSource<'a>>(src: T) -> Result<ComponentValue, SyntaxError> {
    let mut parser = Parser::new(src.into_token_source());
    parser.skip_whitespace();

    if parser.consume() == Token::Eof {
        return Err(syntax_err(&parser, "expected a component value"));
    }
    parser.reconsume();
    let value = consume_component_value(&mut parser);

    parser.skip_whitespace();
    match parser.consume() {
        Token::Eof => Ok(value),
        _ => Err(syntax_err(&parser, "unexpected content after component value")),
    }
}

/// Parses a list of component values (spec §6).
pub fn parse_list_of_component_values<'a, T: IntoTokenSource<'a>>(src: T) -> Vec<ComponentValue> {
    let mut parser = Parser::new(src.into_token_source());
    let mut values = Vec::new();
    loop {
        match parser.consume() {
            Token::Eof => return values,
            _ => {
                parser.reconsume();
                values.push(consume_component_value(&mut parser));
            }
        }
    }
}

/// Parses a comma-separated list of component-value lists, splitting on
/// top-level `Comma` tokens (spec §6).
pub fn parse_comma_separated_list_of_component_values<'a, T: IntoTokenSource<'a>>(src: T) -> Vec<Vec<ComponentValue>> {
    let mut parser = Parser::new(src.into_token_source());
    let mut groups = vec![Vec::new()];
    loop {
        match parser.consume() {
            Token::Eof => return groups,
            Token::Comma => groups.push(Vec::new()),
            _ => {
                parser.reconsume();
                groups.last_mut().unwrap().push(consume_component_value(&mut parser));
            }
        }
    }
}

/// Parses an `An+B` value (spec §4.6, §6).
pub fn parse_an_plus_b<'a, T: IntoTokenSource<'a>>(src: T) -> Result<AnPlusB, SyntaxError> {
    let mut source = src.into_token_source();
    an_plus_b::parse(&mut source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_drops_leading_charset() {
        let sheet = parse_stylesheet("@charset \"utf-8\"; a { color: red }");
        assert_eq!(sheet.rules.len(), 1);
        assert!(matches!(&sheet.rules[0], Rule::Qualified(_)));
    }

    #[test]
    fn parse_more_appends_rules_to_an_existing_stylesheet() {
        let mut sheet = Stylesheet::parse("a { color: red }");
        sheet.parse_more("b { color: blue }");
        assert_eq!(sheet.rules.len(), 2);
    }

    #[test]
    fn parse_more_only_drops_charset_as_the_sheet_s_overall_first_rule() {
        let mut sheet = Stylesheet::parse("a { color: red }");
        sheet.parse_more("@charset \"utf-8\"; b { color: blue }");
        assert_eq!(sheet.rules.len(), 2);
        assert!(matches!(&sheet.rules[0], Rule::Qualified(_)));
        assert!(matches!(&sheet.rules[1], Rule::At(at) if at.name.eq_ignore_ascii_case("charset")));
    }

    #[test]
    fn qualified_rule_with_important_declaration() {
        let sheet = parse_stylesheet("a { color: red !important }");
        let Rule::Qualified(rule) = &sheet.rules[0] else { panic!("expected a qualified rule") };
        assert_eq!(
            rule.prelude,
            vec![ComponentValue::Token(Token::Ident("a".into())), ComponentValue::Token(Token::Whitespace)]
        );
        let decls = parse_list_of_declarations(&rule.block.values[..]);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "color");
        assert!(decls[0].important);
        assert_eq!(
            decls[0].value,
            vec![ComponentValue::Token(Token::Whitespace), ComponentValue::Token(Token::Ident("red".into()))]
        );
    }

    #[test]
    fn important_with_whitespace_around_the_bang_is_still_recognized() {
        let decl = parse_declaration("color: red ! important").unwrap();
        assert!(decl.important);
        assert_eq!(decl.value, vec![ComponentValue::Token(Token::Ident("red".into()))]);
    }

    #[test]
    fn at_rule_without_block_ends_at_semicolon() {
        let rules = parse_list_of_rules("@import url(a.css);");
        assert_eq!(rules.len(), 1);
        match &rules[0] {
            Rule::At(at) => {
                assert_eq!(at.name, "import");
                assert!(at.block.is_none());
            }
            other => panic!("expected an at-rule, got {other:?}"),
        }
    }

    #[test]
    fn parse_rule_rejects_trailing_content() {
        assert!(parse_rule("a {} b {}").is_err());
    }

    #[test]
    fn parse_rule_accepts_trailing_whitespace() {
        assert!(parse_rule("a {}  ").is_ok());
    }

    #[test]
    fn parse_declaration_roundtrip() {
        let decl = parse_declaration("width: 10px").unwrap();
        assert_eq!(decl.name, "width");
        assert!(!decl.important);
    }

    #[test]
    fn parse_declaration_rejects_missing_colon() {
        assert!(parse_declaration("width 10px").is_err());
    }

    #[test]
    fn comma_separated_component_values_split_at_top_level_commas() {
        let groups = parse_comma_separated_list_of_component_values("a, b c, (d, e)");
        assert_eq!(groups.len(), 3);
        // The nested parens' comma must not split the outer list.
        assert!(matches!(&groups[2][0], ComponentValue::Block(_)));
    }

    #[test]
    fn component_value_list_can_be_reparsed_from_component_values() {
        let values = parse_list_of_component_values("1px solid red");
        let reparsed = parse_list_of_component_values(&values[..]);
        assert_eq!(values, reparsed);
    }

    #[test]
    fn nested_block_balances_its_own_closer() {
        let value = parse_component_value("[foo (bar) baz]").unwrap();
        match value {
            ComponentValue::Block(block) => {
                assert_eq!(block.opener, BlockOpener::Bracket);
                assert!(block.values.iter().any(|v| matches!(v, ComponentValue::Block(inner) if inner.opener == BlockOpener::Paren)));
            }
            other => panic!("expected a simple block, got {other:?}"),
        }
    }
}
