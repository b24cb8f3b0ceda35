/*!
A tokenizer and parser for the [CSS Syntax Module Level 3](https://www.w3.org/TR/css-syntax-3/)
front end.

This is the tokenizing and parsing front end only: it turns source text into
tokens, component values, declarations and rules, exactly as the
specification defines them. It does not know about any specific CSS grammar
(selectors, property values, `@media` conditions, ...) and does not attempt
to validate or interpret what it parses beyond the syntax level. If you need
a full CSS engine, build one on top of this the same way a browser's CSS
parser sits on top of its tokenizer.

## Features

- A pull-based [`Tokenizer`](tokenizer::Tokenizer) implementing the
  code-point-level tokenization algorithm.
- A recursive-descent parser implementing all nine public entry points from
  the specification's "parser entry points" section, via
  [`parse_stylesheet`], [`parse_list_of_rules`], [`parse_rule`],
  [`parse_declaration`], [`parse_list_of_declarations`],
  [`parse_component_value`], [`parse_list_of_component_values`],
  [`parse_comma_separated_list_of_component_values`] and [`parse_an_plus_b`].
- Entry points are polymorphic over their input: they accept either raw
  source text (`&str`) or an already-parsed `&[ComponentValue]` list, so a
  component value captured from one parse can be re-parsed as a declaration
  value, a selector list, or anything else, without re-serializing it to
  text first.
- [`Stylesheet::parse`]/[`Stylesheet::parse_more`] offer a builder-style,
  re-entrant alternative to [`parse_stylesheet`] for feeding more source
  text into an already-parsed stylesheet without starting over.
- No unsafe.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod an_plus_b;
mod cp;
mod error;
mod parser;
mod stream;
mod token;
mod token_source;
mod tokenizer;

pub use error::{SyntaxError, TextPos};
pub use parser::{
    parse_an_plus_b, parse_comma_separated_list_of_component_values, parse_component_value, parse_declaration,
    parse_list_of_component_values, parse_list_of_declarations, parse_list_of_rules, parse_rule, parse_stylesheet,
};
pub use token::{
    AnPlusB, AtRule, BlockOpener, ComponentValue, Declaration, Function, QualifiedRule, Rule, SimpleBlock, Stylesheet,
    Token,
};
pub use token_source::{ComponentValueSource, IntoTokenSource, TokenSource, TokenizerSource};
pub use tokenizer::Tokenizer;
