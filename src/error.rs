// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

/// A position in text.
///
/// Indicates a row/line and a column in the original source. Starting from
/// 1:1. Constructed internally from a `Stream`'s cursor; never built by
/// callers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TextPos {
    #[allow(missing_docs)]
    pub row: u32,
    #[allow(missing_docs)]
    pub col: u32,
}

impl TextPos {
    pub(crate) fn new(row: u32, col: u32) -> TextPos {
        TextPos { row, col }
    }
}

impl fmt::Display for TextPos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// A syntax error.
///
/// Returned by the single-item entry points (`parse_rule`,
/// `parse_declaration`, `parse_component_value`, `parse_an_plus_b`) when the
/// input, after accounting for tokenizer/parser recovery, does not match
/// the required top-level production. There are no other fatal conditions
/// in this crate: every other entry point always produces a (possibly
/// empty) result.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SyntaxError {
    /// A short, human-readable description of what production failed.
    pub message: &'static str,
    /// Where in the source the failure was detected.
    pub pos: TextPos,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.pos)
    }
}

impl std::error::Error for SyntaxError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_pos_displays_row_colon_col() {
        assert_eq!(TextPos::new(3, 7).to_string(), "3:7");
    }

    #[test]
    fn syntax_error_displays_message_and_pos() {
        let e = SyntaxError { message: "expected a rule", pos: TextPos::new(1, 1) };
        assert_eq!(e.to_string(), "expected a rule at 1:1");
    }
}
