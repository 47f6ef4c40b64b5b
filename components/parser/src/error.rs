//! Parser error helpers

use core_types::{ScriptError, SourcePosition};

use crate::lexer::Token;

/// Create an unexpected token error.
pub fn unexpected_token(expected: &str, got: &Token, position: SourcePosition) -> ScriptError {
    ScriptError::syntax(
        format!("expected {}, got {}", expected, got.describe()),
        position,
    )
}

/// Create an unexpected end of input error.
pub fn unexpected_eof(position: SourcePosition) -> ScriptError {
    ScriptError::syntax("unexpected end of input", position)
}
