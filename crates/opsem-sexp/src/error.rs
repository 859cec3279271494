//! Parse error types and source spans.
//!
//! Parse errors abort parsing (no recovery, no collection). They
//! serialize to JSON so host tooling can render diagnostics.

use opsem_lang::LangError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source location span. Line and column are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(line: u32, col: u32, end_line: u32, end_col: u32) -> Span {
        Span {
            line,
            col,
            end_line,
            end_col,
        }
    }

    /// A zero-width span at a single position.
    pub fn point(line: u32, col: u32) -> Span {
        Span::new(line, col, line, col)
    }

    /// The smallest span covering both.
    pub fn merge(self, other: Span) -> Span {
        let (line, col) = if (self.line, self.col) <= (other.line, other.col) {
            (self.line, self.col)
        } else {
            (other.line, other.col)
        };
        let (end_line, end_col) =
            if (self.end_line, self.end_col) >= (other.end_line, other.end_col) {
                (self.end_line, self.end_col)
            } else {
                (other.end_line, other.end_col)
            };
        Span::new(line, col, end_line, end_col)
    }
}

/// Errors raised while lexing, reading, or elaborating a term.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ParseError {
    /// A character the lexer does not recognize.
    #[error("unexpected character `{ch}` at {line}:{col}")]
    UnexpectedChar { ch: char, line: u32, col: u32 },

    /// A string literal ran off the end of the input.
    #[error("unterminated string starting at {line}:{col}")]
    UnterminatedString { line: u32, col: u32 },

    /// An unknown escape inside a string literal.
    #[error("invalid escape `\\{ch}` at {line}:{col}")]
    InvalidEscape { ch: char, line: u32, col: u32 },

    /// An unknown `#…` form.
    #[error("invalid `#` form at {line}:{col}")]
    InvalidHashForm { line: u32, col: u32 },

    /// Input ended inside an open form.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The reader met a token it cannot start a form with.
    #[error("unexpected token `{token}` at {}:{}", span.line, span.col)]
    UnexpectedToken { token: String, span: Span },

    /// A map literal with an odd number of elements.
    #[error("map literal needs an even number of elements, at {}:{}", span.line, span.col)]
    UnevenMapLiteral { span: Span },

    /// Trailing input after the first complete form.
    #[error("trailing input after term, at {}:{}", span.line, span.col)]
    TrailingInput { span: Span },

    /// A list head that is not a variant of the expected space.
    #[error("unknown variant head `{head}` for space `{space}`, at {}:{}", span.line, span.col)]
    UnknownVariantHead {
        head: String,
        space: String,
        span: Span,
    },

    /// A variant applied to the wrong number of children.
    #[error(
        "variant `{variant}` expects {expected} children, got {got}, at {}:{}",
        span.line, span.col
    )]
    ArityMismatch {
        variant: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    /// A form that no alternative of the expected space accepts.
    #[error("no alternative of space `{space}` accepts this form, at {}:{}", span.line, span.col)]
    NoAlternative { space: String, span: Span },

    /// A form that does not fit the expected component.
    #[error("expected {expected}, at {}:{}", span.line, span.col)]
    TypeMismatch { expected: String, span: Span },

    /// The language definition itself was consulted and failed.
    #[error("language error: {0}")]
    Lang(String),
}

impl From<LangError> for ParseError {
    fn from(e: LangError) -> ParseError {
        ParseError::Lang(e.to_string())
    }
}

/// Result alias for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;
