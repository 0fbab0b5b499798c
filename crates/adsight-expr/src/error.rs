//! Error types for adsight-expr

use thiserror::Error;

/// Result type alias for expression operations
pub type Result<T> = std::result::Result<T, ExprError>;

/// Why an expression could not be parsed or evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExprError {
    /// The expression contains no tokens.
    #[error("expression is empty")]
    Empty,

    /// The source is longer than the accepted maximum.
    #[error("expression exceeds {max} bytes")]
    TooLong {
        /// Byte limit
        max: usize,
    },

    /// Parentheses or unary operators nest too deeply.
    #[error("expression nests deeper than {max} levels")]
    TooDeep {
        /// Nesting limit
        max: usize,
    },

    /// A character outside the grammar.
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar {
        /// The character
        ch: char,
        /// Byte offset in the source
        offset: usize,
    },

    /// A numeric literal that does not parse.
    #[error("invalid number '{text}' at offset {offset}")]
    InvalidNumber {
        /// The literal as written
        text: String,
        /// Byte offset in the source
        offset: usize,
    },

    /// A token in a position the grammar does not allow.
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        /// Description of the token found
        found: String,
        /// Byte offset in the source
        offset: usize,
        /// What the parser was looking for
        expected: &'static str,
    },

    /// Input ended mid-expression.
    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd {
        /// What the parser was looking for
        expected: &'static str,
    },

    /// A call to anything other than `SAFE_DIVIDE`.
    #[error("unknown function '{name}'")]
    UnknownFunction {
        /// Function name as written
        name: String,
    },

    /// A referenced field is absent from the row or has no numeric value.
    #[error("field '{field}' is missing or not a number")]
    NotANumber {
        /// Field name
        field: String,
    },

    /// Evaluation produced infinity or NaN.
    #[error("result is not a finite number")]
    NonFinite,
}

impl ExprError {
    /// Returns `true` for errors found before evaluation (bad formula text).
    pub fn is_syntax_error(&self) -> bool {
        !matches!(self, ExprError::NotANumber { .. } | ExprError::NonFinite)
    }
}
