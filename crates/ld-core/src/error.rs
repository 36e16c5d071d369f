//! Error types for parsing diagram and solution text.

use thiserror::Error;

/// A malformed record. Any of these aborts the whole parse; no partial
/// graph is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A required numeric field is not a number.
    #[error("line {line}: field {field} `{value}` is not a number")]
    InvalidNumber {
        line: usize,
        field: usize,
        value: String,
    },

    /// A `Type|number` name has no separator or a bad number.
    #[error("line {line}: invalid name `{value}`")]
    InvalidUid { line: usize, value: String },

    /// A wire flag is neither `true` nor `false`.
    #[error("line {line}: field {field} `{value}` is not a boolean")]
    InvalidBool {
        line: usize,
        field: usize,
        value: String,
    },
}

impl ParseError {
    /// 1-based source line the error refers to.
    pub fn line(&self) -> usize {
        match self {
            ParseError::InvalidNumber { line, .. }
            | ParseError::InvalidUid { line, .. }
            | ParseError::InvalidBool { line, .. } => *line,
        }
    }

    /// Shift the line number, for errors raised inside an embedded block.
    #[must_use]
    pub fn offset_lines(self, by: usize) -> Self {
        match self {
            ParseError::InvalidNumber { line, field, value } => ParseError::InvalidNumber {
                line: line + by,
                field,
                value,
            },
            ParseError::InvalidUid { line, value } => ParseError::InvalidUid {
                line: line + by,
                value,
            },
            ParseError::InvalidBool { line, field, value } => ParseError::InvalidBool {
                line: line + by,
                field,
                value,
            },
        }
    }
}

/// Result type alias for parsing.
pub type ParseResult<T> = Result<T, ParseError>;
