//! A typed parse-error kind, so handlers can match on failure shape while still rendering a
//! human string for the `event.error` column (the ambient `Result<_, String>` convention; see
//! `config::Context`'s logging macros for the same no-cost-abstraction idea applied to logging).

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    MissingField(String),
    UnknownField(String),
    Malformed { field: String, reason: String },
    OutOfRange { field: String, reason: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingField(field) => write!(f, "missing field '{field}'"),
            ParseError::UnknownField(field) => write!(f, "unknown field '{field}'"),
            ParseError::Malformed { field, reason } => write!(f, "field '{field}' malformed: {reason}"),
            ParseError::OutOfRange { field, reason } => write!(f, "field '{field}' out of range: {reason}"),
        }
    }
}

impl From<ParseError> for String {
    fn from(e: ParseError) -> String {
        e.to_string()
    }
}
