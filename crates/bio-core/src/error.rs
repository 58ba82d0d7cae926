use thiserror::Error;

use crate::keys::TermKey;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown term name: {name}")]
    UnknownTerm { name: String },

    #[error("Unknown term key: {key}")]
    UnknownKey { key: TermKey },

    #[error("Axis {axis} must be strictly increasing")]
    NonMonotonicAxis { axis: &'static str },

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}
