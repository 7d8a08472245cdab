//! Boundary validation errors for the organism data model.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Meaning significance must stay in [0.0, 1.0].
    #[error("significance {0} is outside [0.0, 1.0]")]
    SignificanceOutOfRange(f32),

    #[error("stimulus category must not be empty")]
    EmptyCategory,

    #[error("unknown stimulus category: '{0}'")]
    UnknownCategory(String),

    #[error("unknown reaction pattern: '{0}'")]
    UnknownPattern(String),

    #[error("stimulus intensity must be finite, got {0}")]
    NonFiniteIntensity(f32),
}
