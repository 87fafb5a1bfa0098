//! Core error type.

use thiserror::Error;

/// Error raised while building configuration or session state.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid extra arguments: {0}")]
    InvalidArgs(String),
    #[error("Entropy source unavailable: {0}")]
    Entropy(#[from] getrandom::Error),
}
