//! Gate-level error type.
//!
//! Everything that can go wrong between reading the command and obtaining a
//! decision ends up here, and every variant resolves to escalation.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::oracle::OracleError;

/// The instruction document could not be read.
///
/// Cloneable so a gate can keep the load failure and report it on every
/// classification it is asked for.
#[derive(Debug, Clone, Error)]
#[error("failed to read instructions at {}: {source}", path.display())]
pub struct InstructionsError {
    path: PathBuf,
    #[source]
    source: Arc<std::io::Error>,
}

impl InstructionsError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

/// Errors raised while classifying one command.
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Instructions(#[from] InstructionsError),

    /// The oracle call failed or returned an answer outside the contract.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl GateError {
    /// Create an instruction-loading error
    pub fn instructions(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Instructions(InstructionsError::new(path, source))
    }
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
