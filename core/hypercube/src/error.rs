//! FILENAME: core/hypercube/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HyperCubeError {
    /// Malformed definition, page window or property key.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// The engine rejected a page that starts outside the grid.
    #[error("Page out of range: {0}")]
    OutOfRange(String),

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A page sequence was pulled after its cube had been re-committed.
    #[error("Definition changed during iteration: {0}")]
    DefinitionChanged(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HyperCubeError {
    pub fn validation(message: impl Into<String>) -> Self {
        HyperCubeError::Validation(message.into())
    }

    pub fn path_not_found(path: impl Into<String>) -> Self {
        HyperCubeError::PathNotFound(path.into())
    }
}

pub type HyperCubeResult<T> = Result<T, HyperCubeError>;
