//! I define the errors raised by the [reasoning engine](crate::engine).
use std::error::Error;

use thiserror::Error;

use crate::config::ConfigError;

/// An error raised by the [reasoning engine](crate::engine::ReasoningEngine),
/// generic over the error types of its triple store (`SE`) and persistence layer (`PE`).
#[derive(Debug, Error)]
pub enum ReasoningError<SE, PE>
where
    SE: Error + 'static,
    PE: Error + 'static,
{
    /// Error in the triple store
    #[error("Triple store failed: {0}")]
    Store(#[source] SE),
    /// Error in the reasoning persistence layer
    #[error("Reasoning persistence failed: {0}")]
    Persistence(#[source] PE),
    /// The configuration is invalid
    #[error("Invalid reasoning configuration: {0}")]
    Config(#[source] ConfigError),
    /// The reasoning worker could not be started
    #[error("Failed to spawn the reasoning worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl<SE, PE> ReasoningError<SE, PE>
where
    SE: Error + 'static,
    PE: Error + 'static,
{
    /// Whether this error was raised by the triple store.
    pub fn is_store_error(&self) -> bool {
        matches!(self, ReasoningError::Store(_))
    }

    /// Whether this error was raised by the persistence layer.
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, ReasoningError::Persistence(_))
    }
}
