#![forbid(unsafe_code)]

use lframe_core::DomError;
use lframe_render::RenderError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors surfaced by mounting apps and components.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("mount target #{0} not found")]
    ContainerNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Failures of a durable key-value backend.
///
/// These never escape [`Store::set_state`](crate::Store::set_state); the
/// store logs them and carries on with in-memory state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed for {key:?}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("value stored under {key:?} is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value stored under {key:?} is not a JSON object")]
    NotAnObject { key: String },

    #[error("quota exceeded writing {key:?}: {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}

/// Error returned by a fallible subscriber.
///
/// Reported through `tracing` by the notifying store or router; the other
/// subscribers still run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubscriberError {
    message: String,
}

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for SubscriberError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for SubscriberError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
