use crate::config::ConfigError;
use thiserror::Error;

/// Boxed error produced by fallible factories and disposal.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for the scope-fnd library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("factory for slot '{slot}' produced no value")]
    InvalidFactoryResult { slot: String },

    #[error("factory for slot '{slot}' failed: {source}")]
    Factory { slot: String, source: BoxError },

    #[error("failed to dispose resource bound to slot '{slot}': {source}")]
    Disposal { slot: String, source: BoxError },

    #[error("no {store} execution context is active for slot '{slot}'")]
    NoExecutionContext { slot: String, store: &'static str },

    #[error("slot '{slot}' released out of order (holder depth {depth}, {open} open)")]
    OutOfOrderRelease {
        slot: String,
        depth: usize,
        open: usize,
    },

    #[error("slot '{slot}' holds a value of an unexpected type")]
    SlotTypeMismatch { slot: String },

    #[error("a global scope context is already installed")]
    GlobalAlreadyInstalled,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
