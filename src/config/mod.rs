//! Configuration loading for scope contexts.

mod builder;
mod env;
mod error;
mod settings;

pub use builder::SettingsLoader;
pub use error::ConfigError;
pub use settings::{NestingPolicy, ScopeSettings};
