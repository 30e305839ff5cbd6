use serde::Deserialize;

use super::{ConfigError, SettingsLoader};
use crate::slot::DEFAULT_NAMESPACE;
use crate::StoreKind;

/// What happens when a holder is released while holders nested inside it
/// are still open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingPolicy {
    /// Log the violation and release anyway.
    #[default]
    Permissive,
    /// Refuse the release with [`Error::OutOfOrderRelease`](crate::Error::OutOfOrderRelease).
    Strict,
}

/// Settings for a [`ScopeContext`](crate::ScopeContext).
///
/// Read from the `[scope]` table of a TOML document:
///
/// ```toml
/// [scope]
/// namespace = "orders"
/// store = "request"
/// nesting = "strict"
/// ```
///
/// Every field is optional and falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopeSettings {
    /// Prefix of every slot name.
    pub namespace: String,
    pub store: StoreKind,
    pub nesting: NestingPolicy,
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            store: StoreKind::default(),
            nesting: NestingPolicy::default(),
        }
    }
}

impl ScopeSettings {
    /// Creates a loader that layers TOML files and environment variables.
    pub fn loader() -> SettingsLoader {
        SettingsLoader::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::InvalidNamespace);
        }
        Ok(())
    }
}
