use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::env::load_env_vars;
use super::{ConfigError, ScopeSettings};

/// A layer in the loading pipeline.
#[derive(Debug)]
enum Layer {
    File { path: PathBuf, required: bool },
    Env { prefix: String, separator: String },
}

/// The part of a configuration document the loader reads; other tables are ignored.
#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(default)]
    scope: ScopeSettings,
}

/// Loads [`ScopeSettings`] from TOML files and environment variables.
///
/// Layers are applied in registration order, later ones overriding earlier
/// ones. Nested tables merge recursively.
///
/// ## Example
///
/// ```no_run
/// use scope_fnd::ScopeSettings;
///
/// // With APP__SCOPE__STORE=request set in the environment
/// let settings = ScopeSettings::loader()
///     .with_file("config/default.toml", true)
///     .with_env("APP", "__")
///     .with_file("config/local.toml", false)
///     .load()?;
/// # Ok::<(), scope_fnd::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "loaders do nothing until .load() is called"]
pub struct SettingsLoader {
    layers: Vec<Layer>,
}

impl SettingsLoader {
    /// Adds a TOML file. Missing optional files are skipped.
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.layers.push(Layer::File {
            path: path.as_ref().to_path_buf(),
            required,
        });
        self
    }

    /// Adds environment variables named `{prefix}{separator}SCOPE{separator}FIELD`.
    pub fn with_env(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.layers.push(Layer::Env {
            prefix: prefix.into(),
            separator: separator.into(),
        });
        self
    }

    /// Merges all layers, deserializes the `[scope]` table and validates it.
    pub fn load(self) -> Result<ScopeSettings, ConfigError> {
        let mut merged = toml::Table::new();

        for layer in self.layers {
            match layer {
                Layer::File { path, required } => {
                    if let Some(table) = load_config_file(&path, required)? {
                        deep_merge(&mut merged, table);
                    }
                }
                Layer::Env { prefix, separator } => {
                    load_env_vars(&mut merged, &prefix, &separator);
                }
            }
        }

        let document: Document = toml::Value::Table(merged).try_into()?;
        document.scope.validate()?;
        tracing::debug!(
            namespace = %document.scope.namespace,
            store = ?document.scope.store,
            nesting = ?document.scope.nesting,
            "loaded scope settings"
        );
        Ok(document.scope)
    }
}

/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_config_file(path: &Path, required: bool) -> Result<Option<toml::Table>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
