//! Slot identifiers.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "scope";

/// Identifies one binding location inside a [`ContextStore`](crate::ContextStore).
///
/// A slot is keyed by the resource type and a caller-chosen key. The type's
/// [`TypeId`] takes part in equality, so two resource kinds sharing a key
/// never observe each other's bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotId {
    type_id: TypeId,
    type_name: &'static str,
    name: Arc<str>,
    key_start: usize,
}

impl SlotId {
    /// Composes the slot for resource type `T` under `namespace` and `key`.
    ///
    /// The display name has the form `{namespace}<{type}>:[{key}]`.
    pub fn new<T: ?Sized + 'static>(namespace: &str, key: &str) -> Self {
        let type_name = std::any::type_name::<T>();
        let prefix = format!("{namespace}<{type_name}>:[");
        let key_start = prefix.len();
        let name = format!("{prefix}{key}]");
        Self {
            type_id: TypeId::of::<T>(),
            type_name,
            name: name.into(),
            key_start,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The caller-supplied key, possibly empty.
    pub fn key(&self) -> &str {
        &self.name[self.key_start..self.name.len() - 1]
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
