//! Context-scoped resources: created on first use within a thread or
//! request, shared by every nested acquisition, released once by the
//! outermost one.

pub mod config;
pub mod context;
mod error;
mod holder;
mod slot;
pub mod store;

pub use config::{ConfigError, NestingPolicy, ScopeSettings, SettingsLoader};
pub use context::{ScopeContext, ScopeContextBuilder};
pub use error::{BoxError, Error};
pub use holder::{Dispose, ScopedResource};
pub use slot::{SlotId, DEFAULT_NAMESPACE};
pub use store::{
    AutoStore, ContextStore, RequestScope, RequestStore, SlotEntry, SlotTable, StoreKind,
    ThreadStore,
};
