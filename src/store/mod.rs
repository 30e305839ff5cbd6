//! Storage for the bindings of the current execution context.
//!
//! A [`ContextStore`] resolves the [`SlotTable`] of the caller's current
//! execution context. Two are provided: [`ThreadStore`] partitions by
//! thread, [`RequestStore`] by logical request (see [`RequestScope`]).
//! [`AutoStore`] picks between them on every call depending on whether a
//! request scope is active.

mod request;
mod table;
mod thread;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::SlotId;

pub use request::{RequestScope, RequestStore};
pub use table::SlotTable;
pub use thread::ThreadStore;

/// Resolves the bindings of the caller's current execution context.
///
/// Implementations must isolate contexts from one another: the table
/// returned in one context is never returned in another.
pub trait ContextStore: Send + Sync + fmt::Debug {
    /// Short name used in diagnostics and errors.
    fn name(&self) -> &'static str;

    /// The slot table of the current execution context, or `None` when
    /// there is no context to bind into.
    fn current(&self) -> Option<SlotTable>;

    fn is_available(&self) -> bool {
        self.current().is_some()
    }

    /// Returns the entry currently bound to `slot`, if any.
    fn get(&self, slot: &SlotId) -> Option<Arc<SlotEntry>> {
        self.current()?.get(slot)
    }

    /// Binds `slot` to `value`, or clears it when `value` is `None`.
    fn set(&self, slot: &SlotId, value: Option<Arc<SlotEntry>>) {
        match self.current() {
            Some(table) => table.set(slot, value),
            None => {
                tracing::warn!(%slot, store = self.name(), "no active context, binding dropped");
            }
        }
    }
}

/// The binding a root holder writes into its slot.
///
/// Holds the shared resource and the holders currently open on it, in the
/// order they were opened.
#[derive(Debug)]
pub struct SlotEntry {
    resource: Arc<dyn Any + Send + Sync>,
    holders: Mutex<HolderStack>,
}

#[derive(Debug, Default)]
struct HolderStack {
    next_id: u64,
    open: Vec<u64>,
}

impl SlotEntry {
    pub(crate) fn new(resource: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            resource,
            holders: Mutex::new(HolderStack::default()),
        }
    }

    pub(crate) fn resource(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.resource)
    }

    /// Pushes a new holder on top of the stack and returns its id.
    pub(crate) fn enter(&self) -> u64 {
        let mut holders = self.holders.lock();
        let id = holders.next_id;
        holders.next_id += 1;
        holders.open.push(id);
        id
    }

    /// Returns the 1-based position of holder `id` (0 if it is not open)
    /// and the number of open holders.
    pub(crate) fn depth_of(&self, id: u64) -> (usize, usize) {
        let holders = self.holders.lock();
        let depth = holders
            .open
            .iter()
            .position(|&open| open == id)
            .map_or(0, |index| index + 1);
        (depth, holders.open.len())
    }

    /// Removes holder `id` wherever it sits in the stack.
    pub(crate) fn leave(&self, id: u64) {
        self.holders.lock().open.retain(|&open| open != id);
    }

    /// Number of holders that have acquired this entry and not yet released it.
    pub fn open_count(&self) -> usize {
        self.holders.lock().open.len()
    }
}

/// Which [`ContextStore`] a [`ScopeContext`](crate::ScopeContext) binds into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Per-thread bindings.
    #[default]
    Thread,
    /// Per-request bindings; requires an active [`RequestScope`].
    Request,
    /// Request bindings inside a [`RequestScope`], thread bindings otherwise.
    Auto,
}

impl StoreKind {
    /// Builds the store for this kind.
    pub fn select(self) -> Arc<dyn ContextStore> {
        match self {
            StoreKind::Thread => Arc::new(ThreadStore),
            StoreKind::Request => Arc::new(RequestStore),
            StoreKind::Auto => Arc::new(AutoStore),
        }
    }
}

/// Uses the request bag when a [`RequestScope`] is active and falls back to
/// per-thread storage otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoStore;

impl AutoStore {
    /// The store the current execution context resolves to.
    pub fn delegate(&self) -> &'static dyn ContextStore {
        if RequestScope::is_active() {
            &RequestStore
        } else {
            &ThreadStore
        }
    }
}

impl ContextStore for AutoStore {
    fn name(&self) -> &'static str {
        self.delegate().name()
    }

    fn current(&self) -> Option<SlotTable> {
        self.delegate().current()
    }
}
