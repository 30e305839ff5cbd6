//! The scoped resource guard.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::BoxError;
use crate::store::{SlotEntry, SlotTable};
use crate::{Error, NestingPolicy, ScopeContext, SlotId};

/// Resources that need explicit teardown when their outermost scope ends.
///
/// Use [`ScopeContext::acquire_disposable`] (or
/// [`ScopedResource::new_disposable`]) to have the root holder call
/// [`dispose`](Self::dispose) on release. Values acquired through the plain
/// constructors are only dropped.
pub trait Dispose {
    type Error: std::error::Error + Send + Sync + 'static;

    fn dispose(&self) -> Result<(), Self::Error>;
}

pub(crate) type Disposer<T> = fn(&T) -> Result<(), BoxError>;

pub(crate) fn dispose_with<T: Dispose>(resource: &T) -> Result<(), BoxError> {
    resource.dispose().map_err(|e| Box::new(e) as BoxError)
}

/// A resource bound to the current execution context for the lifetime of
/// the outermost holder.
///
/// The first holder opened for a slot runs the factory, binds the result and
/// becomes the root. Holders opened for the same slot while the root is
/// alive share its instance and never run the factory. When the root is
/// released the slot is cleared first, then the resource is disposed.
///
/// Holders must be released innermost first. Dropping a holder releases it.
///
/// ## Example
///
/// ```no_run
/// use scope_fnd::ScopedResource;
///
/// struct Session;
///
/// let outer = ScopedResource::<Session>::new("db", || Session)?;
/// {
///     let inner = ScopedResource::<Session>::new("db", || Session)?;
///     assert!(!inner.is_root());
/// }
/// outer.close()?;
/// # Ok::<(), scope_fnd::Error>(())
/// ```
#[must_use = "the resource is released as soon as the holder is dropped"]
pub struct ScopedResource<T: Send + Sync + 'static> {
    slot: SlotId,
    current: Arc<T>,
    entry: Arc<SlotEntry>,
    id: u64,
    /// Table the root bound its entry into; `None` for nested holders.
    home: Option<SlotTable>,
    released: bool,
    store: &'static str,
    nesting: NestingPolicy,
    disposer: Option<Disposer<T>>,
}

impl<T: Send + Sync + 'static> ScopedResource<T> {
    /// Opens a holder for `key` in the [global context](ScopeContext::global).
    ///
    /// `factory` runs only if nothing is bound to the slot yet. It may return
    /// `T` or `Option<T>`; `None` fails with [`Error::InvalidFactoryResult`].
    pub fn new<F, O>(key: &str, factory: F) -> Result<Self, Error>
    where
        F: FnOnce() -> O,
        O: Into<Option<T>>,
    {
        ScopeContext::global().acquire(key, factory)
    }

    /// Like [`new`](Self::new), disposing the resource when the root is released.
    pub fn new_disposable<F, O>(key: &str, factory: F) -> Result<Self, Error>
    where
        T: Dispose,
        F: FnOnce() -> O,
        O: Into<Option<T>>,
    {
        ScopeContext::global().acquire_disposable(key, factory)
    }

    pub(crate) fn open<F>(
        ctx: &ScopeContext,
        key: &str,
        disposer: Option<Disposer<T>>,
        factory: F,
    ) -> Result<Self, Error>
    where
        F: FnOnce() -> Result<Option<T>, BoxError>,
    {
        let slot = SlotId::new::<T>(&ctx.settings().namespace, key);
        let store = ctx.store();

        // Resolved once, so release reaches this context from anywhere.
        let Some(table) = store.current() else {
            return Err(Error::NoExecutionContext {
                slot: slot.to_string(),
                store: store.name(),
            });
        };

        let parent = table.get(&slot);
        let root = parent.is_none();
        tracing::debug!(%slot, root, store = store.name(), "opening scope");

        let (current, entry, home) = match parent {
            Some(entry) => {
                // Any entry can be set into any slot through a store, so
                // the type is checked rather than assumed.
                let current = entry
                    .resource()
                    .downcast::<T>()
                    .map_err(|_| Error::SlotTypeMismatch {
                        slot: slot.to_string(),
                    })?;
                (current, entry, None)
            }
            None => {
                let current = match factory() {
                    Ok(Some(value)) => Arc::new(value),
                    Ok(None) => {
                        return Err(Error::InvalidFactoryResult {
                            slot: slot.to_string(),
                        })
                    }
                    Err(source) => {
                        return Err(Error::Factory {
                            slot: slot.to_string(),
                            source,
                        })
                    }
                };
                let entry = Arc::new(SlotEntry::new(current.clone()));
                table.set(&slot, Some(Arc::clone(&entry)));
                (current, entry, Some(table))
            }
        };
        let id = entry.enter();

        Ok(Self {
            slot,
            current,
            entry,
            id,
            home,
            released: false,
            store: store.name(),
            nesting: ctx.settings().nesting,
            disposer,
        })
    }

    /// The shared resource. Remains readable after release but is no
    /// longer bound to the context.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// A new handle to the shared resource; every holder of one slot
    /// returns the same allocation.
    pub fn shared(&self) -> Arc<T> {
        Arc::clone(&self.current)
    }

    /// `true` if this holder created the resource and is responsible for teardown.
    pub fn is_root(&self) -> bool {
        self.home.is_some()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn slot(&self) -> &SlotId {
        &self.slot
    }

    /// Releases this holder.
    ///
    /// Only the root clears the slot and disposes the resource; for other
    /// holders this just ends their participation. Calling it again is a no-op.
    ///
    /// Under [`NestingPolicy::Strict`] a release while inner holders are
    /// still open fails with [`Error::OutOfOrderRelease`] and the holder
    /// stays open. A disposal failure is returned after the slot was cleared.
    pub fn release(&mut self) -> Result<(), Error> {
        self.release_with(self.nesting)
    }

    /// Releases the holder, consuming it.
    pub fn close(mut self) -> Result<(), Error> {
        self.release()
    }

    fn release_with(&mut self, nesting: NestingPolicy) -> Result<(), Error> {
        if self.released {
            return Ok(());
        }

        let (depth, open) = self.entry.depth_of(self.id);
        if depth != open {
            if nesting == NestingPolicy::Strict {
                return Err(Error::OutOfOrderRelease {
                    slot: self.slot.to_string(),
                    depth,
                    open,
                });
            }
            tracing::warn!(slot = %self.slot, depth, open, "scope released out of order");
        }

        tracing::debug!(slot = %self.slot, root = self.is_root(), "releasing scope");
        self.released = true;
        self.entry.leave(self.id);
        let Some(home) = &self.home else {
            return Ok(());
        };

        tracing::trace!(slot = %self.slot, "clearing root scope");
        if !home.unbind(&self.slot, &self.entry) {
            tracing::debug!(slot = %self.slot, "root binding already cleared");
        }

        let Some(dispose) = self.disposer else {
            return Ok(());
        };
        tracing::trace!(slot = %self.slot, "disposing root scope resource");
        dispose(&self.current).map_err(|source| Error::Disposal {
            slot: self.slot.to_string(),
            source,
        })
    }
}

impl<T: Send + Sync + 'static> Deref for ScopedResource<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.current
    }
}

impl<T: Send + Sync + 'static> Drop for ScopedResource<T> {
    fn drop(&mut self) {
        if let Err(error) = self.release_with(NestingPolicy::Permissive) {
            tracing::warn!(slot = %self.slot, %error, "failed to release scope on drop");
        }
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for ScopedResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedResource")
            .field("slot", &self.slot)
            .field("root", &self.is_root())
            .field("id", &self.id)
            .field("released", &self.released)
            .field("store", &self.store)
            .finish()
    }
}
