use std::future::Future;

use super::{ContextStore, SlotTable};

tokio::task_local! {
    static REQUEST: SlotTable;
}

/// Clears the request's table when the request ends, including when its
/// future is dropped before completion.
struct RequestEnd(SlotTable);

impl Drop for RequestEnd {
    fn drop(&mut self) {
        let live = self.0.clear();
        if live > 0 {
            tracing::debug!(live, "request ended with bound slots, clearing them");
        }
    }
}

/// Opens per-request storage for [`RequestStore`].
///
/// Everything bound while the scope runs is cleared when it ends, whether or
/// not the root holders released it.
///
/// ## Example
///
/// ```no_run
/// use scope_fnd::RequestScope;
///
/// # async fn handle() {}
/// # async fn serve() {
/// let response = RequestScope::run(handle()).await;
/// # }
/// ```
#[derive(Debug)]
pub struct RequestScope;

impl RequestScope {
    /// Runs `future` as one request with a fresh set of bindings.
    pub async fn run<F: Future>(future: F) -> F::Output {
        let table = SlotTable::new();
        let _end = RequestEnd(table.clone());
        REQUEST.scope(table, future).await
    }

    /// Runs `f` synchronously as one request with a fresh set of bindings.
    pub fn run_sync<R>(f: impl FnOnce() -> R) -> R {
        let table = SlotTable::new();
        let _end = RequestEnd(table.clone());
        REQUEST.sync_scope(table, f)
    }

    /// Returns `true` when called from within [`run`](Self::run) or
    /// [`run_sync`](Self::run_sync).
    pub fn is_active() -> bool {
        REQUEST.try_with(|_| ()).is_ok()
    }
}

/// Per-request bindings. Unavailable outside a [`RequestScope`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestStore;

impl ContextStore for RequestStore {
    fn name(&self) -> &'static str {
        "request"
    }

    fn current(&self) -> Option<SlotTable> {
        REQUEST.try_with(SlotTable::clone).ok()
    }
}
