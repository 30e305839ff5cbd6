use super::{ContextStore, SlotTable};

thread_local! {
    static SLOTS: SlotTable = SlotTable::default();
}

/// Per-thread bindings.
///
/// A binding lives until it is cleared or the thread exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadStore;

impl ContextStore for ThreadStore {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn current(&self) -> Option<SlotTable> {
        SLOTS.try_with(SlotTable::clone).ok()
    }
}
