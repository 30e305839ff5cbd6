use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::SlotEntry;
use crate::SlotId;

/// The bindings of one execution context.
///
/// Cloning yields another handle to the same table, so a root holder can
/// unbind itself from the context it was opened in even when it is
/// released somewhere else.
#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    slots: Arc<Mutex<HashMap<SlotId, Arc<SlotEntry>>>>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &SlotId) -> Option<Arc<SlotEntry>> {
        self.slots.lock().get(slot).cloned()
    }

    pub fn set(&self, slot: &SlotId, value: Option<Arc<SlotEntry>>) {
        // The replaced entry is dropped after the lock is released; its
        // resource's Drop may open scopes of its own.
        let replaced = {
            let mut slots = self.slots.lock();
            match value {
                Some(entry) => slots.insert(slot.clone(), entry),
                None => slots.remove(slot),
            }
        };
        drop(replaced);
    }

    /// Clears `slot` only if it is still bound to `entry`.
    pub(crate) fn unbind(&self, slot: &SlotId, entry: &Arc<SlotEntry>) -> bool {
        let removed = {
            let mut slots = self.slots.lock();
            match slots.get(slot) {
                Some(bound) if Arc::ptr_eq(bound, entry) => slots.remove(slot),
                _ => None,
            }
        };
        removed.is_some()
    }

    /// Clears every slot and returns how many were bound.
    pub(crate) fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.slots.lock());
        drained.len()
    }

    /// Number of bound slots, for diagnostics such as leak checks at the
    /// end of a request.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if both handles refer to the same execution context.
    pub fn same_table(&self, other: &SlotTable) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }
}
