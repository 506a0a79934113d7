//! # Slot cells
//!
//! A [`SlotCell`] holds at most one value which is replaced as a whole on each write, so a reader
//! never observes a partially written value.

use std::sync::{Arc, Mutex, MutexGuard};

/// A shared, single value slot.
///
/// Clones refer to the same slot.
#[derive(Debug)]
pub struct SlotCell<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> SlotCell<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the value in the slot.
    pub fn set(&self, value: T) {
        *self.lock() = Some(value);
    }

    /// Take the value out of the slot, leaving it empty.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // Values are only ever swapped in whole, so a poisoned slot still holds a valid value
        match self.inner.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        }
    }
}

impl<T: Clone> SlotCell<T> {
    /// Get a copy of the value in the slot, leaving it in place.
    pub fn get(&self) -> Option<T> {
        self.lock().clone()
    }
}

impl<T> Clone for SlotCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for SlotCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
