//! Counting admission gate bounding concurrent build tasks.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A counting semaphore with a fixed number of slots.
///
/// A task holds a [`Permit`] while its external processes run. The permit
/// returns its slot when dropped, so release happens on every exit path,
/// including errors and panics.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    in_use: Mutex<usize>,
    released: Condvar,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        AdmissionGate {
            capacity: capacity.max(1),
            in_use: Mutex::new(0),
            released: Condvar::new(),
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_use(&self) -> usize {
        *self.lock()
    }

    /// Block until a slot is free, then take it.
    pub fn acquire(&self) -> Permit<'_> {
        let mut in_use = self.lock();
        while *in_use >= self.capacity {
            in_use = self
                .released
                .wait(in_use)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_use += 1;
        Permit { gate: self }
    }

    /// Block until every slot has been released.
    ///
    /// This is the barrier after which no admitted task is still running.
    pub fn drain(&self) {
        let mut in_use = self.lock();
        while *in_use > 0 {
            in_use = self
                .released
                .wait(in_use)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release(&self) {
        let mut in_use = self.lock();
        *in_use = in_use.saturating_sub(1);
        drop(in_use);
        self.released.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A held slot of an [`AdmissionGate`].
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
