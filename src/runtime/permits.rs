//! Counting admission gate for worker threads.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct Permits {
    capacity: usize,
    free: Mutex<usize>,
    released: Condvar,
}

/// Holds one permit; dropping it hands the permit back.
#[derive(Debug)]
pub struct PermitGuard<'a> {
    permits: &'a Permits,
}

impl Permits {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            free: Mutex::new(capacity),
            released: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        *self.lock()
    }

    /// Blocks until a permit is free.
    pub fn acquire(&self) -> PermitGuard<'_> {
        let mut free = self.lock();
        while *free == 0 {
            free = self
                .released
                .wait(free)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *free -= 1;
        PermitGuard { permits: self }
    }

    fn release(&self) {
        let mut free = self.lock();
        *free = (*free + 1).min(self.capacity);
        self.released.notify_one();
    }

    // The counter stays consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        self.permits.release();
    }
}
