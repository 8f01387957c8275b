use std::sync::{Mutex, MutexGuard};

/// Serializes accelerator use across concurrent pipeline runs.
///
/// A run that picked the accelerator takes a lease, checks free memory
/// again while holding it and keeps it until its last model stage has
/// released. Two runs never pass the check against the same headroom.
#[derive(Default)]
pub struct AcceleratorGate {
    lock: Mutex<()>,
}

/// Exclusive accelerator access, released on drop.
pub struct AcceleratorLease<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl AcceleratorGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no other run holds the accelerator.
    pub fn acquire(&self) -> AcceleratorLease<'_> {
        // A panicked holder cannot leave the unit value inconsistent.
        let guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        AcceleratorLease { _guard: guard }
    }
}
