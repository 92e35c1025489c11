//! System Memory Module
//!
//! The cache refuses memory ceilings the machine could never back. How much
//! memory is available is asked of a [`MemoryProbe`], so tests and embedders
//! can substitute their own answer.

use parking_lot::Mutex;
use sysinfo::System;

/// Reports how many bytes of memory the system can still hand out.
pub trait MemoryProbe: Send + Sync {
    fn available_memory(&self) -> u64;
}

impl<F> MemoryProbe for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn available_memory(&self) -> u64 {
        self()
    }
}

// == System Memory ==
/// Probe backed by `sysinfo`; refreshes memory figures on every call.
pub struct SystemMemory {
    system: Mutex<System>,
}

impl SystemMemory {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemMemory").finish_non_exhaustive()
    }
}

impl MemoryProbe for SystemMemory {
    fn available_memory(&self) -> u64 {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.available_memory()
    }
}
