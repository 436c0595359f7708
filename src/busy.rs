//! Reference-counted busy indicator.
//!
//! Every remote call holds a [`BusyGuard`] for its duration. Overlapping
//! calls share one "loading" state: the indicator turns on with the first
//! guard and off when the last guard drops, whichever way the call exits.

#[cfg(test)]
#[path = "busy_test.rs"]
mod busy_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct BusyIndicator {
    count: Arc<AtomicUsize>,
}

impl BusyIndicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one more request in flight until the returned guard drops.
    #[must_use = "the indicator stops as soon as the guard is dropped"]
    pub fn start(&self) -> BusyGuard {
        if self.count.fetch_add(1, Ordering::SeqCst) == 0 {
            debug!("busy indicator on");
        }
        BusyGuard { count: Arc::clone(&self.count) }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// Number of requests currently in flight.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Releases one busy count on drop.
#[derive(Debug)]
pub struct BusyGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            debug!("busy indicator off");
        }
    }
}
