//! Shared application context.
//!
//! DESIGN
//! ======
//! `AppContext` is handed to the editor and timeline at construction instead
//! of either reaching through a global. It holds the one `LayerManager` plus
//! the external collaborators (layers service, map surface, busy indicator,
//! notifier). Clone is cheap: every field is Arc-wrapped.
//!
//! The layer manager sits behind a `std::sync::Mutex`. Callers take the
//! guard for a synchronous burst of mutations and drop it before awaiting
//! any remote call, so one structural change always completes before the
//! next starts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::LayersApi;
use crate::busy::BusyIndicator;
use crate::layers::LayerManager;
use crate::map::MapSurface;
use crate::notice::Notifier;

#[derive(Clone)]
pub struct AppContext {
    pub layers: Arc<Mutex<LayerManager>>,
    pub api: Arc<dyn LayersApi>,
    pub map: Arc<dyn MapSurface>,
    pub busy: BusyIndicator,
    pub notifier: Arc<dyn Notifier>,
}

impl AppContext {
    #[must_use]
    pub fn new(api: Arc<dyn LayersApi>, map: Arc<dyn MapSurface>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            layers: Arc::new(Mutex::new(LayerManager::new())),
            api,
            map,
            busy: BusyIndicator::new(),
            notifier,
        }
    }

    /// Lock the layer manager. A poisoned lock is recovered: the manager
    /// holds no invariant a panicking holder could have half-applied.
    pub fn layers(&self) -> MutexGuard<'_, LayerManager> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
