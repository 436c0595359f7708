//! Map surface seam.
//!
//! Rendering, projection and viewport events belong to the map SDK. The
//! editor and timeline only need to read the viewport and move it, which is
//! what [`MapSurface`] exposes. [`StaticMap`] is an in-process surface whose
//! viewport is set explicitly; the binary and the tests drive it directly.

#[cfg(test)]
#[path = "map_test.rs"]
mod map_test;

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::geo::{Bbox, LatLng};

/// Fallback center when geolocation is denied or unavailable (London).
pub const DEFAULT_LOCATION: LatLng = LatLng::new(51.509_865, -0.118_092);

pub trait MapSurface: Send + Sync {
    /// Current viewport center.
    fn center(&self) -> LatLng;

    /// Current viewport bounds, `None` before the map has laid out.
    fn bounds(&self) -> Option<Bbox>;

    /// Move the viewport so `bbox` is fully visible.
    fn fit_bounds(&self, bbox: Bbox);
}

/// Best-effort initial center: the geolocated position, else [`DEFAULT_LOCATION`].
#[must_use]
pub fn initial_center(geolocated: Option<LatLng>) -> LatLng {
    geolocated.unwrap_or(DEFAULT_LOCATION)
}

#[derive(Debug, Clone, Copy)]
struct Viewport {
    center: LatLng,
    bounds: Option<Bbox>,
}

/// Map surface with an explicitly controlled viewport.
#[derive(Debug)]
pub struct StaticMap {
    viewport: Mutex<Viewport>,
}

impl StaticMap {
    #[must_use]
    pub fn new(center: LatLng, bounds: Option<Bbox>) -> Self {
        Self { viewport: Mutex::new(Viewport { center, bounds }) }
    }

    /// Viewport of the given half-extent in degrees around `center`.
    #[must_use]
    pub fn around(center: LatLng, half_span_deg: f64) -> Self {
        let bounds = Bbox::new(
            center.lng - half_span_deg,
            center.lat - half_span_deg,
            center.lng + half_span_deg,
            center.lat + half_span_deg,
        );
        Self::new(center, Some(bounds))
    }

    /// Recenter, shifting the bounds by the same amount.
    pub fn pan_to(&self, center: LatLng) {
        let mut viewport = self.viewport.lock().unwrap_or_else(PoisonError::into_inner);
        let d_lat = center.lat - viewport.center.lat;
        let d_lng = center.lng - viewport.center.lng;
        viewport.bounds = viewport
            .bounds
            .map(|b| Bbox::new(b.min_lng + d_lng, b.min_lat + d_lat, b.max_lng + d_lng, b.max_lat + d_lat));
        viewport.center = center;
        debug!(lat = center.lat, lng = center.lng, "map panned");
    }
}

impl MapSurface for StaticMap {
    fn center(&self) -> LatLng {
        self.viewport.lock().unwrap_or_else(PoisonError::into_inner).center
    }

    fn bounds(&self) -> Option<Bbox> {
        self.viewport.lock().unwrap_or_else(PoisonError::into_inner).bounds
    }

    fn fit_bounds(&self, bbox: Bbox) {
        let mut viewport = self.viewport.lock().unwrap_or_else(PoisonError::into_inner);
        viewport.center = bbox.center();
        viewport.bounds = Some(bbox);
        debug!(bbox = %bbox, "map fitted to bounds");
    }
}
