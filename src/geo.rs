//! Geodesic primitives: coordinates, bounding boxes and spherical offsets.
//!
//! DESIGN
//! ======
//! Projection and rendering belong to the map SDK. This module only carries
//! the one primitive curve sampling needs (moving a point by a signed
//! distance along a bearing on a sphere) plus the `GeoJSON` shapes that
//! cross the wire to the layers service.

#[cfg(test)]
#[path = "geo_test.rs"]
mod geo_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sphere radius used by the map SDK's spherical helpers, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

// =============================================================================
// COORDINATES
// =============================================================================

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `GeoJSON` axis order: `[lng, lat]`.
    #[must_use]
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    #[must_use]
    pub fn from_lng_lat(coordinates: [f64; 2]) -> Self {
        Self { lat: coordinates[1], lng: coordinates[0] }
    }
}

/// Move `from` by `distance_m` meters along `heading_deg` (degrees clockwise
/// from north) on a sphere of radius [`EARTH_RADIUS_M`].
///
/// A negative distance lands on the opposite bearing, which is what rose
/// curves with a negative polar radius rely on.
#[must_use]
pub fn compute_offset(from: LatLng, distance_m: f64, heading_deg: f64) -> LatLng {
    let distance = distance_m / EARTH_RADIUS_M;
    let heading = heading_deg.to_radians();
    let from_lat = from.lat.to_radians();
    let from_lng = from.lng.to_radians();

    let (sin_distance, cos_distance) = distance.sin_cos();
    let (sin_from_lat, cos_from_lat) = from_lat.sin_cos();

    let sin_lat = (cos_distance * sin_from_lat + sin_distance * cos_from_lat * heading.cos()).clamp(-1.0, 1.0);
    let d_lng = (sin_distance * cos_from_lat * heading.sin()).atan2(cos_distance - sin_from_lat * sin_lat);

    LatLng::new(sin_lat.asin().to_degrees(), wrap_lng((from_lng + d_lng).to_degrees()))
}

/// Wrap a longitude into `[-180, 180)`. Values already in range pass through untouched.
#[must_use]
pub fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..180.0).contains(&lng) {
        return lng;
    }
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

// =============================================================================
// BOUNDING BOX
// =============================================================================

/// Axis-aligned lng/lat box, ordered the way the layers service expects
/// (`minLng,minLat,maxLng,maxLat`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl Bbox {
    #[must_use]
    pub const fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self { min_lng, min_lat, max_lng, max_lat }
    }

    /// Build from the south-west and north-east corners reported by the map.
    #[must_use]
    pub fn from_corners(south_west: LatLng, north_east: LatLng) -> Self {
        Self::new(south_west.lng, south_west.lat, north_east.lng, north_east.lat)
    }

    /// Read a polygon envelope's bbox from its first ring: corner 0 is the
    /// minimum and corner 2 the maximum.
    #[must_use]
    pub fn from_envelope(envelope: &PolygonGeometry) -> Option<Self> {
        let ring = envelope.coordinates.first()?;
        let min = ring.first()?;
        let max = ring.get(2)?;
        Some(Self::new(min[0], min[1], max[0], max[1]))
    }

    /// Serialize as the `in_bbox` query value.
    #[must_use]
    pub fn to_query(&self) -> String {
        self.to_string()
    }

    #[must_use]
    pub fn center(&self) -> LatLng {
        LatLng::new((self.min_lat + self.max_lat) / 2.0, (self.min_lng + self.max_lng) / 2.0)
    }

    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        (self.min_lng..=self.max_lng).contains(&point.lng) && (self.min_lat..=self.max_lat).contains(&point.lat)
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.min_lng, self.min_lat, self.max_lng, self.max_lat)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid bbox '{0}': expected minLng,minLat,maxLng,maxLat")]
pub struct BboxParseError(pub String);

impl FromStr for Bbox {
    type Err = BboxParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let values = raw
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| BboxParseError(raw.to_owned()))?;
        match values.as_slice() {
            [min_lng, min_lat, max_lng, max_lat] => Ok(Self::new(*min_lng, *min_lat, *max_lng, *max_lat)),
            _ => Err(BboxParseError(raw.to_owned())),
        }
    }
}

// =============================================================================
// GEOJSON SHAPES
// =============================================================================

/// `GeoJSON` geometry type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

/// `{"type": "Point", "coordinates": [lng, lat]}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub coordinates: [f64; 2],
}

impl PointGeometry {
    #[must_use]
    pub fn new(at: LatLng) -> Self {
        Self { kind: GeometryKind::Point, coordinates: at.to_lng_lat() }
    }

    #[must_use]
    pub fn lat_lng(&self) -> LatLng {
        LatLng::from_lng_lat(self.coordinates)
    }
}

/// `{"type": "Polygon", "coordinates": [[[lng, lat], ...]]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonGeometry {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl PolygonGeometry {
    /// Closed rectangular ring covering `bbox`, in the corner order the
    /// server writes envelopes.
    #[must_use]
    pub fn from_bbox(bbox: Bbox) -> Self {
        Self {
            kind: GeometryKind::Polygon,
            coordinates: vec![vec![
                [bbox.min_lng, bbox.min_lat],
                [bbox.min_lng, bbox.max_lat],
                [bbox.max_lng, bbox.max_lat],
                [bbox.max_lng, bbox.min_lat],
                [bbox.min_lng, bbox.min_lat],
            ]],
        }
    }
}
