//! Rhodonea ("rose") curve parameters and sampling.
//!
//! A rose curve in polar form is `rho = r * sin(n / d * theta)`. Each sample is
//! projected onto the map by a geodesic offset from the curve center, so the
//! polyline stays a true rose on the ground regardless of latitude.
//!
//! Sampling is a pure function of [`CurveParams`]: identical parameters always
//! produce a bit-identical point sequence. Persisted collections are replayed
//! through the same function, so the sampling rule (including the extra lap
//! taken for fractional `d`) must not drift.

#[cfg(test)]
#[path = "curve_test.rs"]
mod curve_test;

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geo::{GeometryKind, LatLng, compute_offset};

/// Full parameter set for one curve. Field names on the wire match the
/// feature property bag (`strokeWeight`, `strokeColor`, flat `lat`/`lng`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    pub name: String,
    #[serde(flatten)]
    pub center: LatLng,
    /// Radius of the enclosing circle, in meters.
    pub r: f64,
    pub n: f64,
    pub d: f64,
    /// Extra clockwise rotation, in degrees.
    pub rotation: f64,
    /// Number of sampling steps; the curve has `nodes_count + 1` points.
    pub nodes_count: u32,
    #[serde(rename = "strokeWeight")]
    pub stroke_weight: f64,
    /// `#RRGGBB`
    #[serde(rename = "strokeColor")]
    pub stroke_color: String,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            name: String::new(),
            center: LatLng::new(0.0, 0.0),
            r: 1000.0,
            n: 3.0,
            d: 1.0,
            rotation: 0.0,
            nodes_count: 1000,
            stroke_weight: 2.0,
            stroke_color: "#311807".into(),
        }
    }
}

impl CurveParams {
    /// Encode as a feature property bag.
    #[must_use]
    pub fn to_props(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Decode from a feature property bag. Unknown keys (`layerName`, `_id`)
    /// are ignored; `None` when a curve field is missing or mistyped.
    #[must_use]
    pub fn from_props(props: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        serde_json::from_value(serde_json::Value::Object(props.clone())).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("curve needs at least one sampling step")]
    NoSamples,
    #[error("curve denominator must be a positive number, got {0}")]
    InvalidDivisor(f64),
}

impl crate::error::ErrorCode for CurveError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoSamples => "E_CURVE_NO_SAMPLES",
            Self::InvalidDivisor(_) => "E_CURVE_INVALID_DIVISOR",
        }
    }
}

/// An open polyline of sampled curve points.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub points: Vec<LatLng>,
}

impl Curve {
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `GeoJSON` `LineString` view of the polyline.
    #[must_use]
    pub fn to_geojson(&self) -> serde_json::Value {
        let coordinates: Vec<[f64; 2]> = self.points.iter().map(|p| p.to_lng_lat()).collect();
        serde_json::json!({
            "type": GeometryKind::LineString,
            "coordinates": coordinates,
        })
    }
}

/// Number of full turns sampled: `d` itself when integral, otherwise one lap
/// past its integer part so petals that don't align still visually close.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn laps(d: f64) -> f64 {
    if d.floor() == d { d } else { d.floor() + 1.0 }
}

/// Sample the rose curve described by `params`.
///
/// # Errors
///
/// Returns `NoSamples` when `nodes_count` is zero and `InvalidDivisor` when
/// `d` is not a finite positive number.
pub fn generate(params: &CurveParams) -> Result<Curve, CurveError> {
    if params.nodes_count == 0 {
        return Err(CurveError::NoSamples);
    }
    if !params.d.is_finite() || params.d <= 0.0 {
        return Err(CurveError::InvalidDivisor(params.d));
    }

    let bearing_offset = 90.0 + params.rotation;
    let alpha = 2.0 * PI * laps(params.d) / f64::from(params.nodes_count);

    let points = (0..=params.nodes_count)
        .map(|i| {
            let theta = alpha * f64::from(i);
            let radius = params.r * (params.n / params.d * theta).sin();
            compute_offset(params.center, radius, theta * 180.0 / PI + bearing_offset)
        })
        .collect();

    Ok(Curve { points })
}
