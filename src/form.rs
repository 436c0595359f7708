//! Curve form: the editable field values behind one list item.
//!
//! DESIGN
//! ======
//! Values are held as strings, the way an HTML form holds them, so a user
//! can type an incomplete number without losing it. `validate` is the only
//! path from the form to `CurveParams`: it re-marks each field it checks and
//! either returns complete parameters or the list of offending fields, never
//! a partially parsed set.

#[cfg(test)]
#[path = "form_test.rs"]
mod form_test;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rand::Rng;

use crate::curve::CurveParams;
use crate::geo::LatLng;

/// One input of the curve form. Keys match the feature property bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Name,
    R,
    N,
    D,
    Lng,
    Lat,
    Rotation,
    NodesCount,
    StrokeWeight,
    StrokeColor,
}

impl FormField {
    pub const ALL: [Self; 10] = [
        Self::Name,
        Self::R,
        Self::N,
        Self::D,
        Self::Lng,
        Self::Lat,
        Self::Rotation,
        Self::NodesCount,
        Self::StrokeWeight,
        Self::StrokeColor,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::R => "r",
            Self::N => "n",
            Self::D => "d",
            Self::Lng => "lng",
            Self::Lat => "lat",
            Self::Rotation => "rotation",
            Self::NodesCount => "nodes_count",
            Self::StrokeWeight => "strokeWeight",
            Self::StrokeColor => "strokeColor",
        }
    }

    /// Whether this field is one of the two center coordinates.
    #[must_use]
    pub fn is_coordinate(self) -> bool {
        matches!(self, Self::Lat | Self::Lng)
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please correct the errors below: {}", join_fields(.0))]
    InvalidFields(Vec<FormField>),
    #[error("no curves: please add at least one rhodonea")]
    NoCurves,
}

impl crate::error::ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFields(_) => "E_INVALID_FIELDS",
            Self::NoCurves => "E_NO_CURVES",
        }
    }
}

fn join_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// FORM
// =============================================================================

/// Field values, invalid marks and coordinate lock for the item being edited.
#[derive(Debug, Clone)]
pub struct CurveForm {
    values: BTreeMap<FormField, String>,
    invalid: BTreeSet<FormField>,
    coordinates_locked: bool,
}

impl CurveForm {
    /// A form holding the static defaults, centered on `0,0`.
    #[must_use]
    pub fn new() -> Self {
        let mut form = Self { values: BTreeMap::new(), invalid: BTreeSet::new(), coordinates_locked: false };
        form.populate(&CurveParams::default());
        form
    }

    #[must_use]
    pub fn value(&self, field: FormField) -> &str {
        self.values.get(&field).map_or("", String::as_str)
    }

    /// Set a raw value. Coordinate locking is enforced by the editor, not here.
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    /// Fields marked invalid by the last validation pass, in form order.
    #[must_use]
    pub fn invalid_fields(&self) -> Vec<FormField> {
        self.invalid.iter().copied().collect()
    }

    #[must_use]
    pub fn coordinates_locked(&self) -> bool {
        self.coordinates_locked
    }

    pub fn lock_coordinates(&mut self, locked: bool) {
        self.coordinates_locked = locked;
    }

    /// Check every field and build parameters from them.
    ///
    /// `name` is only required when `submitting` (committing the item to the
    /// list); live previews skip it and clear any stale mark on it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFields` listing each empty, unparseable or out of
    /// domain field. The marks stay on the form until the next pass.
    pub fn validate(&mut self, submitting: bool) -> Result<CurveParams, ValidationError> {
        for field in FormField::ALL {
            let ok = if field == FormField::Name && !submitting {
                true
            } else {
                self.check(field)
            };
            if ok {
                self.invalid.remove(&field);
            } else {
                self.invalid.insert(field);
            }
        }
        if !self.invalid.is_empty() {
            return Err(ValidationError::InvalidFields(self.invalid_fields()));
        }

        let center = LatLng::new(self.number(FormField::Lat), self.number(FormField::Lng));
        Ok(CurveParams {
            name: self.value(FormField::Name).to_owned(),
            center,
            r: self.number(FormField::R),
            n: self.number(FormField::N),
            d: self.number(FormField::D),
            rotation: self.number(FormField::Rotation),
            nodes_count: self.value(FormField::NodesCount).trim().parse().unwrap_or(0),
            stroke_weight: self.number(FormField::StrokeWeight),
            stroke_color: self.value(FormField::StrokeColor).trim().to_owned(),
        })
    }

    /// Overwrite every field with `params`.
    pub fn populate(&mut self, params: &CurveParams) {
        self.set(FormField::Name, params.name.clone());
        self.set(FormField::R, params.r.to_string());
        self.set(FormField::N, params.n.to_string());
        self.set(FormField::D, params.d.to_string());
        self.set(FormField::Lng, params.center.lng.to_string());
        self.set(FormField::Lat, params.center.lat.to_string());
        self.set(FormField::Rotation, params.rotation.to_string());
        self.set(FormField::NodesCount, params.nodes_count.to_string());
        self.set(FormField::StrokeWeight, params.stroke_weight.to_string());
        self.set(FormField::StrokeColor, params.stroke_color.clone());
    }

    /// Randomize shape and stroke. Name and center are left alone.
    pub fn set_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.set(FormField::R, rng.random_range(1000..=4000).to_string());
        self.set(FormField::N, rng.random_range(1..=20).to_string());
        self.set(FormField::D, rng.random_range(1..=20).to_string());
        self.set(FormField::Rotation, rng.random_range(0..=360).to_string());
        self.set(FormField::NodesCount, rng.random_range(500..=1000).to_string());
        self.set(FormField::StrokeWeight, rng.random_range(1..=5).to_string());
        self.set(FormField::StrokeColor, format!("#{:06X}", rng.random_range(0..=0x00FF_FFFF)));
    }

    pub fn clear_name(&mut self) {
        self.set(FormField::Name, "");
    }

    /// Write a center rounded to six decimals (about 0.1 m).
    pub fn set_center(&mut self, center: LatLng) {
        self.set(FormField::Lat, round6(center.lat).to_string());
        self.set(FormField::Lng, round6(center.lng).to_string());
    }

    fn check(&self, field: FormField) -> bool {
        let raw = self.value(field).trim();
        if raw.is_empty() {
            return false;
        }
        match field {
            FormField::Name => true,
            FormField::StrokeColor => is_hex_color(raw),
            FormField::NodesCount => raw.parse::<u32>().is_ok_and(|v| v > 0),
            FormField::R | FormField::D | FormField::StrokeWeight => parse_finite(raw).is_some_and(|v| v > 0.0),
            FormField::Lat => parse_finite(raw).is_some_and(|v| (-90.0..=90.0).contains(&v)),
            FormField::Lng => parse_finite(raw).is_some_and(|v| (-180.0..=180.0).contains(&v)),
            FormField::N | FormField::Rotation => parse_finite(raw).is_some(),
        }
    }

    /// Only called after `check` accepted the field.
    fn number(&self, field: FormField) -> f64 {
        parse_finite(self.value(field).trim()).unwrap_or(0.0)
    }
}

impl Default for CurveForm {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().into_iter().find(|v| v.is_finite())
}

fn is_hex_color(raw: &str) -> bool {
    raw.strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
