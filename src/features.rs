//! Feature model: sampled curves, their property bags, and the shared store.
//!
//! This module defines the geometry feature drawn on the map (`Feature`), a
//! typed accessor for its open-ended property bag (`Props`), and the single
//! store that owns every live feature regardless of which layer it belongs to
//! (`FeatureStore`).
//!
//! Features are tagged with their owning layer through the `layerName`
//! property rather than a back-pointer; layers are filtered views over the
//! store. Dropping a layer therefore never leaves a dangling reference.

#[cfg(test)]
#[path = "features_test.rs"]
mod features_test;

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::curve::{Curve, CurveParams};

/// Property key holding the owning layer's name.
pub const LAYER_NAME_KEY: &str = "layerName";

/// Property key mirroring the feature's id.
pub const ID_KEY: &str = "_id";

/// Feature identifier: `"{layer_id}|{creation_millis}"`.
pub type FeatureId = String;

/// Open-ended property bag attached to a feature.
pub type PropertyMap = Map<String, Value>;

/// A sampled curve plus the properties it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Curve,
    pub properties: PropertyMap,
}

impl Feature {
    /// Typed view over `properties`.
    #[must_use]
    pub fn props(&self) -> Props<'_> {
        Props::new(&self.properties)
    }

    /// Decode the curve parameters stored in the property bag.
    #[must_use]
    pub fn curve_params(&self) -> Option<CurveParams> {
        CurveParams::from_props(&self.properties)
    }
}

/// Typed access to common fields of a feature property bag.
pub struct Props<'a> {
    value: &'a PropertyMap,
}

impl<'a> Props<'a> {
    #[must_use]
    pub fn new(value: &'a PropertyMap) -> Self {
        Self { value }
    }

    /// Owning layer name, if tagged.
    #[must_use]
    pub fn layer_name(&self) -> Option<&'a str> {
        self.value.get(LAYER_NAME_KEY).and_then(Value::as_str)
    }

    /// Curve display name. Empty string when absent.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.value.get("name").and_then(Value::as_str).unwrap_or("")
    }

    /// Stroke width in pixels. Defaults to `1.0` when absent.
    #[must_use]
    pub fn stroke_weight(&self) -> f64 {
        self.value
            .get("strokeWeight")
            .and_then(Value::as_f64)
            .unwrap_or(1.0)
    }

    /// Stroke color as a CSS color string. Defaults to `"#000000"` when absent.
    #[must_use]
    pub fn stroke_color(&self) -> &'a str {
        self.value
            .get("strokeColor")
            .and_then(Value::as_str)
            .unwrap_or("#000000")
    }
}

/// Everything needed to insert a feature; the store stamps the id.
#[derive(Debug, Clone)]
pub struct FeatureTemplate {
    /// Id of the layer the feature is created for; prefixes the feature id.
    pub layer_id: u64,
    pub geometry: Curve,
    pub properties: PropertyMap,
}

/// In-memory store of every live feature, iterated in insertion order.
///
/// Indexed by id for lookups; a monotonically increasing sequence number
/// preserves insertion order across removals. Every mutation bumps
/// `revision` so dependents (the style table) can recompute lazily.
pub struct FeatureStore {
    features: BTreeMap<u64, Feature>,
    index: HashMap<FeatureId, u64>,
    next_seq: u64,
    last_stamp: i64,
    revision: u64,
}

impl FeatureStore {
    #[must_use]
    pub fn new() -> Self {
        Self { features: BTreeMap::new(), index: HashMap::new(), next_seq: 0, last_stamp: 0, revision: 0 }
    }

    /// Insert a feature under a freshly generated id and return that id.
    ///
    /// The id is also written into the `_id` property.
    pub fn add(&mut self, template: FeatureTemplate) -> FeatureId {
        let id = self.generate_id(template.layer_id);
        let mut properties = template.properties;
        properties.insert(ID_KEY.into(), Value::String(id.clone()));

        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(id.clone(), seq);
        self.features
            .insert(seq, Feature { id: id.clone(), geometry: template.geometry, properties });
        self.revision += 1;
        id
    }

    /// Replace the geometry and merge `properties` into an existing feature.
    /// Null values delete keys. Returns false if the feature doesn't exist.
    pub fn update(&mut self, id: &str, geometry: Curve, properties: &PropertyMap) -> bool {
        let Some(feature) = self.index.get(id).and_then(|seq| self.features.get_mut(seq)) else {
            return false;
        };
        feature.geometry = geometry;
        for (key, value) in properties {
            if value.is_null() {
                feature.properties.remove(key);
            } else {
                feature.properties.insert(key.clone(), value.clone());
            }
        }
        self.revision += 1;
        true
    }

    /// Remove a feature by id, returning it if it was present. Removing an
    /// absent feature is a no-op.
    pub fn remove(&mut self, id: &str) -> Option<Feature> {
        let seq = self.index.remove(id)?;
        let removed = self.features.remove(&seq);
        self.revision += 1;
        removed
    }

    /// Remove every feature tagged with `layer_name`; returns how many went.
    pub fn remove_all_where(&mut self, layer_name: &str) -> usize {
        let doomed: Vec<u64> = self
            .features
            .iter()
            .filter(|(_, f)| f.props().layer_name() == Some(layer_name))
            .map(|(seq, _)| *seq)
            .collect();
        for seq in &doomed {
            if let Some(feature) = self.features.remove(seq) {
                self.index.remove(&feature.id);
            }
        }
        if !doomed.is_empty() {
            self.revision += 1;
        }
        doomed.len()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.index.get(id).and_then(|seq| self.features.get(seq))
    }

    /// All features in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    /// Features tagged with `layer_name`, in insertion order.
    #[must_use]
    pub fn features_of(&self, layer_name: &str) -> Vec<&Feature> {
        self.iter()
            .filter(|f| f.props().layer_name() == Some(layer_name))
            .collect()
    }

    /// Mutation counter; changes whenever the store's contents change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn generate_id(&mut self, layer_id: u64) -> FeatureId {
        // Wall-clock millis, nudged forward so two features created within
        // the same millisecond still get distinct ids.
        let stamp = now_millis().max(self.last_stamp + 1);
        self.last_stamp = stamp;
        format!("{layer_id}|{stamp}")
    }
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> i64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}
