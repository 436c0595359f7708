//! Layers: named views over the shared feature store.
//!
//! DESIGN
//! ======
//! `LayerManager` owns the one `FeatureStore` and a registry of layers keyed
//! by unique name. A `Layer` holds no features itself; its features are the
//! store entries whose `layerName` property equals its name. Mutations go
//! through a short-lived `LayerMut` handle that tags properties and routes to
//! the store.
//!
//! Styling is derived per feature from that feature's own stroke properties
//! (plus its layer's visibility). The style table is rebuilt on read whenever
//! the store revision or a visibility flag changed since the last build.

#[cfg(test)]
#[path = "layers_test.rs"]
mod layers_test;

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::curve::Curve;
use crate::features::{Feature, FeatureId, FeatureStore, FeatureTemplate, LAYER_NAME_KEY, PropertyMap};

// =============================================================================
// TYPES
// =============================================================================

/// Registry entry for a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    /// Monotonic per manager; prefixes the ids of features created through it.
    pub id: u64,
    pub name: String,
    pub visible: bool,
}

/// Rendering attributes derived for one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStyle {
    pub visible: bool,
    pub stroke_weight: f64,
    pub stroke_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayerError {
    #[error("the layer name \"{0}\" has already been used")]
    DuplicateName(String),
    #[error("unknown layer: {0}")]
    UnknownLayer(String),
    #[error("feature {feature} is not part of layer \"{layer}\"")]
    UnknownFeature { layer: String, feature: FeatureId },
    #[error("feature {0} does not hold valid curve parameters")]
    MalformedFeature(FeatureId),
}

impl crate::error::ErrorCode for LayerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateName(_) => "E_DUPLICATE_LAYER",
            Self::UnknownLayer(_) => "E_UNKNOWN_LAYER",
            Self::UnknownFeature { .. } => "E_UNKNOWN_FEATURE",
            Self::MalformedFeature(_) => "E_MALFORMED_FEATURE",
        }
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Registry of layers plus the shared feature store they filter.
pub struct LayerManager {
    store: FeatureStore,
    layers: HashMap<String, Layer>,
    creations: u64,
    styles: HashMap<FeatureId, FeatureStyle>,
    /// Store revision the style table was built against; `None` forces a rebuild.
    styled_revision: Option<u64>,
}

impl LayerManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: FeatureStore::new(),
            layers: HashMap::new(),
            creations: 0,
            styles: HashMap::new(),
            styled_revision: None,
        }
    }

    /// Register a new layer under `name`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if a layer with that name is already registered.
    pub fn add_layer(&mut self, name: &str) -> Result<Layer, LayerError> {
        if self.layers.contains_key(name) {
            return Err(LayerError::DuplicateName(name.to_owned()));
        }
        self.creations += 1;
        let layer = Layer { id: self.creations, name: name.to_owned(), visible: true };
        self.layers.insert(name.to_owned(), layer.clone());
        info!(layer = %name, id = layer.id, "layer added");
        Ok(layer)
    }

    /// Remove every feature of `name` and deregister it. Unknown names are
    /// ignored so late toggle-offs can race a refresh safely. Returns whether
    /// a layer was dropped.
    pub fn drop_layer(&mut self, name: &str) -> bool {
        let Some(layer) = self.layers.remove(name) else {
            debug!(layer = %name, "drop of unknown layer ignored");
            return false;
        };
        let removed = self.store.remove_all_where(&layer.name);
        info!(layer = %name, features = removed, "layer dropped");
        true
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Read-only view of a registered layer.
    #[must_use]
    pub fn layer(&self, name: &str) -> Option<LayerRef<'_>> {
        let layer = self.layers.get(name)?;
        Some(LayerRef { layer, store: &self.store })
    }

    /// Mutable handle on a registered layer.
    pub fn layer_mut(&mut self, name: &str) -> Option<LayerMut<'_>> {
        let layer = self.layers.get(name)?.clone();
        Some(LayerMut { manager: self, layer })
    }

    /// Registered layers in creation order.
    #[must_use]
    pub fn layers(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self.layers.values().collect();
        layers.sort_by_key(|l| l.id);
        layers
    }

    /// Show or hide a layer's features. Returns false for unknown layers.
    pub fn set_visible(&mut self, name: &str, visible: bool) -> bool {
        let Some(layer) = self.layers.get_mut(name) else {
            return false;
        };
        if layer.visible != visible {
            layer.visible = visible;
            self.styled_revision = None;
        }
        true
    }

    #[must_use]
    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    #[must_use]
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.store.get(id)
    }

    /// Style table for every feature, rebuilt if anything changed since the
    /// last read.
    pub fn styles(&mut self) -> &HashMap<FeatureId, FeatureStyle> {
        if self.styled_revision != Some(self.store.revision()) {
            self.update_style();
        }
        &self.styles
    }

    /// Style of one feature.
    pub fn style_of(&mut self, id: &str) -> Option<FeatureStyle> {
        self.styles().get(id).cloned()
    }

    fn update_style(&mut self) {
        let layers = &self.layers;
        self.styles = self
            .store
            .iter()
            .map(|feature| {
                let props = feature.props();
                let visible = props
                    .layer_name()
                    .and_then(|name| layers.get(name))
                    .is_none_or(|layer| layer.visible);
                let style = FeatureStyle {
                    visible,
                    stroke_weight: props.stroke_weight(),
                    stroke_color: props.stroke_color().to_owned(),
                };
                (feature.id.clone(), style)
            })
            .collect();
        self.styled_revision = Some(self.store.revision());
        debug!(features = self.styles.len(), "style table rebuilt");
    }
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// LAYER VIEWS
// =============================================================================

/// Read-only view over one layer's features.
pub struct LayerRef<'a> {
    layer: &'a Layer,
    store: &'a FeatureStore,
}

impl<'a> LayerRef<'a> {
    #[must_use]
    pub fn layer(&self) -> &'a Layer {
        self.layer
    }

    /// This layer's features in store insertion order.
    #[must_use]
    pub fn features(&self) -> Vec<&'a Feature> {
        self.store.features_of(&self.layer.name)
    }

    /// Look up a feature, only if it belongs to this layer.
    #[must_use]
    pub fn feature(&self, id: &str) -> Option<&'a Feature> {
        self.store
            .get(id)
            .filter(|f| f.props().layer_name() == Some(self.layer.name.as_str()))
    }
}

/// Mutable handle over one layer; borrows the whole manager.
pub struct LayerMut<'a> {
    manager: &'a mut LayerManager,
    layer: Layer,
}

impl LayerMut<'_> {
    #[must_use]
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    /// Tag `properties` with this layer and insert a new feature.
    pub fn add_geometry(&mut self, geometry: Curve, mut properties: PropertyMap) -> FeatureId {
        properties.insert(LAYER_NAME_KEY.into(), Value::String(self.layer.name.clone()));
        let id = self
            .manager
            .store
            .add(FeatureTemplate { layer_id: self.layer.id, geometry, properties });
        debug!(layer = %self.layer.name, feature = %id, "feature added");
        id
    }

    /// Replace a feature's geometry and merge its properties in place.
    ///
    /// # Errors
    ///
    /// Returns `UnknownFeature` if `id` is not a feature of this layer.
    pub fn update_geometry(&mut self, id: &str, geometry: Curve, properties: PropertyMap) -> Result<(), LayerError> {
        if self.feature(id).is_none() {
            return Err(self.unknown_feature(id));
        }
        let mut properties = properties;
        properties.insert(LAYER_NAME_KEY.into(), Value::String(self.layer.name.clone()));
        if !self.manager.store.update(id, geometry, &properties) {
            return Err(self.unknown_feature(id));
        }
        debug!(layer = %self.layer.name, feature = %id, "feature updated");
        Ok(())
    }

    /// Remove one of this layer's features. Absent features are a no-op.
    pub fn remove_feature(&mut self, id: &str) -> bool {
        if self.feature(id).is_none() {
            return false;
        }
        let removed = self.manager.store.remove(id).is_some();
        debug!(layer = %self.layer.name, feature = %id, "feature removed");
        removed
    }

    #[must_use]
    pub fn features(&self) -> Vec<&Feature> {
        self.manager.store.features_of(&self.layer.name)
    }

    #[must_use]
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.manager
            .store
            .get(id)
            .filter(|f| f.props().layer_name() == Some(self.layer.name.as_str()))
    }

    /// Remove all of this layer's features and deregister it.
    pub fn drop_layer(self) {
        self.manager.drop_layer(&self.layer.name);
    }

    fn unknown_feature(&self, id: &str) -> LayerError {
        LayerError::UnknownFeature { layer: self.layer.name.clone(), feature: id.to_owned() }
    }
}
