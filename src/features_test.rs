#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::curve::generate;
use crate::geo::LatLng;

fn curve(nodes: u32) -> Curve {
    let params = CurveParams { nodes_count: nodes, ..CurveParams::default() };
    generate(&params).unwrap()
}

fn props_for(layer: &str, extra: serde_json::Value) -> PropertyMap {
    let mut props = PropertyMap::new();
    props.insert(LAYER_NAME_KEY.into(), json!(layer));
    if let serde_json::Value::Object(map) = extra {
        props.extend(map);
    }
    props
}

fn template(layer_id: u64, layer: &str) -> FeatureTemplate {
    FeatureTemplate { layer_id, geometry: curve(4), properties: props_for(layer, json!({"strokeWeight": 2})) }
}

// =============================================================
// Props
// =============================================================

#[test]
fn props_defaults_when_absent() {
    let map = PropertyMap::new();
    let props = Props::new(&map);
    assert_eq!(props.layer_name(), None);
    assert_eq!(props.name(), "");
    assert_eq!(props.stroke_weight(), 1.0);
    assert_eq!(props.stroke_color(), "#000000");
}

#[test]
fn props_reads_present_values() {
    let map = props_for("a", json!({"name": "rose", "strokeWeight": 4, "strokeColor": "#FF0000"}));
    let props = Props::new(&map);
    assert_eq!(props.layer_name(), Some("a"));
    assert_eq!(props.name(), "rose");
    assert_eq!(props.stroke_weight(), 4.0);
    assert_eq!(props.stroke_color(), "#FF0000");
}

// =============================================================
// add
// =============================================================

#[test]
fn add_stamps_layer_prefixed_id() {
    let mut store = FeatureStore::new();
    let id = store.add(template(7, "a"));
    let (layer_part, stamp_part) = id.split_once('|').unwrap();
    assert_eq!(layer_part, "7");
    assert!(stamp_part.parse::<i64>().unwrap() > 0);
    assert_eq!(store.get(&id).unwrap().properties[ID_KEY], json!(id));
}

#[test]
fn add_ids_are_unique_even_within_one_millisecond() {
    let mut store = FeatureStore::new();
    let ids: Vec<FeatureId> = (0..50).map(|_| store.add(template(1, "a"))).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len());
}

#[test]
fn add_bumps_revision() {
    let mut store = FeatureStore::new();
    let before = store.revision();
    store.add(template(1, "a"));
    assert!(store.revision() > before);
}

// =============================================================
// update
// =============================================================

#[test]
fn update_replaces_geometry_and_merges_props() {
    let mut store = FeatureStore::new();
    let id = store.add(template(1, "a"));
    let new_geometry = curve(8);
    let ok = store.update(&id, new_geometry.clone(), &props_for("a", json!({"strokeWeight": 5, "name": "x"})));
    assert!(ok);

    let feature = store.get(&id).unwrap();
    assert_eq!(feature.id, id);
    assert_eq!(feature.geometry, new_geometry);
    assert_eq!(feature.props().stroke_weight(), 5.0);
    assert_eq!(feature.props().name(), "x");
    assert_eq!(feature.properties[ID_KEY], json!(id));
}

#[test]
fn update_null_removes_key() {
    let mut store = FeatureStore::new();
    let id = store.add(template(1, "a"));
    let mut patch = PropertyMap::new();
    patch.insert("strokeWeight".into(), serde_json::Value::Null);
    assert!(store.update(&id, curve(4), &patch));
    assert!(!store.get(&id).unwrap().properties.contains_key("strokeWeight"));
}

#[test]
fn update_missing_returns_false() {
    let mut store = FeatureStore::new();
    assert!(!store.update("9|1", curve(4), &PropertyMap::new()));
}

// =============================================================
// remove
// =============================================================

#[test]
fn remove_returns_feature_then_is_noop() {
    let mut store = FeatureStore::new();
    let id = store.add(template(1, "a"));
    assert!(store.remove(&id).is_some());
    assert!(store.remove(&id).is_none());
    assert!(store.is_empty());
}

#[test]
fn remove_all_where_only_touches_matching_layer() {
    let mut store = FeatureStore::new();
    store.add(template(1, "a"));
    let keep = store.add(template(2, "b"));
    store.add(template(1, "a"));

    assert_eq!(store.remove_all_where("a"), 2);
    assert_eq!(store.len(), 1);
    assert!(store.get(&keep).is_some());
    assert_eq!(store.remove_all_where("a"), 0);
}

// =============================================================
// iteration
// =============================================================

#[test]
fn iteration_follows_insertion_order_across_removals() {
    let mut store = FeatureStore::new();
    let first = store.add(template(1, "a"));
    let second = store.add(template(1, "a"));
    let third = store.add(template(1, "a"));
    store.remove(&second);
    let fourth = store.add(template(1, "a"));

    let order: Vec<&str> = store.features_of("a").iter().map(|f| f.id.as_str()).collect();
    assert_eq!(order, vec![first.as_str(), third.as_str(), fourth.as_str()]);
}

#[test]
fn features_of_filters_by_layer_name() {
    let mut store = FeatureStore::new();
    store.add(template(1, "a"));
    store.add(template(2, "b"));
    assert_eq!(store.features_of("a").len(), 1);
    assert_eq!(store.features_of("b").len(), 1);
    assert!(store.features_of("c").is_empty());
}

#[test]
fn feature_curve_params_round_trip_through_store() {
    let params = CurveParams { name: "rose".into(), center: LatLng::new(10.0, 20.0), ..CurveParams::default() };
    let mut store = FeatureStore::new();
    let mut properties = params.to_props();
    properties.insert(LAYER_NAME_KEY.into(), json!("a"));
    let id = store.add(FeatureTemplate { layer_id: 1, geometry: generate(&params).unwrap(), properties });
    assert_eq!(store.get(&id).unwrap().curve_params(), Some(params));
}
