#![allow(clippy::float_cmp)]

use super::*;
use crate::geo::EARTH_RADIUS_M;

fn params() -> CurveParams {
    CurveParams {
        name: "clover".into(),
        center: LatLng::new(51.509865, -0.118092),
        r: 2000.0,
        n: 4.0,
        d: 1.0,
        rotation: 15.0,
        nodes_count: 720,
        stroke_weight: 3.0,
        stroke_color: "#AA3300".into(),
    }
}

fn approx_distance_m(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

// =============================================================
// laps
// =============================================================

#[test]
fn laps_integral_d_is_d() {
    assert_eq!(laps(1.0), 1.0);
    assert_eq!(laps(7.0), 7.0);
}

#[test]
fn laps_fractional_d_takes_one_extra_lap() {
    assert_eq!(laps(1.5), 2.0);
    assert_eq!(laps(2.01), 3.0);
    assert_eq!(laps(0.3), 1.0);
}

// =============================================================
// generate
// =============================================================

#[test]
fn generate_returns_nodes_count_plus_one_points() {
    for nodes in [1, 2, 500, 1000] {
        let p = CurveParams { nodes_count: nodes, ..params() };
        let curve = generate(&p).unwrap();
        assert_eq!(curve.len(), nodes as usize + 1);
    }
}

#[test]
fn generate_is_deterministic() {
    let a = generate(&params()).unwrap();
    let b = generate(&params()).unwrap();
    assert_eq!(a, b);
    for (pa, pb) in a.points.iter().zip(&b.points) {
        assert_eq!(pa.lat.to_bits(), pb.lat.to_bits());
        assert_eq!(pa.lng.to_bits(), pb.lng.to_bits());
    }
}

#[test]
fn generate_starts_at_center() {
    let curve = generate(&params()).unwrap();
    let first = curve.points[0];
    assert!((first.lat - params().center.lat).abs() < 1e-9);
    assert!((first.lng - params().center.lng).abs() < 1e-9);
}

#[test]
fn generate_integral_d_closes_back_on_center() {
    let curve = generate(&params()).unwrap();
    let last = *curve.points.last().unwrap();
    assert!(approx_distance_m(last, params().center) < 1e-3);
}

#[test]
fn generate_stays_within_radius() {
    let p = params();
    let curve = generate(&p).unwrap();
    for point in &curve.points {
        assert!(approx_distance_m(p.center, *point) <= p.r + 1e-3);
    }
}

#[test]
fn generate_quarter_turn_peak_matches_polar_radius() {
    // n/d = 1, one lap, 4 steps: theta = pi/2 at i = 1 gives rho = r.
    let p = CurveParams { n: 1.0, d: 1.0, nodes_count: 4, rotation: 0.0, ..params() };
    let curve = generate(&p).unwrap();
    let dist = approx_distance_m(p.center, curve.points[1]);
    assert!((dist - p.r).abs() < 1e-3, "expected {} got {dist}", p.r);
}

#[test]
fn generate_rotation_changes_points_but_not_count() {
    let base = generate(&params()).unwrap();
    let rotated = generate(&CurveParams { rotation: 90.0, ..params() }).unwrap();
    assert_eq!(base.len(), rotated.len());
    assert_ne!(base.points[10], rotated.points[10]);
}

#[test]
fn generate_rejects_zero_nodes() {
    let p = CurveParams { nodes_count: 0, ..params() };
    assert_eq!(generate(&p), Err(CurveError::NoSamples));
}

#[test]
fn generate_rejects_non_positive_divisor() {
    assert!(matches!(generate(&CurveParams { d: 0.0, ..params() }), Err(CurveError::InvalidDivisor(_))));
    assert!(matches!(generate(&CurveParams { d: -2.0, ..params() }), Err(CurveError::InvalidDivisor(_))));
    assert!(matches!(generate(&CurveParams { d: f64::NAN, ..params() }), Err(CurveError::InvalidDivisor(_))));
}

#[test]
fn curve_geojson_uses_lng_lat_order() {
    let p = CurveParams { nodes_count: 2, ..params() };
    let curve = generate(&p).unwrap();
    let json = curve.to_geojson();
    assert_eq!(json["type"], "LineString");
    assert_eq!(json["coordinates"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["coordinates"][1][0].as_f64(), Some(curve.points[1].lng));
    assert_eq!(json["coordinates"][1][1].as_f64(), Some(curve.points[1].lat));
}

// =============================================================
// Property bag
// =============================================================

#[test]
fn props_use_feature_field_names() {
    let props = params().to_props();
    for key in ["name", "lat", "lng", "r", "n", "d", "rotation", "nodes_count", "strokeWeight", "strokeColor"] {
        assert!(props.contains_key(key), "missing {key}");
    }
    assert!(!props.contains_key("center"));
    assert!(!props.contains_key("stroke_weight"));
}

#[test]
fn props_decode_ignores_layer_tags() {
    let mut props = params().to_props();
    props.insert("layerName".into(), serde_json::json!("_drawerLayer"));
    props.insert("_id".into(), serde_json::json!("1|1700000000000"));
    assert_eq!(CurveParams::from_props(&props), Some(params()));
}

#[test]
fn props_decode_missing_field_is_none() {
    let mut props = params().to_props();
    props.remove("nodes_count");
    assert_eq!(CurveParams::from_props(&props), None);
}
