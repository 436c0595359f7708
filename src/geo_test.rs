#![allow(clippy::float_cmp)]

use super::*;

fn assert_close(a: f64, b: f64, eps: f64) {
    let diff = (a - b).abs();
    assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
}

// =============================================================
// compute_offset
// =============================================================

#[test]
fn offset_zero_distance_is_identity() {
    let from = LatLng::new(51.509865, -0.118092);
    let to = compute_offset(from, 0.0, 137.0);
    assert_close(to.lat, from.lat, 1e-12);
    assert_close(to.lng, from.lng, 1e-12);
}

#[test]
fn offset_north_moves_latitude_only() {
    let from = LatLng::new(0.0, 0.0);
    let one_degree_m = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
    let to = compute_offset(from, one_degree_m, 0.0);
    assert_close(to.lat, 1.0, 1e-9);
    assert_close(to.lng, 0.0, 1e-9);
}

#[test]
fn offset_east_on_equator_moves_longitude_only() {
    let from = LatLng::new(0.0, 10.0);
    let one_degree_m = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
    let to = compute_offset(from, one_degree_m, 90.0);
    assert_close(to.lat, 0.0, 1e-9);
    assert_close(to.lng, 11.0, 1e-9);
}

#[test]
fn negative_distance_points_to_opposite_bearing() {
    let from = LatLng::new(45.0, 7.0);
    let backwards = compute_offset(from, -1500.0, 30.0);
    let opposite = compute_offset(from, 1500.0, 210.0);
    assert_close(backwards.lat, opposite.lat, 1e-9);
    assert_close(backwards.lng, opposite.lng, 1e-9);
}

#[test]
fn offset_across_antimeridian_wraps() {
    let from = LatLng::new(0.0, 179.9);
    let to = compute_offset(from, 50_000.0, 90.0);
    assert!(to.lng < 0.0, "expected wrap to negative longitude, got {}", to.lng);
    assert!(to.lng >= -180.0);
}

#[test]
fn wrap_lng_leaves_in_range_values_untouched() {
    assert_eq!(wrap_lng(-0.118092), -0.118092);
    assert_eq!(wrap_lng(-180.0), -180.0);
    assert_close(wrap_lng(190.0), -170.0, 1e-12);
    assert_close(wrap_lng(-190.0), 170.0, 1e-12);
    assert_close(wrap_lng(180.0), -180.0, 1e-12);
}

// =============================================================
// Bbox
// =============================================================

#[test]
fn bbox_query_format_is_min_lng_min_lat_max_lng_max_lat() {
    let bbox = Bbox::from_corners(LatLng::new(51.4, -0.2), LatLng::new(51.6, 0.1));
    assert_eq!(bbox.to_query(), "-0.2,51.4,0.1,51.6");
}

#[test]
fn bbox_parse_round_trips_display() {
    let bbox: Bbox = "-0.2, 51.4, 0.1, 51.6".parse().unwrap();
    assert_eq!(bbox, Bbox::new(-0.2, 51.4, 0.1, 51.6));
}

#[test]
fn bbox_parse_rejects_wrong_arity_and_garbage() {
    assert!("1,2,3".parse::<Bbox>().is_err());
    assert!("1,2,3,x".parse::<Bbox>().is_err());
    assert!("".parse::<Bbox>().is_err());
}

#[test]
fn bbox_from_envelope_reads_corners_zero_and_two() {
    let bbox = Bbox::new(-1.0, 50.0, 1.0, 52.0);
    let envelope = PolygonGeometry::from_bbox(bbox);
    assert_eq!(Bbox::from_envelope(&envelope), Some(bbox));
}

#[test]
fn bbox_from_degenerate_envelope_is_none() {
    let envelope = PolygonGeometry { kind: GeometryKind::Polygon, coordinates: vec![vec![[0.0, 0.0]]] };
    assert_eq!(Bbox::from_envelope(&envelope), None);
}

#[test]
fn bbox_center_and_contains() {
    let bbox = Bbox::new(-1.0, 50.0, 1.0, 52.0);
    assert_eq!(bbox.center(), LatLng::new(51.0, 0.0));
    assert!(bbox.contains(LatLng::new(51.0, 0.5)));
    assert!(!bbox.contains(LatLng::new(53.0, 0.5)));
}

// =============================================================
// GeoJSON serde
// =============================================================

#[test]
fn point_geometry_wire_shape() {
    let point = PointGeometry::new(LatLng::new(51.5, -0.12));
    let json = serde_json::to_value(point).unwrap();
    assert_eq!(json, serde_json::json!({"type": "Point", "coordinates": [-0.12, 51.5]}));
    assert_eq!(point.lat_lng(), LatLng::new(51.5, -0.12));
}

#[test]
fn polygon_geometry_deserializes_server_envelope() {
    let json = serde_json::json!({
        "type": "Polygon",
        "coordinates": [[[-1.0, 50.0], [-1.0, 52.0], [1.0, 52.0], [1.0, 50.0], [-1.0, 50.0]]]
    });
    let polygon: PolygonGeometry = serde_json::from_value(json).unwrap();
    assert_eq!(polygon.kind, GeometryKind::Polygon);
    assert_eq!(Bbox::from_envelope(&polygon), Some(Bbox::new(-1.0, 50.0, 1.0, 52.0)));
}
