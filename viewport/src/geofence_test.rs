use super::*;
use crate::types::Bbox;

fn square() -> BoundsPolygon {
    BoundsPolygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(100.0, 0.0),
        Point::new(100.0, 100.0),
        Point::new(0.0, 100.0),
    ])
}

fn viewport_centered_at(x: f64, y: f64) -> Viewport {
    Viewport::new(Bbox::from_center(Point::new(x, y), 10.0, 10.0).expect("bbox"), 15)
}

// =============================================================
// is_inside_bounds
// =============================================================

#[test]
fn strictly_inside_point_is_inside() {
    assert!(is_inside_bounds(Point::new(50.0, 50.0), &square()));
}

#[test]
fn strictly_outside_point_is_outside() {
    assert!(!is_inside_bounds(Point::new(150.0, 50.0), &square()));
    assert!(!is_inside_bounds(Point::new(50.0, -0.001), &square()));
}

#[test]
fn edge_points_count_as_inside() {
    let poly = square();
    assert!(is_inside_bounds(Point::new(100.0, 50.0), &poly));
    assert!(is_inside_bounds(Point::new(50.0, 100.0), &poly));
    assert!(is_inside_bounds(Point::new(0.0, 0.0), &poly));
    assert!(is_inside_bounds(Point::new(0.0, 50.0 + 1e-12), &poly));
}

#[test]
fn concave_notch_is_outside() {
    // U shape: notch between x=40..60 above y=50.
    let poly = BoundsPolygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(100.0, 0.0),
        Point::new(100.0, 100.0),
        Point::new(60.0, 100.0),
        Point::new(60.0, 50.0),
        Point::new(40.0, 50.0),
        Point::new(40.0, 100.0),
        Point::new(0.0, 100.0),
    ]);
    assert!(!is_inside_bounds(Point::new(50.0, 75.0), &poly));
    assert!(is_inside_bounds(Point::new(20.0, 75.0), &poly));
}

#[test]
fn fewer_than_three_vertices_disables_fence() {
    let poly = BoundsPolygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
    assert!(is_inside_bounds(Point::new(1e9, -1e9), &poly));
    assert!(is_inside_bounds(Point::new(0.0, 0.0), &BoundsPolygon::default()));
}

#[test]
fn nan_point_is_never_inside_an_enabled_fence() {
    assert!(!is_inside_bounds(Point::new(f64::NAN, 50.0), &square()));
}

// =============================================================
// is_viewport_admissible
// =============================================================

#[test]
fn admissibility_uses_center_only() {
    let poly = square();
    assert!(is_viewport_admissible(&viewport_centered_at(50.0, 50.0), &poly));
    assert!(!is_viewport_admissible(&viewport_centered_at(150.0, 50.0), &poly));
    // Rectangle hangs over the east edge, center still inside.
    assert!(is_viewport_admissible(&viewport_centered_at(95.0, 50.0), &poly));
}

#[test]
fn admissibility_does_not_mutate_inputs() {
    let poly = square();
    let vp = viewport_centered_at(50.0, 50.0);
    let (poly_before, vp_before) = (poly.clone(), vp.clone());
    let _ = is_viewport_admissible(&vp, &poly);
    assert_eq!(poly, poly_before);
    assert_eq!(vp, vp_before);
}

// =============================================================
// validate / has_self_intersection
// =============================================================

#[test]
fn validate_requires_three_vertices() {
    let poly = BoundsPolygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
    assert_eq!(poly.validate(), Err(ViewportError::TooFewVertices(2)));
    assert!(square().validate().is_ok());
}

#[test]
fn validate_rejects_non_finite_vertex() {
    let poly = BoundsPolygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(1.0, f64::INFINITY),
        Point::new(1.0, 1.0),
    ]);
    assert_eq!(poly.validate(), Err(ViewportError::NonFiniteVertex(1)));
}

#[test]
fn bow_tie_is_self_intersecting() {
    let bow_tie = BoundsPolygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(100.0, 100.0),
        Point::new(100.0, 0.0),
        Point::new(0.0, 100.0),
    ]);
    assert!(bow_tie.has_self_intersection());
    assert!(!square().has_self_intersection());
}

#[test]
fn serializes_as_plain_vertex_array() {
    let json = serde_json::to_value(square()).expect("encode");
    assert_eq!(json[1], serde_json::json!({"x": 100.0, "y": 0.0}));
}
