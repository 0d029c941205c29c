#![allow(clippy::float_cmp)]

use super::*;

fn bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Bbox {
    Bbox::new(min_x, min_y, max_x, max_y).expect("valid bbox")
}

// --- Bbox ---

#[test]
fn bbox_rejects_inverted_axes() {
    assert!(Bbox::new(10.0, 0.0, 0.0, 10.0).is_err());
    assert!(Bbox::new(0.0, 10.0, 10.0, 0.0).is_err());
}

#[test]
fn bbox_rejects_zero_area() {
    assert!(Bbox::new(0.0, 0.0, 0.0, 10.0).is_err());
}

#[test]
fn bbox_rejects_nan() {
    assert!(Bbox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
}

#[test]
fn bbox_center_and_size() {
    let b = bbox(0.0, 0.0, 100.0, 50.0);
    assert_eq!(b.width(), 100.0);
    assert_eq!(b.height(), 50.0);
    assert_eq!(b.center(), Point::new(50.0, 25.0));
}

#[test]
fn bbox_serializes_as_array() {
    let b = bbox(1.0, 2.0, 3.0, 4.0);
    let json = serde_json::to_value(b).expect("serialize");
    assert_eq!(json, serde_json::json!([1.0, 2.0, 3.0, 4.0]));
}

#[test]
fn bbox_deserialize_rejects_inverted_array() {
    let err = serde_json::from_value::<Bbox>(serde_json::json!([5.0, 0.0, 1.0, 1.0]));
    assert!(err.is_err());
}

#[test]
fn bbox_from_corners_takes_extremes() {
    let corners = Corners::from(&bbox(-5.0, -2.0, 5.0, 2.0));
    assert_eq!(Bbox::from_corners(&corners).expect("bbox"), bbox(-5.0, -2.0, 5.0, 2.0));
}

// --- Viewport ---

#[test]
fn viewport_corners_follow_bbox() {
    let vp = Viewport::new(bbox(0.0, 0.0, 100.0, 100.0), 15);
    assert_eq!(vp.corners().sw, Point::new(0.0, 0.0));
    assert_eq!(vp.corners().ne, Point::new(100.0, 100.0));

    let moved = vp.with_bbox(bbox(20.0, 0.0, 120.0, 100.0));
    assert_eq!(moved.corners().se, Point::new(120.0, 0.0));
    assert_eq!(moved.corners().nw, Point::new(20.0, 100.0));
}

#[test]
fn viewport_new_clamps_zoom() {
    assert_eq!(Viewport::new(bbox(0.0, 0.0, 1.0, 1.0), 3).zoom(), 10);
    assert_eq!(Viewport::new(bbox(0.0, 0.0, 1.0, 1.0), 25).zoom(), 19);
}

#[test]
fn viewport_decodes_from_bbox_with_camel_case_fields() {
    let vp: Viewport = serde_json::from_value(serde_json::json!({
        "bbox": [0.0, 0.0, 10.0, 10.0],
        "zoom": 15,
        "sourceId": "c-1",
        "timestamp": 1000
    }))
    .expect("decode");
    assert_eq!(vp.zoom(), 15);
    assert_eq!(vp.source_id.as_deref(), Some("c-1"));
    assert_eq!(vp.timestamp, Some(1000));
    assert_eq!(vp.corners().ne, Point::new(10.0, 10.0));
}

#[test]
fn viewport_decodes_from_corners_only() {
    let vp: Viewport = serde_json::from_value(serde_json::json!({
        "corners": {
            "sw": {"x": 1.0, "y": 2.0},
            "se": {"x": 5.0, "y": 2.0},
            "nw": {"x": 1.0, "y": 6.0},
            "ne": {"x": 5.0, "y": 6.0}
        },
        "zoom": 12.0
    }))
    .expect("decode");
    assert_eq!(vp.bbox().to_array(), [1.0, 2.0, 5.0, 6.0]);
    assert_eq!(vp.zoom(), 12);
    assert_eq!(vp.timestamp, None);
}

#[test]
fn viewport_bbox_wins_over_inconsistent_corners() {
    let vp: Viewport = serde_json::from_value(serde_json::json!({
        "bbox": [0.0, 0.0, 10.0, 10.0],
        "corners": {
            "sw": {"x": 100.0, "y": 100.0},
            "se": {"x": 200.0, "y": 100.0},
            "nw": {"x": 100.0, "y": 200.0},
            "ne": {"x": 200.0, "y": 200.0}
        },
        "zoom": 14
    }))
    .expect("decode");
    assert_eq!(vp.corners().ne, Point::new(10.0, 10.0));
}

#[test]
fn viewport_decode_rejects_fractional_zoom() {
    let res = serde_json::from_value::<Viewport>(serde_json::json!({
        "bbox": [0.0, 0.0, 10.0, 10.0],
        "zoom": 14.5
    }));
    assert!(res.is_err());
}

#[test]
fn viewport_decode_rejects_missing_extent() {
    let res = serde_json::from_value::<Viewport>(serde_json::json!({"zoom": 14}));
    assert!(res.is_err());
}

#[test]
fn viewport_decode_clamps_out_of_range_zoom() {
    let vp: Viewport = serde_json::from_value(serde_json::json!({
        "bbox": [0.0, 0.0, 10.0, 10.0],
        "zoom": 42
    }))
    .expect("decode");
    assert_eq!(vp.zoom(), 19);
}

#[test]
fn viewport_serializes_camel_case_and_skips_missing_stamp() {
    let vp = Viewport::new(bbox(0.0, 0.0, 10.0, 10.0), 15);
    let json = serde_json::to_value(&vp).expect("serialize");
    assert_eq!(json["bbox"], serde_json::json!([0.0, 0.0, 10.0, 10.0]));
    assert_eq!(json["zoom"], 15);
    assert!(json.get("sourceId").is_none());

    let json = serde_json::to_value(vp.stamped("me", 7)).expect("serialize");
    assert_eq!(json["sourceId"], "me");
    assert_eq!(json["timestamp"], 7);
}

// --- Velocity ---

#[test]
fn velocity_zero_detection() {
    assert!(Velocity::ZERO.is_zero());
    assert!(!Velocity::new(0.0, -1.0).is_zero());
}
