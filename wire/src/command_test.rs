use super::*;
use serde_json::json;
use viewport::{Bbox, Point};

fn base() -> Viewport {
    Viewport::new(Bbox::new(0.0, 0.0, 100.0, 100.0).expect("bbox"), 15)
}

#[test]
fn pan_command_serializes_with_action_tag() {
    let cmd = ViewportCommand::Pan {
        direction: Direction::EAST,
        delta: 0.2,
        source_id: "remote-1".to_owned(),
        timestamp: 42,
        base_viewport: base(),
    };
    let value = serde_json::to_value(&cmd).expect("encode");
    assert_eq!(value["action"], "pan");
    assert_eq!(value["direction"], "east");
    assert_eq!(value["delta"], 0.2);
    assert_eq!(value["sourceId"], "remote-1");
    assert_eq!(value["base_viewport"]["bbox"], json!([0.0, 0.0, 100.0, 100.0]));
    assert_eq!(cmd.action(), "pan");
}

#[test]
fn zoom_command_decodes_from_json() {
    let cmd: ViewportCommand = serde_json::from_value(json!({
        "action": "zoom",
        "level": 16,
        "sourceId": "remote-1",
        "timestamp": 7,
        "base_viewport": {"bbox": [0, 0, 100, 100], "zoom": 15}
    }))
    .expect("decode");
    assert!(matches!(cmd, ViewportCommand::Zoom { level: 16, .. }));
}

#[test]
fn viewport_response_accepts_both_shapes() {
    let wrapped = json!({"viewport": {"bbox": [25, 25, 75, 75], "zoom": 16}, "layers": {}});
    let bare = json!({"bbox": [25, 25, 75, 75], "zoom": 16});
    let a = decode_viewport_response(&wrapped).expect("wrapped");
    let b = decode_viewport_response(&bare).expect("bare");
    assert_eq!(a, b);
    assert_eq!(a.bbox().to_array(), [25.0, 25.0, 75.0, 75.0]);
}

#[test]
fn viewport_response_rejects_garbage() {
    assert!(matches!(decode_viewport_response(&json!({"ok": true})), Err(CodecError::Response(_))));
}

#[test]
fn bounds_response_accepts_array_or_object() {
    let arr = json!([{"x": 0, "y": 0}, {"x": 5, "y": 0}, {"x": 5, "y": 5}]);
    let obj = json!({"bounds_polygon": arr.clone()});
    let a = decode_bounds_response(&arr).expect("array");
    let b = decode_bounds_response(&obj).expect("object");
    assert_eq!(a, b);
    assert_eq!(a.vertices()[2], Point::new(5.0, 5.0));
}

#[test]
fn bounds_response_rejects_scalar_and_missing_key() {
    assert!(decode_bounds_response(&json!(3)).is_err());
    assert!(decode_bounds_response(&json!({"polygon": []})).is_err());
}

#[test]
fn bounds_save_body_shape() {
    let body = BoundsSave {
        bounds_polygon: BoundsPolygon::new(vec![Point::new(1.0, 2.0)]),
    };
    assert_eq!(serde_json::to_value(&body).expect("encode"), json!({"bounds_polygon": [{"x": 1.0, "y": 2.0}]}));
}
