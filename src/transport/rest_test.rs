use std::time::Duration;

use axum::Router;
use axum::extract::{Json, Path};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use viewport::{Direction, Point};

use super::*;

async fn get_state(Path(table): Path<String>) -> Response {
    match table.as_str() {
        "broken" => (
            StatusCode::BAD_GATEWAY,
            Html("<html><head><title>502 Bad Gateway</title></head><body>nginx</body></html>"),
        )
            .into_response(),
        "locked" => (StatusCode::FORBIDDEN, Json(json!({"detail": "table locked"}))).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({})).into_response()
        }
        _ => Json(json!({
            "viewport": {"bbox": [0, 0, 100, 100], "zoom": 15, "sourceId": "server", "timestamp": 10},
            "layerGroups": [{"id": "transport", "layers": [{"id": "roads", "enabled": true}]}],
            "animations": {"traffic": false},
            "bounds_polygon": [{"x": 0, "y": 0}, {"x": 1000, "y": 0}, {"x": 1000, "y": 1000}]
        }))
        .into_response(),
    }
}

async fn patch_state(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "viewport": body.get("viewport"),
        "layers": body.get("layers").cloned().unwrap_or_else(|| json!({})),
        "animations": body.get("animations").cloned().unwrap_or_else(|| json!({}))
    }))
}

async fn command(Json(body): Json<Value>) -> Response {
    match body.get("action").and_then(Value::as_str) {
        Some("pan") => Json(json!({"viewport": {"bbox": [20, 0, 120, 100], "zoom": 15}})).into_response(),
        Some("zoom") => Json(json!({"bbox": [25, 25, 75, 75], "zoom": 16})).into_response(),
        _ => (StatusCode::BAD_REQUEST, "unknown action").into_response(),
    }
}

async fn bounds(Json(body): Json<Value>) -> Json<Value> {
    let mut vertices = body["bounds_polygon"].as_array().cloned().unwrap_or_default();
    vertices.reverse();
    Json(json!({"bounds_polygon": vertices}))
}

async fn serve() -> String {
    let app = Router::new()
        .route("/api/otef_viewport/by-table/{table}/", get(get_state).patch(patch_state))
        .route("/api/otef_viewport/by-table/{table}/command/", post(command))
        .route("/api/otef_viewport/by-table/{table}/bounds/", post(bounds));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn client(base: &str, table: &str) -> RestClient {
    let cfg = SyncConfig { request_timeout: Duration::from_millis(500), ..SyncConfig::new(base, table) };
    RestClient::new(&cfg).expect("client")
}

fn base_viewport() -> Viewport {
    Viewport::new(viewport::Bbox::new(0.0, 0.0, 100.0, 100.0).expect("bbox"), 15)
}

#[tokio::test]
async fn fetch_state_decodes_snapshot() {
    let base = serve().await;
    let snap = client(&base, "otef").fetch_state().await.expect("fetch");
    let vp = snap.viewport.expect("viewport");
    assert_eq!(vp.bbox().to_array(), [0.0, 0.0, 100.0, 100.0]);
    assert_eq!(vp.source_id.as_deref(), Some("server"));
    assert_eq!(snap.layers.get("transport.roads"), Some(&true));
    assert_eq!(snap.animations.get("traffic"), Some(&false));
    assert!(snap.bounds_polygon.is_enabled());
}

#[tokio::test]
async fn patch_state_returns_updated_snapshot() {
    let base = serve().await;
    let mut layers = wire::LayerState::new();
    layers.insert("roads".to_owned(), false);
    let snap = client(&base, "otef").patch_state(&StatePatch::layers(layers)).await.expect("patch");
    assert_eq!(snap.layers.get("roads"), Some(&false));
    assert!(snap.viewport.is_none());
}

#[tokio::test]
async fn commands_accept_wrapped_and_bare_viewports() {
    let base = serve().await;
    let rest = client(&base, "otef");
    let pan = ViewportCommand::Pan {
        direction: Direction::EAST,
        delta: 0.2,
        source_id: "me".to_owned(),
        timestamp: 1,
        base_viewport: base_viewport(),
    };
    assert_eq!(rest.execute_command(&pan).await.expect("pan").bbox().to_array(), [20.0, 0.0, 120.0, 100.0]);

    let zoom = ViewportCommand::Zoom { level: 16, source_id: "me".to_owned(), timestamp: 2, base_viewport: base_viewport() };
    let vp = rest.execute_command(&zoom).await.expect("zoom");
    assert_eq!(vp.zoom(), 16);
}

#[tokio::test]
async fn save_bounds_adopts_server_polygon() {
    let base = serve().await;
    let sent = BoundsPolygon::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]);
    let saved = client(&base, "otef").save_bounds(&sent).await.expect("save");
    assert_eq!(saved.vertices()[0], Point::new(10.0, 10.0));
    assert_eq!(saved.vertices().len(), 3);
}

#[tokio::test]
async fn html_error_page_becomes_title_message() {
    let base = serve().await;
    let err = client(&base, "broken").fetch_state().await.expect_err("502");
    assert!(matches!(err, RestError::Status { status: 502, ref message } if message == "502 Bad Gateway"));
}

#[tokio::test]
async fn json_error_detail_is_surfaced() {
    let base = serve().await;
    let err = client(&base, "locked").fetch_state().await.expect_err("403");
    assert!(matches!(err, RestError::Status { status: 403, ref message } if message == "table locked"));
}

#[tokio::test]
async fn slow_server_times_out() {
    let base = serve().await;
    let err = client(&base, "slow").fetch_state().await.expect_err("timeout");
    assert!(matches!(err, RestError::Http(ref e) if e.is_timeout()));
}

#[tokio::test]
async fn unreachable_server_is_http_error() {
    let err = client("http://127.0.0.1:9", "otef").fetch_state().await.expect_err("refused");
    assert!(matches!(err, RestError::Http(_)));
}

// =============================================================================
// error_message
// =============================================================================

#[test]
fn error_message_prefers_json_fields_in_order() {
    assert_eq!(error_message(r#"{"message": "m", "error": "e"}"#), "e");
    assert_eq!(error_message(r#"{"detail": {"code": 4}}"#), r#"{"code":4}"#);
}

#[test]
fn error_message_truncates_plain_bodies() {
    let long = "x".repeat(500);
    let msg = error_message(&long);
    assert_eq!(msg.len(), 203);
    assert!(msg.ends_with("..."));
    assert_eq!(error_message("  "), "empty response body");
    assert_eq!(error_message("Internal Server Error"), "Internal Server Error");
}

#[test]
fn html_title_is_case_insensitive() {
    assert_eq!(error_message("<HTML><TITLE>Gateway Timeout</TITLE></HTML>"), "Gateway Timeout");
    assert_eq!(error_message("<title lang=\"en\">Oops</title>"), "Oops");
}
