use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn empty_environment_yields_defaults() {
    let cfg = SyncConfig::from_lookup(lookup_from(&[]));
    assert_eq!(cfg, SyncConfig::default());
    assert_eq!(cfg.reconnect_base, Duration::from_secs(3));
    assert_eq!(cfg.reconnect_max, Duration::from_secs(30));
    assert_eq!(cfg.reconnect_max_attempts, None);
    assert_eq!(cfg.staleness, Duration::from_millis(200));
    assert_eq!(cfg.request_timeout, Duration::from_secs(10));
}

#[test]
fn environment_overrides_are_applied() {
    let cfg = SyncConfig::from_lookup(lookup_from(&[
        ("OTEF_BASE_URL", "https://table.example.org/"),
        ("OTEF_TABLE", "lab"),
        ("OTEF_RECONNECT_MAX_ATTEMPTS", "5"),
        ("OTEF_STALENESS_MS", "350"),
        ("OTEF_JOYSTICK_MAX_SPEED", "120.5"),
    ]));
    assert_eq!(cfg.base_url, "https://table.example.org/");
    assert_eq!(cfg.table, "lab");
    assert_eq!(cfg.reconnect_max_attempts, Some(5));
    assert_eq!(cfg.staleness, Duration::from_millis(350));
    assert!((cfg.joystick_max_speed - 120.5).abs() < f64::EPSILON);
}

#[test]
fn unparsable_values_fall_back_to_defaults() {
    let cfg = SyncConfig::from_lookup(lookup_from(&[
        ("OTEF_PAN_REPEAT_MS", "soon"),
        ("OTEF_RECONNECT_MAX_ATTEMPTS", "-1"),
        ("OTEF_TABLE", ""),
    ]));
    assert_eq!(cfg.pan_repeat, Duration::from_millis(DEFAULT_PAN_REPEAT_MS));
    assert_eq!(cfg.reconnect_max_attempts, None);
    assert_eq!(cfg.table, DEFAULT_TABLE);
}

#[test]
fn zero_periods_and_non_positive_speeds_fall_back_to_defaults() {
    let cfg = SyncConfig::from_lookup(lookup_from(&[
        ("OTEF_FRAME_INTERVAL_MS", "0"),
        ("OTEF_PAN_REPEAT_MS", "0"),
        ("OTEF_JOYSTICK_WINDOW_MS", "0"),
        ("OTEF_REQUEST_TIMEOUT_SECS", "0"),
        ("OTEF_PAN_DELTA", "NaN"),
        ("OTEF_JOYSTICK_MAX_SPEED", "inf"),
    ]));
    assert_eq!(cfg.frame_interval, Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS));
    assert_eq!(cfg.pan_repeat, Duration::from_millis(DEFAULT_PAN_REPEAT_MS));
    assert_eq!(cfg.joystick_window, Duration::from_millis(DEFAULT_JOYSTICK_WINDOW_MS));
    assert_eq!(cfg.request_timeout, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    assert!((cfg.pan_delta - DEFAULT_PAN_DELTA).abs() < f64::EPSILON);
    assert!((cfg.joystick_max_speed - DEFAULT_JOYSTICK_MAX_SPEED).abs() < f64::EPSILON);

    let cfg = SyncConfig::from_lookup(lookup_from(&[("OTEF_PAN_DELTA", "-1"), ("OTEF_JOYSTICK_MAX_SPEED", "0")]));
    assert!((cfg.pan_delta - DEFAULT_PAN_DELTA).abs() < f64::EPSILON);
    assert!((cfg.joystick_max_speed - DEFAULT_JOYSTICK_MAX_SPEED).abs() < f64::EPSILON);
}

#[test]
fn state_url_uses_table_resource() {
    let cfg = SyncConfig::new("http://localhost:8000/", "otef");
    assert_eq!(cfg.state_url(), "http://localhost:8000/api/otef_viewport/by-table/otef/");
}

#[test]
fn ws_url_maps_scheme_and_substitutes_table() {
    let cfg = SyncConfig::new("http://localhost:8000", "lab");
    assert_eq!(cfg.ws_url().expect("ws url"), "ws://localhost:8000/ws/otef/lab/");

    let cfg = SyncConfig::new("https://table.example.org/", "otef");
    assert_eq!(cfg.ws_url().expect("ws url"), "wss://table.example.org/ws/otef/otef/");
}

#[test]
fn ws_url_rejects_non_http_base() {
    let cfg = SyncConfig::new("ftp://nope", "otef");
    assert_eq!(cfg.ws_url(), Err(ConfigError::InvalidBaseUrl("ftp://nope".to_owned())));
}
