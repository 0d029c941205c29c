use clap::CommandFactory;

use super::*;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn pan_parses_compass_words() {
    let cli = Cli::try_parse_from(["otef", "pan", "NorthEast", "--delta", "0.2"]).expect("parse");
    let Command::Pan { direction, delta } = cli.command else {
        panic!("expected pan, got {:?}", cli.command);
    };
    assert_eq!(direction, Direction { east: 1, north: 1 });
    assert_eq!(delta, Some(0.2));

    assert!(Cli::try_parse_from(["otef", "pan", "up"]).is_err());
}

#[test]
fn drive_accepts_negative_velocity() {
    let cli = Cli::try_parse_from(["otef", "drive", "--vx", "-250", "--seconds", "1"]).expect("parse");
    let Command::Drive { vx, vy, seconds } = cli.command else {
        panic!("expected drive, got {:?}", cli.command);
    };
    assert!((vx + 250.0).abs() < f64::EPSILON);
    assert!(vy.abs() < f64::EPSILON);
    assert!((seconds - 1.0).abs() < f64::EPSILON);
}

#[test]
fn deflection_inverts_screen_y_and_clamps() {
    assert_eq!(joystick_deflection(250.0, 250.0, 500.0), (0.5, -0.5));
    assert_eq!(joystick_deflection(5000.0, 0.0, 500.0), (1.0, 0.0));
    assert_eq!(joystick_deflection(1.0, 1.0, 0.0), (0.0, 0.0));
}

#[test]
fn bounds_file_accepts_array_and_object() {
    let dir = std::env::temp_dir();
    let array = dir.join(format!("otef-bounds-array-{}.json", std::process::id()));
    let object = dir.join(format!("otef-bounds-object-{}.json", std::process::id()));
    std::fs::write(&array, r#"[{"x":0,"y":0},{"x":10,"y":0},{"x":10,"y":10}]"#).expect("write");
    std::fs::write(&object, r#"{"bounds_polygon":[{"x":0,"y":0},{"x":5,"y":0},{"x":5,"y":5},{"x":0,"y":5}]}"#)
        .expect("write");

    assert_eq!(read_bounds(&array).expect("array").vertices().len(), 3);
    assert_eq!(read_bounds(&object).expect("object").vertices().len(), 4);
    assert!(matches!(read_bounds(&dir.join("otef-missing.json")), Err(CliError::Read { .. })));

    let _ = std::fs::remove_file(array);
    let _ = std::fs::remove_file(object);
}
