use super::*;
use crate::types::{Bbox, Point};

fn vp(min_x: f64, min_y: f64, max_x: f64, max_y: f64, zoom: u8) -> Viewport {
    Viewport::new(Bbox::new(min_x, min_y, max_x, max_y).expect("bbox"), zoom)
}

fn centered(x: f64, y: f64) -> Viewport {
    Viewport::new(Bbox::from_center(Point::new(x, y), 5.0, 5.0).expect("bbox"), 15)
}

fn fence_1000() -> BoundsPolygon {
    BoundsPolygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(1000.0, 0.0),
        Point::new(1000.0, 1000.0),
        Point::new(0.0, 1000.0),
    ])
}

// =============================================================
// Direction parsing
// =============================================================

#[test]
fn direction_parses_case_insensitively() {
    assert_eq!("North".parse::<Direction>(), Ok(Direction::NORTH));
    assert_eq!(" west ".parse::<Direction>(), Ok(Direction::WEST));
    assert_eq!("southEast".parse::<Direction>(), Ok(Direction { east: 1, north: -1 }));
    assert_eq!("north-west".parse::<Direction>(), Ok(Direction { east: -1, north: 1 }));
}

#[test]
fn direction_rejects_unknown_and_conflicting_words() {
    for bad in ["", "up", "northsouth", "eastwest", "northerly"] {
        assert_eq!(
            bad.parse::<Direction>(),
            Err(ViewportError::UnknownDirection(bad.to_owned())),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn direction_display_is_canonical() {
    let d: Direction = "NorthEast".parse().expect("direction");
    assert_eq!(d.to_string(), "northeast");
}

// =============================================================
// pan
// =============================================================

#[test]
fn pan_east_shifts_by_fraction_of_width() {
    let out = pan(&vp(0.0, 0.0, 100.0, 100.0, 15), Direction::EAST, 0.2, &BoundsPolygon::default()).expect("pan");
    assert_eq!(out.bbox().to_array(), [20.0, 0.0, 120.0, 100.0]);
    assert_eq!(out.zoom(), 15);
}

#[test]
fn pan_diagonal_equals_two_cardinal_pans() {
    let start = vp(0.0, 0.0, 100.0, 100.0, 15);
    let fence = BoundsPolygon::default();
    let diagonal = pan(&start, "northeast".parse().expect("dir"), 0.2, &fence).expect("pan");
    let north = pan(&start, Direction::NORTH, 0.2, &fence).expect("pan");
    let then_east = pan(&north, Direction::EAST, 0.2, &fence).expect("pan");
    assert_eq!(diagonal.bbox(), then_east.bbox());
}

#[test]
fn pan_keeps_corners_in_sync() {
    let out = pan(&vp(0.0, 0.0, 100.0, 100.0, 15), Direction::SOUTH, 0.5, &BoundsPolygon::default()).expect("pan");
    assert_eq!(out.corners().sw, Point::new(0.0, -50.0));
    assert_eq!(out.corners().ne, Point::new(100.0, 50.0));
}

#[test]
fn pan_out_of_fence_is_rejected() {
    let start = centered(995.0, 500.0);
    assert_eq!(pan(&start, Direction::EAST, 1.0, &fence_1000()), Err(Rejection::Bounds));
    // Inward pan from the same spot is fine.
    assert!(pan(&start, Direction::WEST, 1.0, &fence_1000()).is_ok());
}

// =============================================================
// zoom_to
// =============================================================

#[test]
fn zoom_in_one_level_halves_extent() {
    let out = zoom_to(&vp(0.0, 0.0, 100.0, 100.0, 15), 16, &BoundsPolygon::default()).expect("zoom");
    assert_eq!(out.bbox().to_array(), [25.0, 25.0, 75.0, 75.0]);
    assert_eq!(out.zoom(), 16);
}

#[test]
fn zoom_round_trip_restores_extent() {
    let start = vp(0.0, 0.0, 100.0, 100.0, 15);
    let fence = BoundsPolygon::default();
    let zoomed = zoom_to(&start, 17, &fence).expect("zoom");
    let back = zoom_to(&zoomed, 15, &fence).expect("zoom");
    assert_eq!(back.bbox(), start.bbox());
    assert_eq!(back.zoom(), 15);
}

#[test]
fn zoom_is_clamped_to_supported_range() {
    let start = vp(0.0, 0.0, 100.0, 100.0, 18);
    let fence = BoundsPolygon::default();
    assert_eq!(zoom_to(&start, 25, &fence).expect("zoom").zoom(), 19);
    assert_eq!(zoom_to(&start, -3, &fence).expect("zoom").zoom(), 10);
}

#[test]
fn zoom_keeps_center() {
    let start = centered(300.0, 700.0);
    let out = zoom_to(&start, 12, &fence_1000()).expect("zoom");
    assert_eq!(out.center(), start.center());
}

// =============================================================
// integrate_velocity
// =============================================================

#[test]
fn free_motion_moves_both_axes() {
    let step = integrate_velocity(&centered(500.0, 500.0), Velocity::new(100.0, -50.0), 0.05, &fence_1000());
    assert_eq!(step.axis, Axis::Both);
    assert_eq!(step.velocity, Velocity::new(100.0, -50.0));
    assert_eq!(step.viewport.center(), Point::new(505.0, 497.5));
}

#[test]
fn step_is_capped_at_max_dt() {
    let step = integrate_velocity(&centered(500.0, 500.0), Velocity::new(100.0, 0.0), 5.0, &fence_1000());
    assert_eq!(step.viewport.center(), Point::new(510.0, 500.0));
}

#[test]
fn slides_along_north_edge() {
    let step = integrate_velocity(&centered(500.0, 995.0), Velocity::new(100.0, 100.0), 0.1, &fence_1000());
    assert_eq!(step.axis, Axis::XOnly);
    assert_eq!(step.velocity, Velocity::new(100.0, 0.0));
    assert_eq!(step.viewport.center(), Point::new(510.0, 995.0));
}

#[test]
fn slides_along_east_edge() {
    let step = integrate_velocity(&centered(995.0, 500.0), Velocity::new(100.0, 100.0), 0.1, &fence_1000());
    assert_eq!(step.axis, Axis::YOnly);
    assert_eq!(step.velocity, Velocity::new(0.0, 100.0));
    assert_eq!(step.viewport.center(), Point::new(995.0, 510.0));
}

#[test]
fn corner_blocks_and_zeroes_velocity() {
    let start = centered(995.0, 995.0);
    let step = integrate_velocity(&start, Velocity::new(100.0, 100.0), 0.1, &fence_1000());
    assert_eq!(step.axis, Axis::Blocked);
    assert_eq!(step.velocity, Velocity::ZERO);
    assert_eq!(step.viewport, start);
}

#[test]
fn non_finite_dt_does_not_move() {
    let start = centered(500.0, 500.0);
    let step = integrate_velocity(&start, Velocity::new(100.0, 0.0), f64::NAN, &fence_1000());
    assert_eq!(step.viewport.center(), start.center());
}
