use super::*;

fn square_polygon() -> Geometry {
    Geometry::Polygon {
        coordinates: vec![vec![
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(10.0, 10.0),
            Position::new(0.0, 10.0),
            Position::new(0.0, 0.0),
        ]],
    }
}

fn nest(mut g: Geometry, levels: usize) -> Geometry {
    for _ in 0..levels {
        g = Geometry::GeometryCollection { geometries: vec![g] };
    }
    g
}

#[test]
fn identity_transform_yields_equal_independent_copy() {
    let original = Geometry::MultiPolygon { coordinates: vec![match square_polygon() {
        Geometry::Polygon { coordinates } => coordinates,
        _ => unreachable!(),
    }] };
    let copy = original.transform(Some).expect("transform");
    assert_eq!(copy, original);

    let twice = copy.transform(Some).expect("transform");
    assert_eq!(twice, original);
}

#[test]
fn transform_does_not_mutate_input() {
    let original = square_polygon();
    let snapshot = original.clone();
    let shifted = original.transform(|p| Some(Point::new(p.x + 1.0, p.y))).expect("transform");
    assert_eq!(original, snapshot);
    assert_ne!(shifted, original);
}

#[test]
fn transform_keeps_altitude() {
    let g = Geometry::Point { coordinates: Position { x: 1.0, y: 2.0, z: Some(30.0) } };
    let out = g.transform(|p| Some(Point::new(p.x * 2.0, p.y * 2.0))).expect("transform");
    assert_eq!(out, Geometry::Point { coordinates: Position { x: 2.0, y: 4.0, z: Some(30.0) } });
}

#[test]
fn none_from_transform_aborts_walk() {
    let err = square_polygon().transform(|_| None).expect_err("unavailable");
    assert_eq!(err, GeometryError::TransformUnavailable);
}

#[test]
fn non_finite_output_counts_as_unavailable() {
    let err = square_polygon()
        .transform(|p| Some(Point::new(p.x / 0.0, p.y)))
        .expect_err("unavailable");
    assert_eq!(err, GeometryError::TransformUnavailable);
}

#[test]
fn collections_within_depth_limit_transform() {
    let g = nest(Geometry::Point { coordinates: Position::new(1.0, 1.0) }, 9);
    assert!(g.transform(Some).is_ok());
}

#[test]
fn collections_beyond_depth_limit_are_rejected() {
    let g = nest(Geometry::Point { coordinates: Position::new(1.0, 1.0) }, 10);
    assert_eq!(g.transform(Some), Err(GeometryError::TooDeep { max: MAX_GEOMETRY_DEPTH }));

    let g = nest(Geometry::MultiPolygon { coordinates: vec![] }, 7);
    assert!(matches!(g.transform(Some), Err(GeometryError::TooDeep { .. })));
}

#[test]
fn to_pixels_clamps_partially_outside_geometry() {
    let bounds = PixelBounds::new(0.0, 5.0, 5.0, 0.0, 100.0, 100.0);
    let out = square_polygon().to_pixels(&bounds).expect("pixels");
    let Geometry::Polygon { coordinates } = out else {
        panic!("expected polygon");
    };
    for p in &coordinates[0] {
        assert!((0.0..=100.0).contains(&p.x));
        assert!((0.0..=100.0).contains(&p.y));
    }
}

#[test]
fn to_pixels_with_degenerate_bounds_is_unavailable() {
    let bounds = PixelBounds::new(5.0, 5.0, 5.0, 0.0, 100.0, 100.0);
    assert_eq!(square_polygon().to_pixels(&bounds), Err(GeometryError::TransformUnavailable));
}

#[test]
fn geojson_shape_round_trips_through_serde() {
    let json = serde_json::json!({
        "type": "LineString",
        "coordinates": [[1.0, 2.0], [3.0, 4.0, 5.0]]
    });
    let g: Geometry = serde_json::from_value(json.clone()).expect("decode");
    assert_eq!(serde_json::to_value(&g).expect("encode"), json);
}

#[test]
fn position_rejects_single_number() {
    let res = serde_json::from_value::<Geometry>(serde_json::json!({"type": "Point", "coordinates": [1.0]}));
    assert!(res.is_err());
}

#[test]
fn feature_collection_transform_keeps_properties() {
    let fc: FeatureCollection = serde_json::from_value(serde_json::json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1.0, 1.0]}, "properties": {"name": "a"}},
            {"type": "Feature", "geometry": null, "properties": {"name": "b"}}
        ]
    }))
    .expect("decode");
    let out = fc.transform(|p| Some(Point::new(p.x + 10.0, p.y))).expect("transform");
    assert_eq!(out.features.len(), 2);
    assert_eq!(out.features[0].properties["name"], "a");
    assert_eq!(
        out.features[0].geometry,
        Some(Geometry::Point { coordinates: Position::new(11.0, 1.0) })
    );
    assert!(out.features[1].geometry.is_none());
}
