//! Typed GeoJSON-like geometry tree with copy-and-transform.
//!
//! `transform` always builds a fresh tree; the input is never mutated. Each
//! terminal position goes through the caller's function, and a single
//! `None` aborts the whole walk as [`GeometryError::TransformUnavailable`]
//! (a half-transformed overlay is worse than none). Nesting is capped at
//! [`MAX_GEOMETRY_DEPTH`] array levels to guard against malformed input.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::consts::MAX_GEOMETRY_DEPTH;
use crate::coords::{PixelBounds, planar_to_pixel_clamped};
use crate::projection::planar_to_geographic;
use crate::types::Point;

/// Error returned by [`Geometry::transform`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    /// Nesting exceeded [`MAX_GEOMETRY_DEPTH`].
    #[error("geometry nesting deeper than {max} levels")]
    TooDeep { max: usize },
    /// The position transform returned `None`.
    #[error("coordinate transform unavailable")]
    TransformUnavailable,
}

/// A GeoJSON position: x/y plus an optional altitude that transforms carry through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [x, y] => Ok(Self { x: *x, y: *y, z: None }),
            [x, y, z, ..] => Ok(Self { x: *x, y: *y, z: Some(*z) }),
            _ => Err(format!("position needs at least 2 numbers, got {}", v.len())),
        }
    }
}

impl From<Position> for Vec<f64> {
    fn from(p: Position) -> Self {
        match p.z {
            Some(z) => vec![p.x, p.y, z],
            None => vec![p.x, p.y],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// Copy the tree, passing every position through `f`.
    ///
    /// # Errors
    ///
    /// [`GeometryError::TooDeep`] for over-nested collections,
    /// [`GeometryError::TransformUnavailable`] when `f` yields `None`.
    pub fn transform<F>(&self, mut f: F) -> Result<Self, GeometryError>
    where
        F: FnMut(Point) -> Option<Point>,
    {
        self.transform_at(&mut f, 0)
    }

    /// Planar geometry → pixel geometry, clamped to the raster.
    ///
    /// # Errors
    ///
    /// See [`Geometry::transform`]; degenerate bounds give `TransformUnavailable`.
    pub fn to_pixels(&self, bounds: &PixelBounds) -> Result<Self, GeometryError> {
        self.transform(|p| planar_to_pixel_clamped(p, bounds))
    }

    /// Planar geometry → WGS84 longitude/latitude geometry.
    ///
    /// # Errors
    ///
    /// See [`Geometry::transform`].
    pub fn to_geographic(&self) -> Result<Self, GeometryError> {
        self.transform(|p| planar_to_geographic(p).map(|g| Point::new(g.lon, g.lat)))
    }

    /// Array levels below this node (a bare Point is 1).
    fn own_depth(&self) -> usize {
        match self {
            Self::Point { .. } => 1,
            Self::MultiPoint { .. } | Self::LineString { .. } => 2,
            Self::MultiLineString { .. } | Self::Polygon { .. } => 3,
            Self::MultiPolygon { .. } => 4,
            Self::GeometryCollection { .. } => 1,
        }
    }

    fn transform_at<F>(&self, f: &mut F, depth: usize) -> Result<Self, GeometryError>
    where
        F: FnMut(Point) -> Option<Point>,
    {
        if depth + self.own_depth() > MAX_GEOMETRY_DEPTH {
            return Err(GeometryError::TooDeep { max: MAX_GEOMETRY_DEPTH });
        }
        Ok(match self {
            Self::Point { coordinates } => Self::Point { coordinates: map_position(*coordinates, f)? },
            Self::MultiPoint { coordinates } => Self::MultiPoint { coordinates: map_line(coordinates, f)? },
            Self::LineString { coordinates } => Self::LineString { coordinates: map_line(coordinates, f)? },
            Self::MultiLineString { coordinates } => {
                Self::MultiLineString { coordinates: map_rings(coordinates, f)? }
            }
            Self::Polygon { coordinates } => Self::Polygon { coordinates: map_rings(coordinates, f)? },
            Self::MultiPolygon { coordinates } => Self::MultiPolygon {
                coordinates: coordinates
                    .iter()
                    .map(|poly| map_rings(poly, f))
                    .collect::<Result<_, _>>()?,
            },
            Self::GeometryCollection { geometries } => Self::GeometryCollection {
                geometries: geometries
                    .iter()
                    .map(|g| g.transform_at(f, depth + 1))
                    .collect::<Result<_, _>>()?,
            },
        })
    }
}

fn map_position<F>(p: Position, f: &mut F) -> Result<Position, GeometryError>
where
    F: FnMut(Point) -> Option<Point>,
{
    let out = f(Point::new(p.x, p.y)).ok_or(GeometryError::TransformUnavailable)?;
    if !out.is_finite() {
        return Err(GeometryError::TransformUnavailable);
    }
    Ok(Position { x: out.x, y: out.y, z: p.z })
}

fn map_line<F>(line: &[Position], f: &mut F) -> Result<Vec<Position>, GeometryError>
where
    F: FnMut(Point) -> Option<Point>,
{
    line.iter().map(|p| map_position(*p, f)).collect()
}

fn map_rings<F>(rings: &[Vec<Position>], f: &mut F) -> Result<Vec<Vec<Position>>, GeometryError>
where
    F: FnMut(Point) -> Option<Point>,
{
    rings.iter().map(|ring| map_line(ring, f)).collect()
}

/// A GeoJSON feature; properties are carried through transforms untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Copy every feature with its geometry passed through `f`.
    ///
    /// # Errors
    ///
    /// The first [`GeometryError`] from any feature aborts the whole collection.
    pub fn transform<F>(&self, mut f: F) -> Result<Self, GeometryError>
    where
        F: FnMut(Point) -> Option<Point>,
    {
        let features = self
            .features
            .iter()
            .map(|feature| {
                let geometry = feature
                    .geometry
                    .as_ref()
                    .map(|g| g.transform_at(&mut f, 0))
                    .transpose()?;
                Ok(Feature { id: feature.id.clone(), geometry, properties: feature.properties.clone() })
            })
            .collect::<Result<_, GeometryError>>()?;
        Ok(Self { features })
    }
}
