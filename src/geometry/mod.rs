//! Tagged geometry values and their encoders.
//!
//! A [`Geometry`] is one of the six kinds a layer can be declared with, plus
//! the SRID the caller claims its coordinates are in. Geometries come either
//! from a request body (`{"type": ..., "coordinates": ..., "srid": ...}`) or
//! from any value implementing `geo_traits::GeometryTrait`.

mod gml;
mod well_known_text;

pub use gml::encode_gml;
pub use well_known_text::encode_wkt;

use crate::conversions::{geometry_kind_from_str, geometry_kind_to_str};
use crate::error::{IngestError, Result};
use crate::types::GeometryKind;
use geo_traits::{
    CoordTrait, Dimensions, GeometryTrait, LineStringTrait, MultiLineStringTrait, MultiPointTrait,
    MultiPolygonTrait, PointTrait, PolygonTrait,
};

/// A planar coordinate pair, `x` first (longitude for geographic SRSs).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Coordinate data of a geometry. Rings are sequences of coordinates; the
/// first ring of a polygon is its exterior.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

/// A geometry value with the SRID supplied alongside it, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub shape: Shape,
    pub srid: Option<i32>,
}

impl Geometry {
    pub fn new(shape: Shape) -> Self {
        Self { shape, srid: None }
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn kind(&self) -> GeometryKind {
        match self.shape {
            Shape::Point(_) => GeometryKind::Point,
            Shape::LineString(_) => GeometryKind::LineString,
            Shape::Polygon(_) => GeometryKind::Polygon,
            Shape::MultiPoint(_) => GeometryKind::MultiPoint,
            Shape::MultiLineString(_) => GeometryKind::MultiLineString,
            Shape::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Parse the `geom` member of an ingestion request.
    ///
    /// ```
    /// use serde_json::json;
    /// use wfst_ingest::{Geometry, GeometryKind};
    ///
    /// let geom = Geometry::from_json(&json!({"type": "POINT", "coordinates": [99.45, 12.8]}))?;
    /// assert_eq!(geom.kind(), GeometryKind::Point);
    /// assert_eq!(geom.srid, None);
    /// # Ok::<(), wfst_ingest::IngestError>(())
    /// ```
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| IngestError::InvalidGeometry("geometry must be an object".into()))?;

        let kind_str = object
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| IngestError::InvalidGeometry("missing geometry type".into()))?;
        let kind = geometry_kind_from_str(kind_str)?;

        let coordinates = object
            .get("coordinates")
            .ok_or_else(|| IngestError::InvalidGeometry("missing coordinates".into()))?;

        let shape = match kind {
            GeometryKind::Point => Shape::Point(parse_coord(coordinates)?),
            GeometryKind::LineString => Shape::LineString(parse_coords(coordinates)?),
            GeometryKind::Polygon => Shape::Polygon(parse_polygon(coordinates)?),
            GeometryKind::MultiPoint => Shape::MultiPoint(parse_coords(coordinates)?),
            GeometryKind::MultiLineString => {
                Shape::MultiLineString(parse_list(coordinates, parse_coords)?)
            }
            GeometryKind::MultiPolygon => {
                Shape::MultiPolygon(parse_list(coordinates, parse_polygon)?)
            }
        };

        let srid = match object.get("srid") {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(
                value
                    .as_i64()
                    .and_then(|srid| i32::try_from(srid).ok())
                    .ok_or_else(|| {
                        IngestError::InvalidGeometry(format!("srid must be an integer, got {value}"))
                    })?,
            ),
        };

        Ok(Self { shape, srid })
    }

    /// Convert any `geo_traits` geometry into one of the six supported kinds.
    ///
    /// Geometry collections, rects, triangles and lines have no counterpart
    /// and are rejected with [`IngestError::UnsupportedGeometryKind`]. Only
    /// two-dimensional input is accepted: Z or M ordinates and NaN or infinite
    /// coordinates are [`IngestError::InvalidGeometry`].
    pub fn from_geo_traits<G: GeometryTrait<T = f64>>(geometry: &G) -> Result<Self> {
        use geo_traits::GeometryType as GeoType;

        let dim = geometry.dim();
        if !matches!(dim, Dimensions::Xy) {
            return Err(IngestError::InvalidGeometry(format!(
                "only XY coordinates are supported, got {dim:?}"
            )));
        }

        let shape = match geometry.as_type() {
            GeoType::Point(point) => Shape::Point(point_coord(point)?),
            GeoType::LineString(line) => Shape::LineString(line_coords(line)?),
            GeoType::Polygon(polygon) => Shape::Polygon(polygon_rings(polygon)?),
            GeoType::MultiPoint(points) => Shape::MultiPoint(
                points
                    .points()
                    .map(|point| point_coord(&point))
                    .collect::<Result<Vec<_>>>()?,
            ),
            GeoType::MultiLineString(lines) => Shape::MultiLineString(
                lines
                    .line_strings()
                    .map(|line| line_coords(&line))
                    .collect::<Result<Vec<_>>>()?,
            ),
            GeoType::MultiPolygon(polygons) => Shape::MultiPolygon(
                polygons
                    .polygons()
                    .map(|polygon| polygon_rings(&polygon))
                    .collect::<Result<Vec<_>>>()?,
            ),
            GeoType::GeometryCollection(_) => {
                return Err(IngestError::UnsupportedGeometryKind(
                    "GEOMETRYCOLLECTION".to_string(),
                ));
            }
            GeoType::Rect(_) => {
                return Err(IngestError::UnsupportedGeometryKind("RECT".to_string()));
            }
            GeoType::Triangle(_) => {
                return Err(IngestError::UnsupportedGeometryKind("TRIANGLE".to_string()));
            }
            GeoType::Line(_) => {
                return Err(IngestError::UnsupportedGeometryKind("LINE".to_string()));
            }
        };

        Ok(Self::new(shape))
    }

    /// Name of the geometry kind as stored in the registry (`POINT`, ...).
    pub fn kind_name(&self) -> &'static str {
        geometry_kind_to_str(self.kind())
    }

    pub(crate) fn ensure_finite(&self) -> Result<()> {
        let mut coords: Box<dyn Iterator<Item = &Coord> + '_> = match &self.shape {
            Shape::Point(coord) => Box::new(std::iter::once(coord)),
            Shape::LineString(coords) | Shape::MultiPoint(coords) => Box::new(coords.iter()),
            Shape::Polygon(rings) | Shape::MultiLineString(rings) => Box::new(rings.iter().flatten()),
            Shape::MultiPolygon(polygons) => Box::new(polygons.iter().flatten().flatten()),
        };
        match coords.find(|coord| !(coord.x.is_finite() && coord.y.is_finite())) {
            Some(coord) => Err(IngestError::InvalidGeometry(format!(
                "coordinates must be finite, got ({}, {})",
                coord.x, coord.y
            ))),
            None => Ok(()),
        }
    }
}

fn coord_from<C: CoordTrait<T = f64>>(coord: &C) -> Result<Coord> {
    let (x, y) = (coord.x(), coord.y());
    if x.is_finite() && y.is_finite() {
        Ok(Coord::new(x, y))
    } else {
        Err(IngestError::InvalidGeometry(format!(
            "coordinates must be finite, got ({x}, {y})"
        )))
    }
}

fn point_coord<P: PointTrait<T = f64>>(point: &P) -> Result<Coord> {
    let coord = point
        .coord()
        .ok_or_else(|| IngestError::InvalidGeometry("empty point".into()))?;
    coord_from(&coord)
}

fn line_coords<L: LineStringTrait<T = f64>>(line: &L) -> Result<Vec<Coord>> {
    line.coords().map(|coord| coord_from(&coord)).collect()
}

fn polygon_rings<P: PolygonTrait<T = f64>>(polygon: &P) -> Result<Vec<Vec<Coord>>> {
    let mut rings = Vec::with_capacity(polygon.num_interiors() + 1);
    if let Some(exterior) = polygon.exterior() {
        rings.push(line_coords(&exterior)?);
    }
    for ring in polygon.interiors() {
        rings.push(line_coords(&ring)?);
    }
    Ok(rings)
}

fn parse_coord(value: &serde_json::Value) -> Result<Coord> {
    match value.as_array().map(Vec::as_slice) {
        Some([x, y]) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => Ok(Coord::new(x, y)),
            _ => Err(IngestError::InvalidGeometry(format!(
                "coordinates must be numbers, got {value}"
            ))),
        },
        _ => Err(IngestError::InvalidGeometry(format!(
            "expected an [x, y] pair, got {value}"
        ))),
    }
}

fn parse_list<T>(
    value: &serde_json::Value,
    parse: fn(&serde_json::Value) -> Result<T>,
) -> Result<Vec<T>> {
    value
        .as_array()
        .ok_or_else(|| IngestError::InvalidGeometry(format!("expected an array, got {value}")))?
        .iter()
        .map(parse)
        .collect()
}

fn parse_coords(value: &serde_json::Value) -> Result<Vec<Coord>> {
    parse_list(value, parse_coord)
}

fn parse_polygon(value: &serde_json::Value) -> Result<Vec<Vec<Coord>>> {
    let rings = parse_list(value, parse_coords)?;
    if rings.is_empty() {
        return Err(IngestError::InvalidGeometry(
            "polygon has no exterior ring".into(),
        ));
    }
    Ok(rings)
}
