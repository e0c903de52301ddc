use super::{Coord, Geometry, Shape};
use crate::error::{IngestError, Result};
use wkt::to_wkt::write_geometry;

/// Encode a geometry as WKT, e.g. `POINT(99.45 12.8)`.
///
/// The SRID is not part of the text; callers pair it with the layer's SRID
/// themselves (for instance in `ST_GeomFromText(wkt, srid)`).
pub fn encode_wkt(geometry: &Geometry) -> Result<String> {
    geometry.ensure_finite()?;
    let geometry = to_geo_types(&geometry.shape)?;
    let mut wkt = String::new();
    write_geometry(&mut wkt, &geometry)
        .map_err(|err| IngestError::InvalidGeometry(err.to_string()))?;
    Ok(wkt)
}

fn to_geo_types(shape: &Shape) -> Result<geo_types::Geometry<f64>> {
    let geometry = match shape {
        Shape::Point(coord) => geo_types::Geometry::Point(point(coord)),
        Shape::LineString(coords) => geo_types::Geometry::LineString(line_string(coords)),
        Shape::Polygon(rings) => geo_types::Geometry::Polygon(polygon(rings)?),
        Shape::MultiPoint(coords) => geo_types::Geometry::MultiPoint(geo_types::MultiPoint::new(
            coords.iter().map(point).collect(),
        )),
        Shape::MultiLineString(lines) => geo_types::Geometry::MultiLineString(
            geo_types::MultiLineString::new(lines.iter().map(|line| line_string(line)).collect()),
        ),
        Shape::MultiPolygon(polygons) => {
            geo_types::Geometry::MultiPolygon(geo_types::MultiPolygon::new(
                polygons
                    .iter()
                    .map(|rings| polygon(rings))
                    .collect::<Result<Vec<_>>>()?,
            ))
        }
    };
    Ok(geometry)
}

fn point(coord: &Coord) -> geo_types::Point<f64> {
    geo_types::Point::new(coord.x, coord.y)
}

fn line_string(coords: &[Coord]) -> geo_types::LineString<f64> {
    geo_types::LineString::from(
        coords
            .iter()
            .map(|coord| (coord.x, coord.y))
            .collect::<Vec<_>>(),
    )
}

fn polygon(rings: &[Vec<Coord>]) -> Result<geo_types::Polygon<f64>> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| IngestError::InvalidGeometry("polygon has no exterior ring".into()))?;
    Ok(geo_types::Polygon::new(
        line_string(exterior),
        interiors.iter().map(|ring| line_string(ring)).collect(),
    ))
}
