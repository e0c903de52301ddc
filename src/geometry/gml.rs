use super::{Coord, Geometry, Shape};
use crate::error::{IngestError, Result};

// GeoServer parses each kind with its own coordinate convention: `gml:coordinates`
// uses "x,y" tuples separated by spaces, `gml:pos`/`gml:posList` use bare
// space-separated ordinates. The convention per kind below is fixed.

/// Encode a geometry as a GML fragment declaring `EPSG:<srid>` on its outer element.
///
/// Polygons contribute only their exterior ring, and each member of a
/// multipolygon only its first ring; interior rings are dropped.
///
/// ```
/// use wfst_ingest::{Coord, Geometry, Shape, encode_gml};
///
/// let point = Geometry::new(Shape::Point(Coord::new(99.45, 12.8)));
/// assert_eq!(
///     encode_gml(&point, 4326)?,
///     r#"<gml:Point srsName="EPSG:4326"><gml:coordinates>99.45,12.8</gml:coordinates></gml:Point>"#
/// );
/// # Ok::<(), wfst_ingest::IngestError>(())
/// ```
pub fn encode_gml(geometry: &Geometry, srid: i32) -> Result<String> {
    geometry.ensure_finite()?;
    let srs = format!(r#"srsName="EPSG:{srid}""#);

    let gml = match &geometry.shape {
        Shape::Point(coord) => format!(
            "<gml:Point {srs}><gml:coordinates>{}</gml:coordinates></gml:Point>",
            comma_pair(coord)
        ),
        Shape::LineString(coords) => format!(
            r#"<gml:LineString {srs}><gml:coordinates decimal="." cs="," ts=" ">{}</gml:coordinates></gml:LineString>"#,
            comma_pairs(coords)
        ),
        Shape::Polygon(rings) => {
            let exterior = rings.first().ok_or_else(|| {
                IngestError::InvalidGeometry("polygon has no exterior ring".into())
            })?;
            format!(
                "<gml:Polygon {srs}><gml:exterior><gml:LinearRing><gml:posList>{}</gml:posList></gml:LinearRing></gml:exterior></gml:Polygon>",
                space_pairs(exterior)
            )
        }
        Shape::MultiPoint(coords) => {
            let mut gml = format!("<gml:MultiPoint {srs}>");
            for coord in coords {
                gml.push_str(&format!(
                    "<gml:pointMember><gml:Point><gml:pos>{}</gml:pos></gml:Point></gml:pointMember>",
                    space_pair(coord)
                ));
            }
            gml.push_str("</gml:MultiPoint>");
            gml
        }
        Shape::MultiLineString(lines) => {
            let mut gml = format!("<gml:MultiLineString {srs}>");
            for line in lines {
                gml.push_str(&format!(
                    "<gml:lineStringMember><gml:LineString><gml:posList>{}</gml:posList></gml:LineString></gml:lineStringMember>",
                    space_pairs(line)
                ));
            }
            gml.push_str("</gml:MultiLineString>");
            gml
        }
        Shape::MultiPolygon(polygons) => {
            let mut gml = format!("<gml:MultiPolygon {srs}>");
            for (idx, rings) in polygons.iter().enumerate() {
                let exterior = rings.first().ok_or_else(|| {
                    IngestError::InvalidGeometry(format!("polygon {idx} has no exterior ring"))
                })?;
                gml.push_str(&format!(
                    "<gml:polygonMember><gml:Polygon><gml:outerBoundaryIs><gml:LinearRing><gml:coordinates>{}</gml:coordinates></gml:LinearRing></gml:outerBoundaryIs></gml:Polygon></gml:polygonMember>",
                    comma_pairs(exterior)
                ));
            }
            gml.push_str("</gml:MultiPolygon>");
            gml
        }
    };

    Ok(gml)
}

fn comma_pair(coord: &Coord) -> String {
    format!("{},{}", coord.x, coord.y)
}

fn space_pair(coord: &Coord) -> String {
    format!("{} {}", coord.x, coord.y)
}

fn comma_pairs(coords: &[Coord]) -> String {
    coords.iter().map(comma_pair).collect::<Vec<_>>().join(" ")
}

fn space_pairs(coords: &[Coord]) -> String {
    coords.iter().map(space_pair).collect::<Vec<_>>().join(" ")
}
