use crate::error::{IngestError, Result};
use crate::types::{FieldType, GeometryKind, ScalarType};

#[inline]
pub(crate) fn geometry_kind_to_str(kind: GeometryKind) -> &'static str {
    match kind {
        GeometryKind::Point => "POINT",
        GeometryKind::LineString => "LINESTRING",
        GeometryKind::Polygon => "POLYGON",
        GeometryKind::MultiPoint => "MULTIPOINT",
        GeometryKind::MultiLineString => "MULTILINESTRING",
        GeometryKind::MultiPolygon => "MULTIPOLYGON",
    }
}

/// GML element (and GeoServer binding) name of a geometry kind.
#[inline]
pub(crate) fn geometry_kind_to_gml_name(kind: GeometryKind) -> &'static str {
    match kind {
        GeometryKind::Point => "Point",
        GeometryKind::LineString => "LineString",
        GeometryKind::Polygon => "Polygon",
        GeometryKind::MultiPoint => "MultiPoint",
        GeometryKind::MultiLineString => "MultiLineString",
        GeometryKind::MultiPolygon => "MultiPolygon",
    }
}

#[inline]
pub(crate) fn geometry_kind_from_str(geometry_kind_str: &str) -> Result<GeometryKind> {
    let s = geometry_kind_str.trim();
    if s.eq_ignore_ascii_case("POINT") {
        Ok(GeometryKind::Point)
    } else if s.eq_ignore_ascii_case("LINESTRING") {
        Ok(GeometryKind::LineString)
    } else if s.eq_ignore_ascii_case("POLYGON") {
        Ok(GeometryKind::Polygon)
    } else if s.eq_ignore_ascii_case("MULTIPOINT") {
        Ok(GeometryKind::MultiPoint)
    } else if s.eq_ignore_ascii_case("MULTILINESTRING") {
        Ok(GeometryKind::MultiLineString)
    } else if s.eq_ignore_ascii_case("MULTIPOLYGON") {
        Ok(GeometryKind::MultiPolygon)
    } else {
        Err(IngestError::UnsupportedGeometryKind(
            geometry_kind_str.to_string(),
        ))
    }
}

/// Canonical SQL name of a scalar type, used in messages and PostgreSQL casts.
#[inline]
pub(crate) fn scalar_type_to_str(scalar: ScalarType) -> &'static str {
    match scalar {
        ScalarType::Integer => "integer",
        ScalarType::BigInt => "bigint",
        ScalarType::Numeric => "numeric",
        ScalarType::Real => "real",
        ScalarType::Double => "double precision",
        ScalarType::Text => "text",
        ScalarType::Varchar => "varchar",
        ScalarType::Boolean => "boolean",
        ScalarType::Timestamp => "timestamp",
    }
}

/// SQLite type affinity a scalar type is cast to.
#[inline]
pub(crate) fn scalar_type_to_sqlite_affinity(scalar: ScalarType) -> &'static str {
    match scalar {
        ScalarType::Integer | ScalarType::BigInt | ScalarType::Boolean => "INTEGER",
        ScalarType::Numeric => "NUMERIC",
        ScalarType::Real | ScalarType::Double => "REAL",
        ScalarType::Text | ScalarType::Varchar | ScalarType::Timestamp => "TEXT",
    }
}

#[inline]
pub(crate) fn field_type_to_string(field_type: FieldType) -> String {
    match field_type {
        FieldType::Scalar(scalar) => scalar_type_to_str(scalar).to_string(),
        FieldType::Array(scalar) => format!("{}[]", scalar_type_to_str(scalar)),
    }
}

#[inline]
fn scalar_type_from_str(s: &str) -> Option<ScalarType> {
    // cf. https://www.postgresql.org/docs/current/datatype.html#DATATYPE-TABLE
    if s.eq_ignore_ascii_case("integer")
        || s.eq_ignore_ascii_case("int")
        || s.eq_ignore_ascii_case("int4")
    {
        Some(ScalarType::Integer)
    } else if s.eq_ignore_ascii_case("bigint") || s.eq_ignore_ascii_case("int8") {
        Some(ScalarType::BigInt)
    } else if s.eq_ignore_ascii_case("numeric") || s.eq_ignore_ascii_case("decimal") {
        Some(ScalarType::Numeric)
    } else if s.eq_ignore_ascii_case("real") || s.eq_ignore_ascii_case("float4") {
        Some(ScalarType::Real)
    } else if s.eq_ignore_ascii_case("double precision")
        || s.eq_ignore_ascii_case("double")
        || s.eq_ignore_ascii_case("float8")
    {
        Some(ScalarType::Double)
    } else if s.eq_ignore_ascii_case("text") {
        Some(ScalarType::Text)
    } else if s.eq_ignore_ascii_case("varchar") || s.eq_ignore_ascii_case("character varying") {
        Some(ScalarType::Varchar)
    } else if s.eq_ignore_ascii_case("boolean") || s.eq_ignore_ascii_case("bool") {
        Some(ScalarType::Boolean)
    } else if s.eq_ignore_ascii_case("timestamp") {
        Some(ScalarType::Timestamp)
    } else {
        None
    }
}

// PostgreSQL names array types after their element type with a leading
// underscore (`_int4` is `integer[]`).
#[inline]
fn internal_array_type_from_str(s: &str) -> Option<ScalarType> {
    if s.eq_ignore_ascii_case("_int4") {
        Some(ScalarType::Integer)
    } else if s.eq_ignore_ascii_case("_int8") {
        Some(ScalarType::BigInt)
    } else if s.eq_ignore_ascii_case("_numeric") {
        Some(ScalarType::Numeric)
    } else if s.eq_ignore_ascii_case("_float4") {
        Some(ScalarType::Real)
    } else if s.eq_ignore_ascii_case("_float8") {
        Some(ScalarType::Double)
    } else if s.eq_ignore_ascii_case("_text") {
        Some(ScalarType::Text)
    } else if s.eq_ignore_ascii_case("_varchar") {
        Some(ScalarType::Varchar)
    } else if s.eq_ignore_ascii_case("_bool") {
        Some(ScalarType::Boolean)
    } else if s.eq_ignore_ascii_case("_timestamp") {
        Some(ScalarType::Timestamp)
    } else {
        None
    }
}

/// Resolve a registry type string. Unrecognized strings yield `None`; there is
/// no fallback type.
#[inline]
pub(crate) fn field_type_from_str(field_type_str: &str) -> Option<FieldType> {
    let s = field_type_str.trim();
    if let Some(element) = s.strip_suffix("[]") {
        scalar_type_from_str(element.trim_end()).map(FieldType::Array)
    } else if s.starts_with('_') {
        internal_array_type_from_str(s).map(FieldType::Array)
    } else {
        scalar_type_from_str(s).map(FieldType::Scalar)
    }
}

/// Derive a workspace or feature type name from a display name: lower-case,
/// spaces become underscores. The result has to be usable as an XML NCName.
pub(crate) fn normalize_name(display_name: &str) -> Result<String> {
    let name = display_name.trim().to_lowercase().replace(' ', "_");
    if is_ncname(&name) {
        Ok(name)
    } else {
        Err(IngestError::InvalidName(display_name.to_string()))
    }
}

// Restricted to the ASCII subset of NCName; GeoServer workspace names are ASCII.
fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
