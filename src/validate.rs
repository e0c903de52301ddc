//! Attribute and geometry validation against a layer schema.
//!
//! Every check runs to completion: the result lists every problem found in
//! the record so callers can report them all at once.

use crate::conversions::{field_type_to_string, geometry_kind_to_str, scalar_type_to_str};
use crate::geometry::Geometry;
use crate::types::{AttributeRecord, FieldType, LayerSchema, ScalarType, Value};

/// What a single validation error is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// The attribute key is not declared for the layer.
    UnknownField,
    /// The field is declared with a type missing from the alias table.
    UnknownFieldType,
    /// A scalar value does not match the declared type.
    TypeMismatch,
    /// An array-typed field received something other than an array.
    ArrayExpected,
    /// An array element does not match the declared element type.
    ElementTypeMismatch,
    GeometryTypeMismatch,
    SridMismatch,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    pub kind: ViolationKind,
    /// Field the error refers to; array elements are qualified as `name[idx]`.
    pub field: Option<String>,
    pub message: String,
}

/// Ordered validation errors. Empty means the record is valid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Messages in the order the errors were found.
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|err| err.message.as_str()).collect()
    }

    fn push(&mut self, kind: ViolationKind, field: Option<String>, message: String) {
        self.errors.push(ValidationError {
            kind,
            field,
            message,
        });
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Validate an attribute record and a geometry against a layer schema.
///
/// ```
/// use wfst_ingest::{
///     AttributeRecord, Coord, FieldDefinition, Geometry, GeometryKind, LayerSchema, Shape,
///     validate,
/// };
///
/// let schema = LayerSchema::new(
///     1,
///     "noise",
///     "city",
///     GeometryKind::Point,
///     4326,
///     [FieldDefinition::new("level", "integer")],
/// )?;
/// let attributes: AttributeRecord = [("level", 40.0), ("colour", 1.0)].into_iter().collect();
/// let geometry = Geometry::new(Shape::Point(Coord::new(1.0, 2.0))).with_srid(3857);
///
/// let result = validate(&schema, &attributes, &geometry);
/// assert_eq!(
///     result.messages(),
///     vec![
///         "Field 'colour' not defined for layer 1",
///         "SRID mismatch: expected 4326, got 3857",
///     ]
/// );
/// # Ok::<(), wfst_ingest::IngestError>(())
/// ```
pub fn validate(
    schema: &LayerSchema,
    attributes: &AttributeRecord,
    geometry: &Geometry,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (name, value) in attributes.iter() {
        let Some(field) = schema.field(name) else {
            result.push(
                ViolationKind::UnknownField,
                Some(name.to_string()),
                format!("Field '{name}' not defined for layer {}", schema.layer_id),
            );
            continue;
        };

        let field_type = match field.field_type() {
            Ok(field_type) => field_type,
            Err(_) => {
                let declared = field.declared_type.trim();
                let category = if declared.ends_with("[]") || declared.starts_with('_') {
                    "array"
                } else {
                    "DB"
                };
                result.push(
                    ViolationKind::UnknownFieldType,
                    Some(name.to_string()),
                    format!(
                        "Unknown {category} type '{}' for field '{name}'",
                        field.declared_type
                    ),
                );
                continue;
            }
        };

        match field_type {
            FieldType::Array(element) => check_array(&mut result, name, element, value),
            FieldType::Scalar(scalar) => {
                if !scalar_accepts(scalar, value) {
                    result.push(
                        ViolationKind::TypeMismatch,
                        Some(name.to_string()),
                        format!(
                            "Field '{name}' expects {}, got {}",
                            field_type_to_string(field_type),
                            describe_kind(value)
                        ),
                    );
                }
            }
        }
    }

    let kind = geometry.kind();
    if kind != schema.geometry_kind {
        result.push(
            ViolationKind::GeometryTypeMismatch,
            None,
            format!(
                "Geometry type mismatch: expected '{}', got '{}'",
                geometry_kind_to_str(schema.geometry_kind),
                geometry_kind_to_str(kind)
            ),
        );
    }

    if let Some(srid) = geometry.srid {
        if srid != schema.srid {
            result.push(
                ViolationKind::SridMismatch,
                None,
                format!("SRID mismatch: expected {}, got {srid}", schema.srid),
            );
        }
    }

    result
}

fn check_array(result: &mut ValidationResult, name: &str, element: ScalarType, value: &Value) {
    let Value::Array(elements) = value else {
        result.push(
            ViolationKind::ArrayExpected,
            Some(name.to_string()),
            format!(
                "Field '{name}' expects array (list), got {}",
                value.kind_name()
            ),
        );
        return;
    };

    for (idx, elem) in elements.iter().enumerate() {
        // NULL elements are allowed in arrays
        if elem.is_null() || element_accepts(element, elem) {
            continue;
        }
        result.push(
            ViolationKind::ElementTypeMismatch,
            Some(format!("{name}[{idx}]")),
            format!(
                "Field '{name}[{idx}]' expects {}, got {}: {elem}",
                scalar_type_to_str(element),
                describe_kind(elem)
            ),
        );
    }
}

fn describe_kind(value: &Value) -> &'static str {
    match value {
        Value::Real(value) if !value.is_finite() => "non-finite float",
        other => other.kind_name(),
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

fn accepts_integer(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Real(value) => is_integral(*value),
        _ => false,
    }
}

/// Direct type check of a scalar value; the only widening is an
/// integer-valued float for integer fields, plus any number for `numeric`.
fn scalar_accepts(scalar: ScalarType, value: &Value) -> bool {
    match scalar {
        ScalarType::Integer | ScalarType::BigInt => accepts_integer(value),
        ScalarType::Numeric => match value {
            Value::Integer(_) => true,
            Value::Real(value) => value.is_finite(),
            _ => false,
        },
        ScalarType::Real | ScalarType::Double => {
            matches!(value, Value::Real(value) if value.is_finite())
        }
        ScalarType::Text | ScalarType::Varchar | ScalarType::Timestamp => {
            matches!(value, Value::Text(_))
        }
        ScalarType::Boolean => matches!(value, Value::Boolean(_)),
    }
}

/// Array elements of floating types accept any number.
fn element_accepts(scalar: ScalarType, value: &Value) -> bool {
    match scalar {
        ScalarType::Real | ScalarType::Double => match value {
            Value::Integer(_) => true,
            Value::Real(value) => value.is_finite(),
            _ => false,
        },
        other => scalar_accepts(other, value),
    }
}

#[cfg(test)]
mod tests {
    use super::{ViolationKind, validate};
    use crate::error::Result;
    use crate::geometry::{Coord, Geometry, Shape};
    use crate::types::{AttributeRecord, FieldDefinition, GeometryKind, LayerSchema, Value};
    use serde_json::json;

    fn schema() -> Result<LayerSchema> {
        LayerSchema::new(
            12,
            "Noise Measurements",
            "City Sensors",
            GeometryKind::Point,
            4326,
            [
                FieldDefinition::new("count", "integer"),
                FieldDefinition::new("total", "bigint"),
                FieldDefinition::new("noise_level", "numeric").with_unit("dB"),
                FieldDefinition::new("ratio", "double precision"),
                FieldDefinition::new("label", "varchar"),
                FieldDefinition::new("note", "text"),
                FieldDefinition::new("active", "boolean"),
                FieldDefinition::new("observed_at", "timestamp"),
                FieldDefinition::new("species", "text[]"),
                FieldDefinition::new("readings", "_int4"),
                FieldDefinition::new("temperatures", "numeric[]").with_unit("°C"),
                FieldDefinition::new("weights", "real[]"),
                FieldDefinition::new("blob", "bytea"),
            ],
        )
    }

    fn point() -> Geometry {
        Geometry::new(Shape::Point(Coord::new(99.45, 12.8)))
    }

    fn record(value: serde_json::Value) -> Result<AttributeRecord> {
        AttributeRecord::from_json(value)
    }

    #[test]
    fn accepts_matching_record() -> Result<()> {
        let attributes = record(json!({
            "count": 3,
            "total": 9_000_000_000_i64,
            "noise_level": 42,
            "ratio": 0.5,
            "label": "north",
            "note": "ok",
            "active": true,
            "observed_at": "2025-11-16T08:04:00+07:00",
            "species": ["a", "b", null],
            "readings": [1, 2.0, null],
            "temperatures": [24, 24.5],
            "weights": [1, 2.5],
        }))?;

        let result = validate(&schema()?, &attributes, &point().with_srid(4326));
        assert!(result.is_valid(), "unexpected errors: {:?}", result.messages());
        Ok(())
    }

    #[test]
    fn integer_fields_accept_integral_floats_only() -> Result<()> {
        let schema = schema()?;

        let ok = validate(&schema, &record(json!({"count": 40.0}))?, &point());
        assert!(ok.is_valid());

        let err = validate(&schema, &record(json!({"count": 40.5}))?, &point());
        assert_eq!(err.messages(), vec!["Field 'count' expects integer, got float"]);
        assert_eq!(err.errors()[0].kind, ViolationKind::TypeMismatch);
        Ok(())
    }

    #[test]
    fn floating_scalars_do_not_widen_integers() -> Result<()> {
        let schema = schema()?;
        let result = validate(&schema, &record(json!({"ratio": 1, "noise_level": 1}))?, &point());
        assert_eq!(
            result.messages(),
            vec!["Field 'ratio' expects double precision, got integer"]
        );
        Ok(())
    }

    #[test]
    fn unknown_fields_are_reported_once_each_without_short_circuit() -> Result<()> {
        let attributes = record(json!({
            "colour": "red",
            "count": "three",
            "shape": 1,
            "label": "ok",
        }))?;

        let result = validate(&schema()?, &attributes, &point());
        let unknown: Vec<_> = result
            .iter()
            .filter(|err| err.kind == ViolationKind::UnknownField)
            .map(|err| err.field.as_deref())
            .collect();
        assert_eq!(unknown, vec![Some("colour"), Some("shape")]);
        assert_eq!(result.len(), 3);
        assert_eq!(
            result.messages(),
            vec![
                "Field 'colour' not defined for layer 12",
                "Field 'count' expects integer, got string",
                "Field 'shape' not defined for layer 12",
            ]
        );
        Ok(())
    }

    #[test]
    fn text_array_allows_nulls_and_reports_bad_index() -> Result<()> {
        let schema = schema()?;

        let ok = validate(&schema, &record(json!({"species": ["a", "b", null]}))?, &point());
        assert!(ok.is_valid());

        let result = validate(&schema, &record(json!({"species": ["a", 3]}))?, &point());
        assert_eq!(result.len(), 1);
        let err = &result.errors()[0];
        assert_eq!(err.kind, ViolationKind::ElementTypeMismatch);
        assert_eq!(err.field.as_deref(), Some("species[1]"));
        assert_eq!(err.message, "Field 'species[1]' expects text, got integer: 3");
        Ok(())
    }

    #[test]
    fn array_field_requires_a_sequence() -> Result<()> {
        let result = validate(&schema()?, &record(json!({"species": "a, b"}))?, &point());
        assert_eq!(result.len(), 1);
        assert_eq!(result.errors()[0].kind, ViolationKind::ArrayExpected);
        assert_eq!(
            result.errors()[0].message,
            "Field 'species' expects array (list), got string"
        );
        Ok(())
    }

    #[test]
    fn integer_array_checks_every_element() -> Result<()> {
        let result = validate(
            &schema()?,
            &record(json!({"readings": [1, 1.5, "x", null, true]}))?,
            &point(),
        );
        let fields: Vec<_> = result.iter().map(|err| err.field.clone()).collect();
        assert_eq!(
            fields,
            vec![
                Some("readings[1]".to_string()),
                Some("readings[2]".to_string()),
                Some("readings[4]".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn unknown_declared_type_is_a_violation() -> Result<()> {
        let result = validate(&schema()?, &record(json!({"blob": "00ff"}))?, &point());
        assert_eq!(result.len(), 1);
        assert_eq!(result.errors()[0].kind, ViolationKind::UnknownFieldType);
        assert_eq!(
            result.errors()[0].message,
            "Unknown DB type 'bytea' for field 'blob'"
        );
        Ok(())
    }

    #[test]
    fn unknown_array_declaration_names_the_array() -> Result<()> {
        let schema = LayerSchema::new(
            2,
            "a",
            "b",
            GeometryKind::Point,
            4326,
            [
                FieldDefinition::new("shapes", "geometry[]"),
                FieldDefinition::new("docs", "_jsonb"),
            ],
        )?;
        let attributes = record(json!({"shapes": [], "docs": []}))?;
        let result = validate(&schema, &attributes, &point());
        assert_eq!(
            result.messages(),
            vec![
                "Unknown array type 'geometry[]' for field 'shapes'",
                "Unknown array type '_jsonb' for field 'docs'",
            ]
        );
        Ok(())
    }

    #[test]
    fn non_finite_numbers_are_rejected() -> Result<()> {
        let mut attributes = AttributeRecord::new();
        attributes.insert("noise_level", f64::NAN);
        attributes.insert("ratio", f64::INFINITY);
        attributes.insert("weights", vec![1.0, f64::NEG_INFINITY]);
        attributes.insert("readings", vec![f64::NAN]);

        let result = validate(&schema()?, &attributes, &point());
        assert_eq!(
            result.messages(),
            vec![
                "Field 'noise_level' expects numeric, got non-finite float",
                "Field 'ratio' expects double precision, got non-finite float",
                "Field 'weights[1]' expects real, got non-finite float: -inf",
                "Field 'readings[0]' expects integer, got non-finite float: NaN",
            ]
        );
        Ok(())
    }

    #[test]
    fn scalar_null_is_a_mismatch() -> Result<()> {
        let mut attributes = AttributeRecord::new();
        attributes.insert("note", Value::Null);
        let result = validate(&schema()?, &attributes, &point());
        assert_eq!(result.messages(), vec!["Field 'note' expects text, got null"]);
        Ok(())
    }

    #[test]
    fn geometry_kind_and_srid_are_checked_alongside_attributes() -> Result<()> {
        let line = Geometry::new(Shape::LineString(vec![
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 1.0),
        ]))
        .with_srid(3857);
        let result = validate(&schema()?, &record(json!({"colour": 1}))?, &line);

        let kinds: Vec<_> = result.iter().map(|err| err.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::UnknownField,
                ViolationKind::GeometryTypeMismatch,
                ViolationKind::SridMismatch,
            ]
        );
        assert_eq!(
            result.messages()[1],
            "Geometry type mismatch: expected 'POINT', got 'LINESTRING'"
        );
        Ok(())
    }

    #[test]
    fn missing_srid_is_not_checked() -> Result<()> {
        let result = validate(&schema()?, &AttributeRecord::new(), &point());
        assert!(result.is_valid());
        Ok(())
    }
}
