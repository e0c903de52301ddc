use crate::conversions::{field_type_from_str, normalize_name};
use crate::error::{IngestError, Result};
use std::collections::HashMap;
use std::fmt;

/// Scalar kinds a field may be declared with in the layer registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Integer,
    BigInt,
    Numeric,
    Real,
    Double,
    Text,
    Varchar,
    Boolean,
    Timestamp,
}

/// A resolved declared type: either a scalar or an array of scalars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Scalar(ScalarType),
    Array(ScalarType),
}

impl FieldType {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// The scalar type of the field itself, or of its elements for arrays.
    pub fn scalar(&self) -> ScalarType {
        match self {
            Self::Scalar(ty) | Self::Array(ty) => *ty,
        }
    }
}

/// A field declared for a layer, as stored in the registry.
///
/// `declared_type` keeps the registry's free-form text; [`FieldDefinition::field_type`]
/// resolves it through the alias table and rejects anything it does not know.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub declared_type: String,
    pub unit: Option<String>,
    pub description: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            unit: None,
            description: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Resolve the declared type string into a [`FieldType`].
    pub fn field_type(&self) -> Result<FieldType> {
        field_type_from_str(&self.declared_type).ok_or_else(|| IngestError::UnsupportedFieldType {
            field: self.name.clone(),
            declared_type: self.declared_type.clone(),
        })
    }
}

/// The six geometry kinds a layer may be declared with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

/// Geometry kind, spatial reference and attribute schema of one layer.
///
/// The schema is immutable once built; field names are unique and case-sensitive.
#[derive(Clone, Debug)]
pub struct LayerSchema {
    pub layer_id: i64,
    /// Display name of the layer; the feature type name is derived from it.
    pub name: String,
    /// Display name of the dataset owning the layer; the workspace is derived from it.
    pub dataset: String,
    pub geometry_kind: GeometryKind,
    pub srid: i32,
    fields: Vec<FieldDefinition>,
    field_index_by_name: HashMap<String, usize>,
}

impl LayerSchema {
    pub fn new<I>(
        layer_id: i64,
        name: impl Into<String>,
        dataset: impl Into<String>,
        geometry_kind: GeometryKind,
        srid: i32,
        fields: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = FieldDefinition>,
    {
        let fields: Vec<FieldDefinition> = fields.into_iter().collect();
        let mut field_index_by_name = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            if field_index_by_name.insert(field.name.clone(), idx).is_some() {
                return Err(IngestError::DuplicateField {
                    layer_id,
                    field: field.name.clone(),
                });
            }
        }

        Ok(Self {
            layer_id,
            name: name.into(),
            dataset: dataset.into(),
            geometry_kind,
            srid,
            fields,
            field_index_by_name,
        })
    }

    /// Look up a field definition by its exact name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field_index_by_name
            .get(name)
            .map(|&idx| &self.fields[idx])
    }

    /// Field definitions in registry order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Workspace (XML namespace prefix) derived from the dataset name.
    pub fn workspace(&self) -> Result<String> {
        normalize_name(&self.dataset)
    }

    /// Feature type name derived from the layer name.
    pub fn type_name(&self) -> Result<String> {
        normalize_name(&self.name)
    }
}

/// Owned dynamic value of an attribute.
///
/// Mirrors JSON: null, boolean, number (split into integer and real), string,
/// array and object. Objects keep their member order.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Short name of the runtime kind, used in validation messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "float",
            Self::Text(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value, or any value nested in it, is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        match self {
            Self::Real(value) => !value.is_finite(),
            Self::Array(values) => values.iter().any(Value::has_non_finite),
            Self::Object(members) => members.iter().any(|(_, value)| value.has_non_finite()),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{value}"),
            Self::Real(value) if !value.is_finite() => write!(f, "{value}"),
            other => write!(f, "{}", serde_json::Value::from(other)),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Boolean(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Self::Integer(value),
                // u64 beyond i64::MAX and every float end up here
                None => Self::Real(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(value) => Self::Text(value),
            serde_json::Value::Array(values) => {
                Self::Array(values.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(value) => serde_json::Value::Bool(*value),
            Value::Integer(value) => serde_json::Value::from(*value),
            // Non-finite reals have no JSON form.
            Value::Real(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(value) => serde_json::Value::String(value.clone()),
            Value::Array(values) => {
                serde_json::Value::Array(values.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(members) => serde_json::Value::Object(
                members
                    .iter()
                    .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Attribute values of one ingestion request, keyed by field name.
///
/// Keys keep their insertion order so the serialized JSON matches the request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeRecord {
    entries: Vec<(String, Value)>,
}

impl AttributeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the same key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a record from a JSON object; anything else is rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(IngestError::InvalidRequest(format!(
                "attributes must be a JSON object, got {}",
                Value::from(other).kind_name()
            ))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
                .collect(),
        )
    }

    /// Compact JSON text of the record, in insertion order.
    ///
    /// Fails with [`IngestError::InvalidRequest`] when a value is NaN or
    /// infinite, since JSON has no representation for it.
    pub fn to_json_string(&self) -> Result<String> {
        if let Some((key, _)) = self.entries.iter().find(|(_, value)| value.has_non_finite()) {
            return Err(IngestError::InvalidRequest(format!(
                "attribute '{key}' holds a non-finite number"
            )));
        }
        Ok(serde_json::to_string(&self.to_json())?)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AttributeRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = AttributeRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}
