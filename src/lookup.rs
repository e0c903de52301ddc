use crate::conversions::geometry_kind_from_str;
use crate::error::{IngestError, Result};
use crate::types::{FieldDefinition, LayerSchema};
use rusqlite::{OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Resolves the schema of a layer from wherever layers are registered.
pub trait SchemaLookup {
    fn get_layer_schema(&self, layer_id: i64) -> Result<LayerSchema>;
}

pub(crate) const SQL_SELECT_LAYER: &str = "
SELECT l.name, l.geom_type, l.srid, d.name
FROM layers l
JOIN datasets d ON d.dataset_id = l.dataset_id
WHERE l.layer_id = ?1
";

pub(crate) const SQL_SELECT_FIELDS: &str = "
SELECT field_name, data_type, unit, description
FROM fields
WHERE layer_id = ?1
ORDER BY rowid
";

/// Layer registry stored in SQLite (`datasets`, `layers` and `fields` tables).
#[derive(Debug)]
pub struct SqliteSchemaLookup {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteSchemaLookup {
    /// Open a registry database in read-only mode.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = rusqlite::Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl SchemaLookup for SqliteSchemaLookup {
    fn get_layer_schema(&self, layer_id: i64) -> Result<LayerSchema> {
        let conn = self.conn.lock().map_err(|_| IngestError::Poisoned)?;

        let (name, geom_type, srid, dataset) = conn
            .query_row(SQL_SELECT_LAYER, [layer_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i32>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .optional()?
            .ok_or(IngestError::LayerNotFound { layer_id })?;
        let geometry_kind = geometry_kind_from_str(&geom_type)?;

        let mut stmt = conn.prepare(SQL_SELECT_FIELDS)?;
        let fields = stmt
            .query_map([layer_id], |row| {
                Ok(FieldDefinition {
                    name: row.get(0)?,
                    declared_type: row.get(1)?,
                    unit: row.get(2)?,
                    description: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(layer_id, fields = fields.len(), "loaded layer schema");
        LayerSchema::new(layer_id, name, dataset, geometry_kind, srid, fields)
    }
}

/// Fixed set of schemas held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemorySchemaLookup {
    schemas: HashMap<i64, LayerSchema>,
}

impl InMemorySchemaLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any previous one with the same layer id.
    pub fn insert(&mut self, schema: LayerSchema) {
        self.schemas.insert(schema.layer_id, schema);
    }
}

impl FromIterator<LayerSchema> for InMemorySchemaLookup {
    fn from_iter<T: IntoIterator<Item = LayerSchema>>(iter: T) -> Self {
        let mut lookup = Self::new();
        for schema in iter {
            lookup.insert(schema);
        }
        lookup
    }
}

impl SchemaLookup for InMemorySchemaLookup {
    fn get_layer_schema(&self, layer_id: i64) -> Result<LayerSchema> {
        self.schemas
            .get(&layer_id)
            .cloned()
            .ok_or(IngestError::LayerNotFound { layer_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeometryKind;

    const REGISTRY_DDL: &str = "
CREATE TABLE datasets (
  dataset_id INTEGER PRIMARY KEY,
  name TEXT NOT NULL
);
CREATE TABLE layers (
  layer_id INTEGER PRIMARY KEY,
  dataset_id INTEGER NOT NULL REFERENCES datasets(dataset_id),
  name TEXT NOT NULL,
  geom_type TEXT NOT NULL,
  srid INTEGER NOT NULL
);
CREATE TABLE fields (
  layer_id INTEGER NOT NULL REFERENCES layers(layer_id),
  field_name TEXT NOT NULL,
  data_type TEXT NOT NULL,
  unit TEXT,
  description TEXT
);
INSERT INTO datasets VALUES (1, 'City Sensors');
INSERT INTO layers VALUES (10, 1, 'Noise Level', 'point', 4326);
INSERT INTO fields VALUES (10, 'noise_level', 'numeric', 'dB', 'A-weighted level');
INSERT INTO fields VALUES (10, 'species', 'text[]', NULL, NULL);
INSERT INTO fields VALUES (10, 'count', 'int4', NULL, NULL);
INSERT INTO layers VALUES (11, 1, 'Broken', 'geometrycollection', 4326);
INSERT INTO layers VALUES (12, 1, 'Twice', 'POLYGON', 3857);
INSERT INTO fields VALUES (12, 'a', 'text', NULL, NULL);
INSERT INTO fields VALUES (12, 'a', 'integer', NULL, NULL);
";

    fn registry() -> Result<SqliteSchemaLookup> {
        let conn = rusqlite::Connection::open_in_memory()?;
        conn.execute_batch(REGISTRY_DDL)?;
        Ok(SqliteSchemaLookup::from_connection(conn))
    }

    #[test]
    fn reads_layer_with_fields_in_registry_order() -> Result<()> {
        let schema = registry()?.get_layer_schema(10)?;

        assert_eq!(schema.layer_id, 10);
        assert_eq!(schema.geometry_kind, GeometryKind::Point);
        assert_eq!(schema.srid, 4326);
        assert_eq!(schema.workspace()?, "city_sensors");
        assert_eq!(schema.type_name()?, "noise_level");

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["noise_level", "species", "count"]);

        let noise = schema.field("noise_level").expect("noise_level field");
        assert_eq!(noise.unit.as_deref(), Some("dB"));
        assert_eq!(noise.description.as_deref(), Some("A-weighted level"));
        Ok(())
    }

    #[test]
    fn missing_layer_is_not_found() -> Result<()> {
        let err = registry()?.get_layer_schema(99).expect_err("missing layer");
        assert!(matches!(err, IngestError::LayerNotFound { layer_id: 99 }));
        Ok(())
    }

    #[test]
    fn registry_errors_surface() -> Result<()> {
        let registry = registry()?;

        let err = registry.get_layer_schema(11).expect_err("unsupported kind");
        assert!(matches!(err, IngestError::UnsupportedGeometryKind(ref kind) if kind == "geometrycollection"));

        let err = registry.get_layer_schema(12).expect_err("duplicate field");
        assert!(matches!(
            err,
            IngestError::DuplicateField { layer_id: 12, ref field } if field == "a"
        ));
        Ok(())
    }

    #[test]
    fn in_memory_lookup_returns_clones() -> Result<()> {
        let lookup: InMemorySchemaLookup = [LayerSchema::new(
            3,
            "a",
            "b",
            GeometryKind::LineString,
            4326,
            [FieldDefinition::new("x", "text")],
        )?]
        .into_iter()
        .collect();

        assert_eq!(lookup.get_layer_schema(3)?.fields().len(), 1);
        assert!(matches!(
            lookup.get_layer_schema(4),
            Err(IngestError::LayerNotFound { layer_id: 4 })
        ));
        Ok(())
    }
}
