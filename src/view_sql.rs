//! SQL projections that unpack the JSON attribute column into typed columns,
//! and the GeoServer feature-type documents that publish them.

use crate::conversions::{
    geometry_kind_to_gml_name, scalar_type_to_sqlite_affinity, scalar_type_to_str,
};
use crate::error::{IngestError, Result};
use crate::transaction::escape_xml;
use crate::types::{FieldDefinition, FieldType, LayerSchema};
use serde::Deserialize;

/// Array values are flattened to one text value joined with this separator.
pub const ARRAY_SEPARATOR: &str = ", ";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SqlDialect {
    /// JSONB operators and `::type` casts, as run by the view consumer.
    #[default]
    Postgres,
    /// JSON1 functions, for executing projections against SQLite.
    Sqlite,
}

/// Table and columns the view selects from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewSource {
    pub table: String,
    pub id_column: String,
    pub geometry_column: String,
    pub timestamp_column: String,
    pub attributes_column: String,
}

impl Default for ViewSource {
    fn default() -> Self {
        Self {
            table: "measurements".to_string(),
            id_column: "measure_id".to_string(),
            geometry_column: "geom".to_string(),
            timestamp_column: "timestamp".to_string(),
            attributes_column: "attributes".to_string(),
        }
    }
}

/// One PostgreSQL projection per field, in the given order.
///
/// ```
/// use wfst_ingest::{FieldDefinition, generate_projection};
///
/// let sql = generate_projection(&[
///     FieldDefinition::new("noise_level", "numeric"),
///     FieldDefinition::new("species", "text[]"),
/// ])?;
/// assert_eq!(sql[0], "(attributes->>'noise_level')::numeric AS noise_level");
/// assert_eq!(
///     sql[1],
///     "array_to_string(ARRAY(SELECT jsonb_array_elements_text(attributes->'species')), ', ') AS species"
/// );
/// # Ok::<(), wfst_ingest::IngestError>(())
/// ```
pub fn generate_projection(fields: &[FieldDefinition]) -> Result<Vec<String>> {
    generate_projection_with(fields, "attributes", SqlDialect::Postgres)
}

/// Like [`generate_projection`], reading from `attributes_column` in `dialect`.
///
/// Fails with [`IngestError::UnsupportedFieldType`] on the first field whose
/// declared type is not recognized. In the SQLite dialect a field name
/// containing `"` is [`IngestError::InvalidName`].
pub fn generate_projection_with(
    fields: &[FieldDefinition],
    attributes_column: &str,
    dialect: SqlDialect,
) -> Result<Vec<String>> {
    let column = quote_identifier(attributes_column);
    fields
        .iter()
        .map(|field| {
            let field_type = field.field_type()?;
            // SQLite JSON paths have no escape for a quote inside a key
            if dialect == SqlDialect::Sqlite && field.name.contains('"') {
                return Err(IngestError::InvalidName(field.name.clone()));
            }
            Ok(projection(&column, field, field_type, dialect))
        })
        .collect()
}

fn projection(
    column: &str,
    field: &FieldDefinition,
    field_type: FieldType,
    dialect: SqlDialect,
) -> String {
    let alias = quote_identifier(&field.name);
    match (dialect, field_type) {
        (SqlDialect::Postgres, FieldType::Scalar(scalar)) => format!(
            "({column}->>{})::{} AS {alias}",
            quote_literal(&field.name),
            scalar_type_to_str(scalar)
        ),
        (SqlDialect::Postgres, FieldType::Array(_)) => format!(
            "array_to_string(ARRAY(SELECT jsonb_array_elements_text({column}->{})), {}) AS {alias}",
            quote_literal(&field.name),
            quote_literal(ARRAY_SEPARATOR)
        ),
        (SqlDialect::Sqlite, FieldType::Scalar(scalar)) => format!(
            "CAST(json_extract({column}, {}) AS {}) AS {alias}",
            quote_literal(&json_path(&field.name)),
            scalar_type_to_sqlite_affinity(scalar)
        ),
        (SqlDialect::Sqlite, FieldType::Array(_)) => format!(
            "(SELECT group_concat(value, {}) FROM json_each({column}, {})) AS {alias}",
            quote_literal(ARRAY_SEPARATOR),
            quote_literal(&json_path(&field.name))
        ),
    }
}

/// Full `SELECT` of the virtual view for one layer.
pub fn build_view_sql(
    layer_id: i64,
    fields: &[FieldDefinition],
    source: &ViewSource,
    dialect: SqlDialect,
) -> Result<String> {
    if fields.is_empty() {
        return Err(IngestError::InvalidRequest(format!(
            "no fields defined for layer {layer_id}"
        )));
    }

    let projections = generate_projection_with(fields, &source.attributes_column, dialect)?;
    let sql = format!(
        "SELECT {} AS id, {}, {}, {} FROM {} WHERE layer_id = {layer_id}",
        quote_identifier(&source.id_column),
        projections.join(", "),
        quote_identifier(&source.geometry_column),
        quote_identifier(&source.timestamp_column),
        quote_identifier(&source.table),
    );
    tracing::debug!(layer_id, %sql, "generated view SQL");
    Ok(sql)
}

/// GeoServer `featureType` document publishing the raw table as the layer.
pub fn master_feature_type_xml(schema: &LayerSchema, source: &ViewSource) -> Result<String> {
    let name = schema.type_name()?;
    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><featureType><name>{}</name><nativeName>{}</nativeName><title>{}</title><srs>EPSG:{}</srs><enabled>true</enabled></featureType>"#,
        escape_xml(&name),
        escape_xml(&source.table),
        escape_xml(&schema.name),
        schema.srid
    ))
}

/// GeoServer `featureType` document for the `<type>_view` layer, backed by a
/// `JDBC_VIRTUAL_TABLE` over [`build_view_sql`].
pub fn virtual_view_feature_type_xml(schema: &LayerSchema, source: &ViewSource) -> Result<String> {
    let view_name = format!("{}_view", schema.type_name()?);
    let sql = build_view_sql(
        schema.layer_id,
        schema.fields(),
        source,
        SqlDialect::Postgres,
    )?;

    Ok(format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<featureType><name>{name}</name><title>{title} (View)</title>",
            "<srs>EPSG:{srid}</srs><enabled>true</enabled>",
            r#"<metadata><entry key="JDBC_VIRTUAL_TABLE"><virtualTable>"#,
            "<name>{name}</name><sql>{sql}</sql>",
            "<geometry><name>{geom}</name><type>{kind}</type><srid>{srid}</srid></geometry>",
            "</virtualTable></entry></metadata></featureType>",
        ),
        name = escape_xml(&view_name),
        title = escape_xml(&schema.name),
        srid = schema.srid,
        sql = escape_xml(&sql),
        geom = escape_xml(&source.geometry_column),
        kind = geometry_kind_to_gml_name(schema.geometry_kind),
    ))
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn quote_identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        format!(r#""{}""#, name.replace('"', r#""""#))
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn json_path(key: &str) -> String {
    format!(r#"$."{key}""#)
}
