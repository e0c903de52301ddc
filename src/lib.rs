//! Schema-validated feature ingestion for GeoServer WFS-T.
//!
//! ## Overview
//!
//! - `LayerSchema` describes one layer: geometry kind, SRID and declared fields.
//! - `AttributeRecord` holds the attributes of one incoming record as `Value`s.
//! - `Geometry` is one of Point, LineString, Polygon and their Multi variants.
//! - `validate` checks a record and its geometry against a schema and reports
//!   every problem at once.
//! - `encode_gml` and `encode_wkt` serialize a geometry.
//! - `build_insert` and `parse_response` produce and read WFS-T transactions.
//! - `generate_projection` and `build_view_sql` produce the SQL that exposes the
//!   JSON attribute column as typed columns of a virtual view.
//!
//! `Ingestor` ties the pieces together: it looks a layer up through a
//! `SchemaLookup` (for example `SqliteSchemaLookup`), validates, encodes, builds
//! the transaction and hands it to a `Transmission`. With the `http` feature,
//! `HttpTransmission` posts it to GeoServer.
//!
//! ## Short usage
//!
//! ```
//! use wfst_ingest::{
//!     FieldDefinition, GeometryKind, IngestRequest, Ingestor, InMemorySchemaLookup,
//!     LayerSchema, TransportResponse,
//! };
//!
//! let lookup: InMemorySchemaLookup = [LayerSchema::new(
//!     1,
//!     "Noise Level",
//!     "City Sensors",
//!     GeometryKind::Point,
//!     4326,
//!     [FieldDefinition::new("level", "numeric").with_unit("dB")],
//! )?]
//! .into_iter()
//! .collect();
//!
//! // Any `Fn(&str) -> Result<TransportResponse>` can stand in for the server.
//! let server = |_document: &str| -> wfst_ingest::Result<TransportResponse> {
//!     Ok(TransportResponse {
//!         status: 200,
//!         body: r#"<wfs:TransactionResponse xmlns:wfs="http://www.opengis.net/wfs">
//!             <wfs:TransactionSummary><wfs:totalInserted>1</wfs:totalInserted></wfs:TransactionSummary>
//!         </wfs:TransactionResponse>"#
//!             .to_string(),
//!     })
//! };
//!
//! let ingestor = Ingestor::new(lookup, server, "http://localhost:8080/geoserver");
//! let request = IngestRequest::from_json_str(
//!     1,
//!     r#"{"data": {"level": 42.5}, "geom": {"type": "Point", "coordinates": [99.45, 12.8]}}"#,
//! )?;
//! let outcome = ingestor.ingest(&request)?;
//! assert!(outcome.success);
//! # Ok::<(), wfst_ingest::IngestError>(())
//! ```
//!
//! ## View provisioning
//!
//! ```
//! use wfst_ingest::{FieldDefinition, SqlDialect, ViewSource, build_view_sql};
//!
//! let sql = build_view_sql(
//!     3,
//!     &[FieldDefinition::new("species", "text[]")],
//!     &ViewSource::default(),
//!     SqlDialect::Postgres,
//! )?;
//! assert!(sql.starts_with("SELECT measure_id AS id, array_to_string("));
//! assert!(sql.ends_with("FROM measurements WHERE layer_id = 3"));
//! # Ok::<(), wfst_ingest::IngestError>(())
//! ```
mod config;
mod conversions;
mod error;
mod geometry;
mod ingest;
mod lookup;
mod transaction;
mod types;
mod validate;
mod view_sql;

#[cfg(feature = "http")]
mod http;

pub use config::{IngestConfig, RegistryConfig, WfsConfig};
pub use error::{IngestError, Result};
pub use geometry::{Coord, Geometry, Shape, encode_gml, encode_wkt};
pub use ingest::{IngestRequest, Ingestor, Transmission, TransportResponse};
pub use lookup::{InMemorySchemaLookup, SchemaLookup, SqliteSchemaLookup};
pub use transaction::{
    InsertOutcome, InsertTransaction, WfsVersion, build_insert, escape_xml, parse_response,
};
pub use types::{
    AttributeRecord, FieldDefinition, FieldType, GeometryKind, LayerSchema, ScalarType, Value,
};
pub use validate::{ValidationError, ValidationResult, ViolationKind, validate};
pub use view_sql::{
    SqlDialect, ViewSource, build_view_sql, generate_projection, generate_projection_with,
    master_feature_type_xml, virtual_view_feature_type_xml,
};

#[cfg(feature = "http")]
pub use http::HttpTransmission;
