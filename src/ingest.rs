//! The ingestion pipeline: lookup, validate, encode, build, submit, parse.

use crate::error::{IngestError, Result};
use crate::geometry::{Geometry, encode_gml};
use crate::lookup::SchemaLookup;
use crate::transaction::{InsertOutcome, InsertTransaction, WfsVersion, build_insert, parse_response};
use crate::types::AttributeRecord;
use crate::validate::validate;

/// One record to ingest into a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestRequest {
    pub layer_id: i64,
    pub attributes: AttributeRecord,
    pub geometry: Geometry,
}

impl IngestRequest {
    pub fn new(layer_id: i64, attributes: AttributeRecord, geometry: Geometry) -> Self {
        Self {
            layer_id,
            attributes,
            geometry,
        }
    }

    /// Read a request body of the form `{"data": {...}, "geom": {...}}`.
    pub fn from_json(layer_id: i64, body: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(mut body) = body else {
            return Err(IngestError::InvalidRequest(
                "request body must be a JSON object".to_string(),
            ));
        };

        let data = body
            .remove("data")
            .ok_or_else(|| IngestError::InvalidRequest("missing member 'data'".to_string()))?;
        let geom = body
            .remove("geom")
            .ok_or_else(|| IngestError::InvalidRequest("missing member 'geom'".to_string()))?;

        Ok(Self {
            layer_id,
            attributes: AttributeRecord::from_json(data)?,
            geometry: Geometry::from_json(&geom)?,
        })
    }

    pub fn from_json_str(layer_id: i64, body: &str) -> Result<Self> {
        Self::from_json(layer_id, serde_json::from_str(body)?)
    }
}

/// Status and body returned by the server a transaction was sent to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Delivers a transaction document and returns the raw response.
pub trait Transmission {
    fn submit(&self, document: &str) -> Result<TransportResponse>;
}

impl<F> Transmission for F
where
    F: Fn(&str) -> Result<TransportResponse>,
{
    fn submit(&self, document: &str) -> Result<TransportResponse> {
        self(document)
    }
}

/// Runs requests through schema lookup, validation, GML encoding and
/// transaction building, then hands the document to a [`Transmission`].
#[derive(Debug)]
pub struct Ingestor<L, T> {
    lookup: L,
    transmission: T,
    service_url: String,
    version: WfsVersion,
}

impl<L: SchemaLookup, T: Transmission> Ingestor<L, T> {
    pub fn new(lookup: L, transmission: T, service_url: impl Into<String>) -> Self {
        Self {
            lookup,
            transmission,
            service_url: service_url.into(),
            version: WfsVersion::default(),
        }
    }

    pub fn with_version(mut self, version: WfsVersion) -> Self {
        self.version = version;
        self
    }

    /// Build the transaction document for a request without sending it.
    ///
    /// Validation errors are returned together as [`IngestError::Validation`]
    /// before anything is encoded.
    pub fn prepare(&self, request: &IngestRequest) -> Result<String> {
        let schema = self.lookup.get_layer_schema(request.layer_id)?;

        let result = validate(&schema, &request.attributes, &request.geometry);
        if !result.is_valid() {
            tracing::warn!(
                layer_id = request.layer_id,
                errors = result.len(),
                "record rejected"
            );
            return Err(IngestError::Validation(result));
        }

        let fragment = encode_gml(&request.geometry, schema.srid)?;
        let txn = InsertTransaction::new(&schema, &request.attributes, fragment)?;
        Ok(build_insert(&txn, &self.service_url, self.version))
    }

    /// Prepare, submit and interpret one request.
    pub fn ingest(&self, request: &IngestRequest) -> Result<InsertOutcome> {
        let document = self.prepare(request)?;
        tracing::debug!(layer_id = request.layer_id, %document, "submitting transaction");

        let response = self.transmission.submit(&document)?;
        if !(200..300).contains(&response.status) {
            tracing::warn!(status = response.status, "transaction rejected");
            return Err(IngestError::TransmissionFailure {
                status: Some(response.status),
                reason: "unexpected HTTP status".to_string(),
                body: response.body,
            });
        }

        let outcome = parse_response(response.status, &response.body)?;
        if outcome.success {
            tracing::info!(
                layer_id = request.layer_id,
                feature_id = outcome.feature_id.as_deref().unwrap_or_default(),
                "feature inserted"
            );
        } else {
            tracing::warn!(layer_id = request.layer_id, "insert not confirmed");
        }
        Ok(outcome)
    }
}
