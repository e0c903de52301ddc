use crate::validate::ValidationResult;
use std::error::Error;
use std::fmt;

/// Crate error type for schema lookup, encoding and transaction handling.
#[derive(Debug)]
pub enum IngestError {
    /// Wraps errors returned by `rusqlite` while reading the layer registry.
    Sql(rusqlite::Error),
    /// Wraps errors returned by `serde_json`.
    Json(serde_json::Error),
    /// Wraps I/O errors, e.g. while reading a configuration file.
    Io(std::io::Error),
    /// Wraps errors returned while decoding a TOML configuration.
    Config(toml::de::Error),
    /// Wraps errors returned by the HTTP client.
    #[cfg(feature = "http")]
    Http(reqwest::Error),
    /// The registry has no layer with this identifier.
    LayerNotFound { layer_id: i64 },
    /// Two field definitions of one layer share a name.
    DuplicateField { layer_id: i64, field: String },
    /// The attribute record or geometry does not conform to the layer schema.
    Validation(ValidationResult),
    /// A geometry kind outside Point, LineString, Polygon and their Multi variants.
    UnsupportedGeometryKind(String),
    /// A declared field type that is not in the registry alias table.
    UnsupportedFieldType { field: String, declared_type: String },
    /// Coordinates do not have the arity the geometry kind requires.
    InvalidGeometry(String),
    /// A workspace, feature-type or field name that cannot be written safely.
    InvalidName(String),
    /// The ingestion request is missing a member or has the wrong shape.
    InvalidRequest(String),
    /// The transaction could not be delivered or its response could not be read.
    TransmissionFailure {
        status: Option<u16>,
        reason: String,
        body: String,
    },
    /// A lock guarding a shared connection was poisoned by a panicking thread.
    Poisoned,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            #[cfg(feature = "http")]
            Self::Http(err) => write!(f, "{err}"),
            Self::LayerNotFound { layer_id } => write!(f, "layer {layer_id} not found"),
            Self::DuplicateField { layer_id, field } => {
                write!(f, "field '{field}' is defined more than once for layer {layer_id}")
            }
            Self::Validation(result) => {
                write!(f, "validation failed with {} error(s)", result.len())?;
                for err in result.iter() {
                    write!(f, "\n  {}", err.message)?;
                }
                Ok(())
            }
            Self::UnsupportedGeometryKind(kind) => {
                write!(f, "unsupported geometry type: {kind}")
            }
            Self::UnsupportedFieldType {
                field,
                declared_type,
            } => write!(
                f,
                "unsupported field type for field '{field}': {declared_type}"
            ),
            Self::InvalidGeometry(reason) => write!(f, "invalid geometry: {reason}"),
            Self::InvalidName(name) => write!(f, "invalid name: '{name}'"),
            Self::InvalidRequest(reason) => write!(f, "invalid request: {reason}"),
            Self::TransmissionFailure {
                status,
                reason,
                body,
            } => {
                match status {
                    Some(status) => write!(f, "transmission failed (status {status}): {reason}")?,
                    None => write!(f, "transmission failed: {reason}")?,
                }
                if !body.is_empty() {
                    write!(f, "\n{body}")?;
                }
                Ok(())
            }
            Self::Poisoned => write!(f, "registry connection lock poisoned"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sql(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Config(err) => Some(err),
            #[cfg(feature = "http")]
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for IngestError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sql(err)
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<toml::de::Error> for IngestError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
