use crate::error::Result;
use crate::transaction::WfsVersion;
use crate::view_sql::ViewSource;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings for ingestion, read from a TOML file.
///
/// ```toml
/// [wfs]
/// url = "https://maps.example.com/geoserver"
/// version = "1.0.0"
/// username = "admin"
///
/// [registry]
/// path = "/var/lib/registry.sqlite"
///
/// [view]
/// table = "measurements"
/// ```
///
/// Every section and key is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub wfs: WfsConfig,
    pub registry: RegistryConfig,
    pub view: ViewSource,
}

impl IngestConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WfsConfig {
    /// GeoServer base URL; transactions go to `<url>/wfs`.
    pub url: String,
    pub version: WfsVersion,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for WfsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/geoserver".to_string(),
            version: WfsVersion::default(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// SQLite file holding the `datasets`, `layers` and `fields` tables.
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("registry.sqlite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;

    #[test]
    fn empty_document_gives_defaults() -> Result<()> {
        let config = IngestConfig::from_toml_str("")?;
        assert_eq!(config, IngestConfig::default());
        assert_eq!(config.wfs.version, WfsVersion::V1_1_0);
        assert_eq!(config.view.id_column, "measure_id");
        assert_eq!(config.wfs.timeout_secs, 30);
        Ok(())
    }

    #[test]
    fn reads_partial_sections() -> Result<()> {
        let config = IngestConfig::from_toml_str(
            r#"
[wfs]
url = "https://maps.example.com/geoserver"
version = "1.0.0"
username = "admin"

[registry]
path = "/tmp/registry.sqlite"

[view]
table = "observations"
"#,
        )?;

        assert_eq!(config.wfs.url, "https://maps.example.com/geoserver");
        assert_eq!(config.wfs.version, WfsVersion::V1_0_0);
        assert_eq!(config.wfs.username.as_deref(), Some("admin"));
        assert_eq!(config.wfs.password, None);
        assert_eq!(config.registry.path, PathBuf::from("/tmp/registry.sqlite"));
        assert_eq!(config.view.table, "observations");
        assert_eq!(config.view.attributes_column, "attributes");
        Ok(())
    }

    #[test]
    fn unknown_version_is_a_config_error() {
        let err = IngestConfig::from_toml_str("[wfs]\nversion = \"2.0.0\"\n")
            .expect_err("unsupported version");
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = IngestConfig::from_path("/nonexistent/wfst-ingest.toml").expect_err("missing");
        assert!(matches!(err, IngestError::Io(_)));
    }
}
