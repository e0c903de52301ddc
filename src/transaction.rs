//! WFS-T insert documents and the responses they produce.

use crate::error::{IngestError, Result};
use crate::types::{AttributeRecord, LayerSchema};
use serde::Deserialize;

pub const WFS_NS: &str = "http://www.opengis.net/wfs";
pub const GML_NS: &str = "http://www.opengis.net/gml";
pub const OGC_NS: &str = "http://www.opengis.net/ogc";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const GML_SCHEMA: &str = "http://schemas.opengis.net/gml/3.1.1/base/gml.xsd";

/// WFS protocol version written into the transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum WfsVersion {
    #[serde(rename = "1.0.0")]
    V1_0_0,
    #[default]
    #[serde(rename = "1.1.0")]
    V1_1_0,
}

impl WfsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_0_0 => "1.0.0",
            Self::V1_1_0 => "1.1.0",
        }
    }
}

/// Escape the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Everything one insert operation carries, built after validation succeeded.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertTransaction {
    pub layer_id: i64,
    /// Namespace prefix, also used as the namespace URI `http://<workspace>`.
    pub workspace: String,
    pub type_name: String,
    /// Compact JSON of the attribute record, unescaped.
    pub attributes_json: String,
    /// GML geometry element, embedded verbatim.
    pub geometry_fragment: String,
}

impl InsertTransaction {
    pub fn new(
        schema: &LayerSchema,
        attributes: &AttributeRecord,
        geometry_fragment: String,
    ) -> Result<Self> {
        Ok(Self {
            layer_id: schema.layer_id,
            workspace: schema.workspace()?,
            type_name: schema.type_name()?,
            attributes_json: attributes.to_json_string()?,
            geometry_fragment,
        })
    }
}

/// Build the `wfs:Transaction` document holding a single `wfs:Insert`.
///
/// `service_url` is the GeoServer base URL; the feature type's
/// `DescribeFeatureType` endpoint under it goes into `xsi:schemaLocation`.
pub fn build_insert(txn: &InsertTransaction, service_url: &str, version: WfsVersion) -> String {
    let ws = &txn.workspace;
    let feature = format!("{ws}:{}", txn.type_name);
    let schema_location = format!(
        "{WFS_NS} http://schemas.opengis.net/wfs/{v}/wfs.xsd {GML_NS} {GML_SCHEMA} {url}/wfs/DescribeFeatureType?typename={feature}",
        v = version.as_str(),
        url = service_url.trim_end_matches('/'),
    );

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:Transaction service="WFS" version="{version}" xmlns:wfs="{WFS_NS}" xmlns:gml="{GML_NS}" xmlns:{ws}="http://{ws}" xmlns:xsi="{XSI_NS}" xsi:schemaLocation="{schema_location}">
  <wfs:Insert>
    <{feature}>
      <{ws}:layer_id>{layer_id}</{ws}:layer_id>
      <{ws}:attributes>{attributes}</{ws}:attributes>
      <{ws}:geom>{geometry}</{ws}:geom>
    </{feature}>
  </wfs:Insert>
</wfs:Transaction>"#,
        version = version.as_str(),
        schema_location = escape_xml(&schema_location),
        layer_id = txn.layer_id,
        attributes = escape_xml(&txn.attributes_json),
        geometry = txn.geometry_fragment,
    )
}

/// Result of a transaction as reported by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertOutcome {
    pub success: bool,
    pub message: String,
    /// `fid` of the inserted feature, when the response names it.
    pub feature_id: Option<String>,
}

/// Interpret a transaction response.
///
/// Success is either an `ogc:FeatureId` inside `wfs:InsertResult` (1.0.0) or
/// `wfs:InsertResults` (1.1.0), or a `wfs:totalInserted` of exactly one.
/// A non-2xx status is a failure carrying the raw body and is not parsed.
/// A 2xx body that is not XML is a [`IngestError::TransmissionFailure`].
pub fn parse_response(status: u16, body: &str) -> Result<InsertOutcome> {
    if !(200..300).contains(&status) {
        return Ok(InsertOutcome {
            success: false,
            message: body.to_string(),
            feature_id: None,
        });
    }

    let doc = roxmltree::Document::parse(body).map_err(|err| IngestError::TransmissionFailure {
        status: Some(status),
        reason: format!("unparseable response: {err}"),
        body: body.to_string(),
    })?;

    let feature_id = doc
        .descendants()
        .find(|node| is_element(node, OGC_NS, "FeatureId") && under_insert_result(node))
        .map(|node| node.attribute("fid").unwrap_or_default().to_string());

    let total_inserted = doc
        .descendants()
        .find(|node| is_element(node, WFS_NS, "totalInserted"))
        .and_then(|node| node.text())
        .and_then(|text| text.trim().parse::<u64>().ok());

    if feature_id.is_some() || total_inserted == Some(1) {
        Ok(InsertOutcome {
            success: true,
            message: "Feature inserted successfully".to_string(),
            feature_id: feature_id.filter(|fid| !fid.is_empty()),
        })
    } else {
        Ok(InsertOutcome {
            success: false,
            message: body.to_string(),
            feature_id: None,
        })
    }
}

fn is_element(node: &roxmltree::Node<'_, '_>, namespace: &str, name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(namespace)
        && node.tag_name().name() == name
}

fn under_insert_result(node: &roxmltree::Node<'_, '_>) -> bool {
    node.ancestors()
        .skip(1)
        .any(|ancestor| {
            is_element(&ancestor, WFS_NS, "InsertResult")
                || is_element(&ancestor, WFS_NS, "InsertResults")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDefinition, GeometryKind};
    use serde_json::json;

    const GML_POINT: &str = r#"<gml:Point srsName="EPSG:4326"><gml:coordinates>99.45,12.8</gml:coordinates></gml:Point>"#;

    fn transaction() -> Result<InsertTransaction> {
        let schema = LayerSchema::new(
            21,
            "Noise Level",
            "City Sensors",
            GeometryKind::Point,
            4326,
            [FieldDefinition::new("note", "text")],
        )?;
        let attributes = AttributeRecord::from_json(json!({"note": "a < b & \"c\""}))?;
        InsertTransaction::new(&schema, &attributes, GML_POINT.to_string())
    }

    #[test]
    fn escapes_all_special_characters() {
        assert_eq!(
            escape_xml(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&apos;s&lt;/a&gt;"
        );
    }

    #[test]
    fn insert_document_is_namespace_qualified() -> Result<()> {
        let txn = transaction()?;
        assert_eq!(txn.workspace, "city_sensors");
        assert_eq!(txn.type_name, "noise_level");

        let xml = build_insert(&txn, "https://maps.example.com/geoserver/", WfsVersion::V1_1_0);
        let doc = roxmltree::Document::parse(&xml).expect("well-formed document");
        let root = doc.root_element();
        assert!(is_element(&root, WFS_NS, "Transaction"));
        assert_eq!(root.attribute("version"), Some("1.1.0"));
        assert!(
            root.attribute((XSI_NS, "schemaLocation"))
                .unwrap_or_default()
                .ends_with("https://maps.example.com/geoserver/wfs/DescribeFeatureType?typename=city_sensors:noise_level")
        );

        let inserts: Vec<_> = root
            .children()
            .filter(|node| is_element(node, WFS_NS, "Insert"))
            .collect();
        assert_eq!(inserts.len(), 1);

        let feature = inserts[0]
            .children()
            .find(|node| node.is_element())
            .expect("feature element");
        assert!(is_element(&feature, "http://city_sensors", "noise_level"));

        let child_text = |name: &str| {
            feature
                .children()
                .find(|node| is_element(node, "http://city_sensors", name))
                .and_then(|node| node.text())
                .map(str::to_string)
        };
        assert_eq!(child_text("layer_id").as_deref(), Some("21"));
        assert_eq!(
            child_text("attributes").as_deref(),
            Some(r#"{"note":"a < b & \"c\""}"#)
        );

        let point = doc
            .descendants()
            .find(|node| is_element(node, GML_NS, "Point"))
            .expect("geometry element");
        assert_eq!(point.attribute("srsName"), Some("EPSG:4326"));
        Ok(())
    }

    #[test]
    fn attributes_are_escaped_in_the_raw_text() -> Result<()> {
        let xml = build_insert(&transaction()?, "http://localhost:8080/geoserver", WfsVersion::V1_0_0);
        assert!(xml.contains("a &lt; b &amp; \\&quot;c\\&quot;"));
        assert!(xml.contains(r#"version="1.0.0""#));
        assert!(xml.contains("http://schemas.opengis.net/wfs/1.0.0/wfs.xsd"));
        assert!(xml.contains(GML_POINT));
        Ok(())
    }

    #[test]
    fn feature_id_under_insert_result_is_success() -> Result<()> {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:WFS_TransactionResponse version="1.0.0" xmlns:wfs="http://www.opengis.net/wfs" xmlns:ogc="http://www.opengis.net/ogc">
  <wfs:InsertResult><ogc:FeatureId fid="f.1"/></wfs:InsertResult>
  <wfs:TransactionResult><wfs:Status><wfs:SUCCESS/></wfs:Status></wfs:TransactionResult>
</wfs:WFS_TransactionResponse>"#;
        let outcome = parse_response(200, body)?;
        assert!(outcome.success);
        assert_eq!(outcome.feature_id.as_deref(), Some("f.1"));
        Ok(())
    }

    #[test]
    fn feature_id_under_insert_results_is_success() -> Result<()> {
        let body = r#"<wfs:TransactionResponse xmlns:wfs="http://www.opengis.net/wfs" xmlns:ogc="http://www.opengis.net/ogc" version="1.1.0">
  <wfs:TransactionSummary><wfs:totalInserted>1</wfs:totalInserted></wfs:TransactionSummary>
  <wfs:InsertResults><wfs:Feature><ogc:FeatureId fid="noise_level.42"/></wfs:Feature></wfs:InsertResults>
</wfs:TransactionResponse>"#;
        let outcome = parse_response(200, body)?;
        assert!(outcome.success);
        assert_eq!(outcome.feature_id.as_deref(), Some("noise_level.42"));
        Ok(())
    }

    #[test]
    fn insert_results_alone_is_success() -> Result<()> {
        let body = r#"<wfs:TransactionResponse xmlns:wfs="http://www.opengis.net/wfs" xmlns:ogc="http://www.opengis.net/ogc" version="1.1.0">
  <wfs:InsertResults><wfs:Feature><ogc:FeatureId fid="noise_level.7"/></wfs:Feature></wfs:InsertResults>
</wfs:TransactionResponse>"#;
        let outcome = parse_response(200, body)?;
        assert!(outcome.success);
        assert_eq!(outcome.feature_id.as_deref(), Some("noise_level.7"));
        Ok(())
    }

    #[test]
    fn feature_id_outside_insert_results_does_not_count() -> Result<()> {
        let body = r#"<wfs:TransactionResponse xmlns:wfs="http://www.opengis.net/wfs" xmlns:ogc="http://www.opengis.net/ogc" version="1.1.0">
  <wfs:TransactionResults><wfs:Action><ogc:FeatureId fid="x.1"/></wfs:Action></wfs:TransactionResults>
</wfs:TransactionResponse>"#;
        let outcome = parse_response(200, body)?;
        assert!(!outcome.success);
        assert_eq!(outcome.feature_id, None);
        assert_eq!(outcome.message, body);
        Ok(())
    }

    #[test]
    fn total_inserted_counter() -> Result<()> {
        let body = |count: u32| {
            format!(
                r#"<wfs:TransactionResponse xmlns:wfs="http://www.opengis.net/wfs"><wfs:TransactionSummary><wfs:totalInserted>{count}</wfs:totalInserted></wfs:TransactionSummary></wfs:TransactionResponse>"#
            )
        };

        let one = parse_response(200, &body(1))?;
        assert!(one.success);
        assert_eq!(one.feature_id, None);

        let zero = parse_response(200, &body(0))?;
        assert!(!zero.success);
        assert_eq!(zero.message, body(0));
        Ok(())
    }

    #[test]
    fn elements_outside_the_namespaces_do_not_count() -> Result<()> {
        let body = r#"<TransactionResponse><totalInserted>1</totalInserted><InsertResult><FeatureId fid="x"/></InsertResult></TransactionResponse>"#;
        assert!(!parse_response(200, body)?.success);
        Ok(())
    }

    #[test]
    fn non_2xx_status_returns_raw_body_unparsed() -> Result<()> {
        let outcome = parse_response(500, "<html>boom")?;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "<html>boom");
        Ok(())
    }

    #[test]
    fn unparseable_success_body_is_a_transmission_failure() {
        let err = parse_response(200, "<wfs:unterminated").expect_err("malformed");
        match err {
            IngestError::TransmissionFailure { status, body, .. } => {
                assert_eq!(status, Some(200));
                assert_eq!(body, "<wfs:unterminated");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
