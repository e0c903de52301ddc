use crate::config::WfsConfig;
use crate::error::Result;
use crate::ingest::{Transmission, TransportResponse};
use std::time::Duration;

/// Posts transaction documents to a GeoServer WFS endpoint.
#[derive(Clone, Debug)]
pub struct HttpTransmission {
    client: reqwest::blocking::Client,
    endpoint: String,
    credentials: Option<(String, Option<String>)>,
}

impl HttpTransmission {
    pub fn new(config: &WfsConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/wfs", config.url.trim_end_matches('/')),
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transmission for HttpTransmission {
    fn submit(&self, document: &str) -> Result<TransportResponse> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(document.to_string());
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        tracing::debug!(endpoint = %self.endpoint, status, "transaction response received");

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_under_wfs() -> Result<()> {
        let config = WfsConfig {
            url: "https://maps.example.com/geoserver/".to_string(),
            ..WfsConfig::default()
        };
        let transmission = HttpTransmission::new(&config)?;
        assert_eq!(transmission.endpoint(), "https://maps.example.com/geoserver/wfs");
        Ok(())
    }
}
