use crate::adapters::http::HttpFetcher;
use crate::domain::geojson::FeatureCollection;
use crate::domain::model::{LayerInfo, ServiceMetadata};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

/// Read-only client for an ArcGIS-style `FeatureServer` endpoint.
#[derive(Debug, Clone)]
pub struct FeatureServiceClient {
    http: HttpFetcher,
    base_url: String,
}

impl FeatureServiceClient {
    pub fn new(http: HttpFetcher, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn layer_url(&self, layer_id: i64) -> String {
        format!("{}/{}", self.base_url, layer_id)
    }

    pub async fn service_layers(&self) -> Result<Vec<LayerInfo>> {
        let response = self.http.get(&self.base_url, &[("f", "json")]).await?;
        if !response.status().is_success() {
            return Err(EtlError::ServiceResponseError {
                url: self.base_url.clone(),
                status: response.status().as_u16(),
            });
        }
        let metadata: ServiceMetadata = response.json().await?;
        tracing::debug!("{} exposes {} layers", self.base_url, metadata.layers.len());
        Ok(metadata.layers)
    }

    /// Every feature of a layer as GeoJSON. A non-200 answer is logged and
    /// reported as `None` so callers can move on to the next layer. A 200
    /// carrying an `error` object, or no `features`, is an error.
    pub async fn query_layer(&self, layer_id: i64) -> Result<Option<FeatureCollection>> {
        let url = self.layer_url(layer_id);
        let response = self
            .http
            .get(
                &format!("{}/query", url),
                &[
                    ("where", "1=1"),
                    ("outFields", "*"),
                    ("f", "geojson"),
                    ("returnGeometry", "true"),
                ],
            )
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::warn!("Failed to query layer {}: {}", url, response.status().as_u16());
            return Ok(None);
        }

        let body: Value = response.json().await?;
        if let Some(fault) = body.get("error") {
            return Err(EtlError::ServiceFaultError {
                url,
                code: fault.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: fault
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no message")
                    .to_string(),
            });
        }
        Ok(Some(serde_json::from_value(body)?))
    }
}
