use crate::adapters::http::HttpFetcher;
use crate::core::feature_service::FeatureServiceClient;
use crate::core::{Job, JobReport};
use crate::domain::geojson::{FeatureCollection, Properties};
use crate::utils::error::Result;
use serde_json::Value;
use std::io::Write;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct InspectSettings {
    pub feature_server: String,
    pub property: String,
    pub value: Value,
}

/// Property maps of the features whose `property` equals `value`. Features
/// without the property are passed over.
pub fn matching_properties<'a>(data: &'a FeatureCollection, property: &'a str, value: &'a Value) -> Vec<&'a Properties> {
    data.matching(property, value).map(|f| &f.properties).collect()
}

/// Prints every matching feature's properties as one JSON line to `out`.
pub struct InspectServiceJob<W: Write + Send> {
    client: FeatureServiceClient,
    settings: InspectSettings,
    out: Mutex<W>,
}

impl InspectServiceJob<std::io::Stdout> {
    pub fn new(http: HttpFetcher, settings: InspectSettings) -> Self {
        Self::with_writer(http, settings, std::io::stdout())
    }
}

impl<W: Write + Send> InspectServiceJob<W> {
    pub fn with_writer(http: HttpFetcher, settings: InspectSettings, out: W) -> Self {
        Self {
            client: FeatureServiceClient::new(http, &settings.feature_server),
            settings,
            out: Mutex::new(out),
        }
    }

    pub fn into_writer(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn print(&self, properties: &Properties) -> Result<()> {
        let line = serde_json::to_string(properties)?;
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{}", line)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<W: Write + Send> Job for InspectServiceJob<W> {
    fn name(&self) -> &'static str {
        "inspect-service"
    }

    async fn run(&self) -> Result<JobReport> {
        let s = &self.settings;
        let mut report = JobReport::new(self.name());

        for layer in self.client.service_layers().await? {
            let Some(data) = self.client.query_layer(layer.id).await? else {
                report.items_skipped += 1;
                continue;
            };
            tracing::info!("{}, {}", layer.id, layer.name);

            let matches = matching_properties(&data, &s.property, &s.value);
            tracing::debug!("{} features where {} == {}", matches.len(), s.property, s.value);
            for properties in matches {
                self.print(properties)?;
                report.items_processed += 1;
            }
        }

        Ok(report)
    }
}
