use crate::adapters::http::HttpFetcher;
use crate::adapters::storage::join_key;
use crate::core::feature_service::FeatureServiceClient;
use crate::core::{Job, JobReport, ObjectStore};
use crate::domain::geojson::{FeatureCollection, Properties};
use crate::utils::error::Result;
use crate::utils::output::write_json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Property added to every feature that kept at least one field, holding the
/// source layer's name.
pub const DATASET_FIELD: &str = "Dataset";

/// One `Layer,Field,Rename` row of the schema table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaRule {
    #[serde(rename = "Layer")]
    pub layer: String,
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "Rename", default)]
    pub rename: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BoundarySchema {
    rules: Vec<SchemaRule>,
}

impl BoundarySchema {
    pub fn new(rules: Vec<SchemaRule>) -> Self {
        Self { rules }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let rules = csv_reader.deserialize().collect::<std::result::Result<Vec<SchemaRule>, _>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `old field -> new field` for one layer. Rows with an empty rename are
    /// left out, so those fields get dropped. Later rows win.
    pub fn mapping_for(&self, layer_name: &str) -> HashMap<&str, &str> {
        self.rules
            .iter()
            .filter(|r| r.layer == layer_name)
            .filter_map(|r| match r.rename.as_deref() {
                Some(rename) if !rename.is_empty() => Some((r.field.as_str(), rename)),
                _ => None,
            })
            .collect()
    }
}

/// Static properties stamped onto every feature of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerOverride {
    pub layer: String,
    pub properties: Map<String, Value>,
}

impl LayerOverride {
    fn new(layer: &str, properties: &[(&str, &str)]) -> Self {
        Self {
            layer: layer.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        }
    }
}

/// Ownership and access metadata for the West Virginia public-lands layers.
pub fn default_overrides() -> Vec<LayerOverride> {
    vec![
        LayerOverride::new(
            "NPS Lands WV",
            &[
                ("Source", "National Park Service Lands"),
                ("Category", "Fee"),
                ("Manager", "U.S. National Park Service"),
                ("OwnershipType", "Federal"),
                ("Owner", "United States of America"),
                ("Website", "https://nps.gov"),
                ("Access", "Open Access"),
            ],
        ),
        LayerOverride::new(
            "NWR USFS Lands",
            &[
                ("Source", "National Wildlife Refuge"),
                ("OwnershipType", "Federal"),
                ("Owner", "United States of America"),
                ("Website", "https://www.fws.gov/program/national-wildlife-refuge-system"),
            ],
        ),
        LayerOverride::new(
            "WV State Forest Lands",
            &[
                ("Source", "West Virginia State Forest"),
                ("OwnershipType", "State"),
                ("Owner", "State of West Virginia"),
                ("Website", "https://wvforestry.com/west-virginia-state-forests/"),
                ("Access", "Open Access"),
            ],
        ),
        LayerOverride::new(
            "WV State Parks",
            &[
                ("Source", "West Virginia State Park"),
                ("Manager", "WV Division of Natural Resources"),
                ("Access", "Restricted Access"),
            ],
        ),
        LayerOverride::new(
            "WVDNR Managed Lands",
            &[
                ("Source", "West Virginia Wildlife Management Area"),
                ("Website", "https://wvdnr.gov/"),
            ],
        ),
    ]
}

/// Keeps only the layer's mapped fields, under their new names, and tags
/// each feature that kept anything with [`DATASET_FIELD`].
///
/// Not idempotent: a second pass drops every field whose new name is not
/// itself a mapped source name.
pub fn clean_schema(layer_name: &str, data: &mut FeatureCollection, schema: &BoundarySchema) {
    let mapping = schema.mapping_for(layer_name);
    for feature in &mut data.features {
        let original = std::mem::take(&mut feature.properties);
        let mut cleaned = Properties::new();
        for (field, value) in original {
            if let Some(renamed) = mapping.get(field.as_str()) {
                cleaned.insert(DATASET_FIELD.to_string(), Value::String(layer_name.to_string()));
                cleaned.insert((*renamed).to_string(), value);
            }
        }
        feature.properties = cleaned;
    }
}

/// Applies every override entry for `layer_name`. Returns whether any
/// entry matched.
pub fn apply_overrides(layer_name: &str, data: &mut FeatureCollection, overrides: &[LayerOverride]) -> bool {
    let mut matched = false;
    for entry in overrides.iter().filter(|o| o.layer == layer_name) {
        for (key, value) in &entry.properties {
            data.set_property_all(key, value);
        }
        matched = true;
    }
    if !matched {
        tracing::debug!("No metadata overrides for layer '{}'", layer_name);
    }
    matched
}

/// Layer names become file names; path separators would nest them.
pub fn layer_file_name(layer_name: &str) -> String {
    format!("{}.geojson", layer_name.replace(['/', '\\'], "_"))
}

#[derive(Debug, Clone)]
pub struct BoundaryHarvestSettings {
    pub feature_server: String,
    pub schema_path: PathBuf,
    pub local_dir: PathBuf,
    pub bucket_folder: String,
    pub overrides: Vec<LayerOverride>,
}

pub struct BoundaryHarvestJob<S: ObjectStore> {
    store: S,
    client: FeatureServiceClient,
    settings: BoundaryHarvestSettings,
}

impl<S: ObjectStore> BoundaryHarvestJob<S> {
    pub fn new(store: S, http: HttpFetcher, settings: BoundaryHarvestSettings) -> Self {
        let client = FeatureServiceClient::new(http, &settings.feature_server);
        Self {
            store,
            client,
            settings,
        }
    }
}

#[async_trait::async_trait]
impl<S: ObjectStore> Job for BoundaryHarvestJob<S> {
    fn name(&self) -> &'static str {
        "harvest-boundaries"
    }

    async fn run(&self) -> Result<JobReport> {
        let s = &self.settings;
        let mut report = JobReport::new(self.name());

        let schema = BoundarySchema::from_path(&s.schema_path)?;
        if schema.is_empty() {
            tracing::warn!("Schema {} has no rules; every property will be dropped", s.schema_path.display());
        } else {
            tracing::info!("Loaded {} schema rules from {}", schema.len(), s.schema_path.display());
        }

        let layers = self.client.service_layers().await?;
        tracing::info!("Harvesting {} layers from {}", layers.len(), self.client.base_url());

        for layer in layers {
            let Some(mut data) = self.client.query_layer(layer.id).await? else {
                tracing::warn!("Skipping layer {} ({})", layer.id, layer.name);
                report.items_skipped += 1;
                continue;
            };

            clean_schema(&layer.name, &mut data, &schema);
            apply_overrides(&layer.name, &mut data, &s.overrides);

            let file_name = layer_file_name(&layer.name);
            let local = s.local_dir.join(&file_name);
            write_json(&local, &data).await?;
            tracing::info!("Successfully wrote GeoJSON data to {}", local.display());

            let remote = join_key(&s.bucket_folder, &file_name);
            tracing::info!("Uploading {} to {}...", local.display(), remote);
            self.store.upload_file(&local, &remote).await?;

            report.items_processed += 1;
            report.objects_uploaded += 1;
            report.outputs.push(self.store.uri(&remote));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geojson::Feature;
    use serde_json::json;

    const SCHEMA_CSV: &str = "\
Layer,Field,Rename
WV State Parks,PARK_NAME,Name
WV State Parks,ACRES,Acres
WV State Parks,OBJECTID,
NPS Lands WV,UNIT_NAME,Name
";

    fn collection(properties: Value) -> FeatureCollection {
        let props = properties.as_object().cloned().unwrap();
        FeatureCollection::new(vec![Feature::new(Value::Null, props)])
    }

    #[test]
    fn test_mapping_for_layer_skips_blank_renames() {
        let schema = BoundarySchema::from_reader(SCHEMA_CSV.as_bytes()).unwrap();
        assert_eq!(schema.len(), 4);

        let mapping = schema.mapping_for("WV State Parks");
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("PARK_NAME"), Some(&"Name"));
        assert!(!mapping.contains_key("OBJECTID"));
        assert!(schema.mapping_for("Unknown Layer").is_empty());
    }

    #[test]
    fn test_header_only_schema_is_empty_and_drops_everything() {
        let schema = BoundarySchema::from_reader("Layer,Field,Rename\n".as_bytes()).unwrap();
        assert!(schema.is_empty());

        let mut data = collection(json!({"PARK_NAME": "Watoga"}));
        clean_schema("WV State Parks", &mut data, &schema);
        assert!(data.features[0].properties.is_empty());
    }

    #[test]
    fn test_clean_schema_renames_and_drops() {
        let schema = BoundarySchema::from_reader(SCHEMA_CSV.as_bytes()).unwrap();
        let mut data = collection(json!({
            "OBJECTID": 12,
            "PARK_NAME": "Blackwater Falls",
            "ACRES": 2358.5,
            "Shape__Area": 0.001
        }));

        clean_schema("WV State Parks", &mut data, &schema);

        assert_eq!(
            Value::Object(data.features[0].properties.clone()),
            json!({"Dataset": "WV State Parks", "Name": "Blackwater Falls", "Acres": 2358.5})
        );
    }

    #[test]
    fn test_clean_schema_without_mapped_fields_leaves_no_dataset() {
        let schema = BoundarySchema::from_reader(SCHEMA_CSV.as_bytes()).unwrap();
        let mut data = collection(json!({"Shape__Area": 0.5}));

        clean_schema("WV State Parks", &mut data, &schema);

        assert!(data.features[0].properties.is_empty());
    }

    #[test]
    fn test_clean_schema_rename_onto_existing_source_name_keeps_value() {
        let schema = BoundarySchema::new(vec![
            SchemaRule {
                layer: "L".to_string(),
                field: "A".to_string(),
                rename: Some("B".to_string()),
            },
        ]);
        let mut data = collection(json!({"A": 1, "B": 2}));

        clean_schema("L", &mut data, &schema);

        assert_eq!(
            Value::Object(data.features[0].properties.clone()),
            json!({"Dataset": "L", "B": 1})
        );
    }

    #[test]
    fn test_clean_schema_is_not_idempotent() {
        let schema = BoundarySchema::from_reader(SCHEMA_CSV.as_bytes()).unwrap();
        let mut data = collection(json!({"PARK_NAME": "Cacapon", "ACRES": 6000}));

        clean_schema("WV State Parks", &mut data, &schema);
        let once = data.clone();
        clean_schema("WV State Parks", &mut data, &schema);

        assert_ne!(once, data);
        assert!(data.features[0].properties.is_empty());
    }

    #[test]
    fn test_apply_default_overrides() {
        let mut data = collection(json!({"Name": "Cacapon", "Access": "Unknown"}));

        assert!(apply_overrides("WV State Parks", &mut data, &default_overrides()));

        let props = &data.features[0].properties;
        assert_eq!(props["Source"], json!("West Virginia State Park"));
        assert_eq!(props["Manager"], json!("WV Division of Natural Resources"));
        assert_eq!(props["Access"], json!("Restricted Access"));
        assert_eq!(props["Name"], json!("Cacapon"));
    }

    #[test]
    fn test_layers_without_overrides_are_untouched() {
        let mut data = collection(json!({"Name": "Somewhere"}));
        let before = data.clone();

        assert!(!apply_overrides("Private Easements", &mut data, &default_overrides()));
        assert_eq!(before, data);
    }

    #[test]
    fn test_layer_file_name_strips_separators() {
        assert_eq!(layer_file_name("NWR USFS Lands"), "NWR USFS Lands.geojson");
        assert_eq!(layer_file_name("WMA/State Lands"), "WMA_State Lands.geojson");
    }
}
