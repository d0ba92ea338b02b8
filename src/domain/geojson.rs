use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type Properties = Map<String, Value>;

/// A GeoJSON FeatureCollection as returned by a feature server query.
///
/// Only `features` and each feature's `properties` are interpreted; geometry
/// and any other members (`crs`, `bbox`, `exceededTransferLimit`, ...) are
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Properties,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn feature_collection_type() -> String {
    "FeatureCollection".to_string()
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Properties, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Properties>::deserialize(deserializer)?.unwrap_or_default())
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: feature_collection_type(),
            features,
            extra: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Sets `key = value` on every feature, replacing any existing value.
    pub fn set_property_all(&mut self, key: &str, value: &Value) {
        for feature in &mut self.features {
            feature.properties.insert(key.to_string(), value.clone());
        }
    }

    /// Features whose `key` property equals `expected`. Features without the
    /// property never match.
    pub fn matching<'a>(&'a self, key: &'a str, expected: &'a Value) -> impl Iterator<Item = &'a Feature> + 'a {
        self.features
            .iter()
            .filter(move |f| f.properties.get(key) == Some(expected))
    }
}

impl Feature {
    pub fn new(geometry: Value, properties: Properties) -> Self {
        Self {
            kind: feature_type(),
            id: None,
            geometry,
            properties,
            extra: Map::new(),
        }
    }
}
