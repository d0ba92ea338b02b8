use crate::utils::error::EtlError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest zoom level accepted by the web tiling tools.
pub const MAX_ZOOM: u8 = 30;

/// Inclusive zoom range written as `"2-7"` or a single level `"5"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Result<Self, EtlError> {
        if min > max || max > MAX_ZOOM {
            return Err(EtlError::InvalidConfigValueError {
                field: "zoom".to_string(),
                value: format!("{}-{}", min, max),
                reason: format!("Zoom range must satisfy min <= max <= {}", MAX_ZOOM),
            });
        }
        Ok(Self { min, max })
    }
}

impl FromStr for ZoomRange {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EtlError::InvalidConfigValueError {
            field: "zoom".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let parse = |part: &str| {
            part.trim()
                .parse::<u8>()
                .map_err(|_| invalid("Expected a zoom level like '7' or a range like '2-7'"))
        };

        match s.split_once('-') {
            Some((min, max)) => Self::new(parse(min)?, parse(max)?),
            None => {
                let level = parse(s)?;
                Self::new(level, level)
            }
        }
    }
}

impl TryFrom<String> for ZoomRange {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ZoomRange> for String {
    fn from(range: ZoomRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

/// One entry of a feature server's `layers` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: i64,
    pub name: String,
}

/// The parts of `GET {FeatureServer}?f=json` this crate reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceMetadata {
    #[serde(default)]
    pub layers: Vec<LayerInfo>,
}

/// Outcome of one job run, logged by the runner and printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job: String,
    pub items_processed: usize,
    pub items_skipped: usize,
    pub objects_uploaded: usize,
    pub outputs: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobReport {
    pub fn new(job: &str) -> Self {
        Self {
            job: job.to_string(),
            items_processed: 0,
            items_skipped: 0,
            objects_uploaded: 0,
            outputs: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.outputs.push(output.into());
        self
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zoom_range() {
        let range: ZoomRange = "2-7".parse().unwrap();
        assert_eq!(range, ZoomRange { min: 2, max: 7 });
        assert_eq!(range.to_string(), "2-7");

        let single: ZoomRange = " 5 ".parse().unwrap();
        assert_eq!(single, ZoomRange { min: 5, max: 5 });
        assert_eq!(single.to_string(), "5");
    }

    #[test]
    fn test_reject_bad_zoom_ranges() {
        assert!("7-2".parse::<ZoomRange>().is_err());
        assert!("0-31".parse::<ZoomRange>().is_err());
        assert!("a-b".parse::<ZoomRange>().is_err());
        assert!("".parse::<ZoomRange>().is_err());
    }

    #[test]
    fn test_zoom_range_serde_as_string() {
        #[derive(Deserialize, Serialize)]
        struct Holder {
            zoom: ZoomRange,
        }
        let holder: Holder = toml::from_str("zoom = \"2-10\"").unwrap();
        assert_eq!(holder.zoom, ZoomRange { min: 2, max: 10 });
        assert_eq!(toml::to_string(&holder).unwrap().trim(), "zoom = \"2-10\"");
    }

    #[test]
    fn test_service_metadata_without_layers() {
        let meta: ServiceMetadata = serde_json::from_str(r#"{"currentVersion": 11.1}"#).unwrap();
        assert!(meta.layers.is_empty());
    }
}
