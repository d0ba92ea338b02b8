use crate::adapters::gdal::GdalPrograms;
use crate::core::archive_loader::ArchiveLoadSettings;
use crate::core::boundaries::{default_overrides, BoundaryHarvestSettings, LayerOverride};
use crate::core::clip::ClipSettings;
use crate::core::color_ramp::ColorRampSettings;
use crate::core::inspect::InspectSettings;
use crate::core::regulations::RegulationsSettings;
use crate::core::tiles::{MakeTilesSettings, PipelineStep, SuitabilitySettings, TileMode};
use crate::domain::model::ZoomRange;
use crate::domain::raster::ClipOptions;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "habitat-etl.toml";

pub const DEFAULT_DATASET_URL: &str = "https://www.sciencebase.gov/catalog/file/get/56d07d9de4b015c306ee988c?f=__disk__c0%2Fd8%2F47%2Fc0d8474b60e01f3e81b2e388b320a14a4dd623f9";
pub const DEFAULT_BOUNDARY_SERVER: &str =
    "https://services6.arcgis.com/cGI8zn9Oo7U9dF6z/arcgis/rest/services/WV_Public_Lands_pro/FeatureServer";
pub const DEFAULT_INSPECT_SERVER: &str =
    "https://services6.arcgis.com/cGI8zn9Oo7U9dF6z/arcgis/rest/services/WV_Public_Lands/FeatureServer";
pub const DEFAULT_REGULATIONS_URL: &str = "https://wvdnr.gov/hunting-seasons/";

/// Whole-project configuration. Every section is optional in the file and
/// falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub storage: StorageConfig,
    pub gdal: GdalPrograms,
    pub clip: ClipConfig,
    pub archive: ArchiveConfig,
    pub boundaries: BoundariesConfig,
    pub color_ramp: ColorRampConfig,
    pub suitability: SuitabilityConfig,
    pub tiles: TilesConfig,
    pub inspect: InspectConfig,
    pub regulations: RegulationsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Buckets are subdirectories of `local_root`.
    #[default]
    Local,
    /// S3 API; set `endpoint = "https://storage.googleapis.com"` for GCS.
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub local_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            bucket: "grousemapper".to_string(),
            region: "auto".to_string(),
            endpoint: None,
            local_root: PathBuf::from("buckets"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    pub input: PathBuf,
    pub cutline: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub options: ClipOptions,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("geo/rugr_LC_3/rugrLC_2010_v3.0.tif"),
            cutline: PathBuf::from("geo/wv_boundary.shp"),
            output: PathBuf::from("geo/clipped.tif"),
            options: ClipOptions::default(),
        }
    }
}

impl ClipConfig {
    pub fn settings(&self) -> ClipSettings {
        ClipSettings {
            input: self.input.clone(),
            cutline: self.cutline.clone(),
            output: self.output.clone(),
            options: self.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub url: String,
    pub prefix: String,
    pub staging_dir: PathBuf,
    /// Overrides `storage.bucket` for this task.
    pub bucket: Option<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATASET_URL.to_string(),
            prefix: "suitability_layer/".to_string(),
            staging_dir: PathBuf::from("staging"),
            bucket: Some("grousemapper_raw".to_string()),
        }
    }
}

impl ArchiveConfig {
    pub fn settings(&self) -> ArchiveLoadSettings {
        ArchiveLoadSettings {
            url: self.url.clone(),
            prefix: self.prefix.clone(),
            staging_dir: self.staging_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundariesConfig {
    pub feature_server: String,
    pub schema_path: PathBuf,
    pub local_dir: PathBuf,
    pub bucket_folder: String,
    /// Replaces the built-in table when present.
    pub overrides: Option<Vec<LayerOverride>>,
}

impl Default for BoundariesConfig {
    fn default() -> Self {
        Self {
            feature_server: DEFAULT_BOUNDARY_SERVER.to_string(),
            schema_path: PathBuf::from("boundary_schema_2.csv"),
            local_dir: PathBuf::from("geo/clean_boundaries_2"),
            bucket_folder: "clean_boundaries_2".to_string(),
            overrides: None,
        }
    }
}

impl BoundariesConfig {
    pub fn settings(&self) -> BoundaryHarvestSettings {
        BoundaryHarvestSettings {
            feature_server: self.feature_server.clone(),
            schema_path: self.schema_path.clone(),
            local_dir: self.local_dir.clone(),
            bucket_folder: self.bucket_folder.clone(),
            overrides: self.overrides.clone().unwrap_or_else(default_overrides),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRampConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub remote_dir: String,
}

impl Default for ColorRampConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("geo/suitability_tiles_clip"),
            output_dir: PathBuf::from("geo/suitability_tiles_clip_rgb"),
            remote_dir: "suitability_tiles_clip_rgb".to_string(),
        }
    }
}

impl ColorRampConfig {
    pub fn settings(&self) -> ColorRampSettings {
        ColorRampSettings {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            remote_dir: self.remote_dir.clone(),
        }
    }
}

/// Paths left unset are derived from `data_root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityConfig {
    pub dataset_url: String,
    pub data_root: PathBuf,
    pub raster: Option<PathBuf>,
    pub cutline: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub zoom: ZoomRange,
    pub clip: ClipOptions,
    pub steps: Vec<PipelineStep>,
}

impl Default for SuitabilityConfig {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            data_root: PathBuf::from("geo"),
            raster: None,
            cutline: None,
            output_dir: None,
            scratch_dir: None,
            zoom: ZoomRange { min: 2, max: 7 },
            clip: ClipOptions {
                creation_options: Vec::new(),
                ..ClipOptions::default()
            },
            steps: PipelineStep::ALL.to_vec(),
        }
    }
}

impl SuitabilityConfig {
    pub fn settings(&self) -> SuitabilitySettings {
        let root = &self.data_root;
        let or_root = |path: &Option<PathBuf>, default: &str| path.clone().unwrap_or_else(|| root.join(default));
        SuitabilitySettings {
            dataset_url: self.dataset_url.clone(),
            data_root: root.clone(),
            raster: or_root(&self.raster, "rugr_LC_3/rugrLC_2010_v3.0.tif"),
            cutline: or_root(&self.cutline, "wv_boundary.shp"),
            output_dir: or_root(&self.output_dir, "suitability_tiles_clip"),
            scratch_dir: or_root(&self.scratch_dir, "scratch"),
            zoom: self.zoom,
            clip: self.clip.clone(),
            steps: self.steps.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileModeKind {
    #[default]
    Rescale,
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TilesConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub zoom: ZoomRange,
    pub mode: TileModeKind,
    /// Intermediate 8-bit VRT for `rescale`.
    pub temp_vrt: PathBuf,
    /// Tile edge in pixels for `direct`.
    pub tile_size: u32,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("geo/rugr_LC_3/rugrLC_2010_v3.0.tif"),
            output_dir: PathBuf::from("geo/output_tiles"),
            zoom: ZoomRange { min: 2, max: 10 },
            mode: TileModeKind::Rescale,
            temp_vrt: PathBuf::from("geo/temp.vrt"),
            tile_size: 512,
        }
    }
}

impl TilesConfig {
    pub fn settings(&self) -> MakeTilesSettings {
        let mode = match self.mode {
            TileModeKind::Rescale => TileMode::Rescale {
                temp_vrt: self.temp_vrt.clone(),
            },
            TileModeKind::Direct => TileMode::Direct {
                tile_size: self.tile_size,
            },
        };
        MakeTilesSettings {
            input: self.input.clone(),
            output_dir: self.output_dir.clone(),
            zoom: self.zoom,
            mode,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    pub feature_server: String,
    pub property: String,
    pub value: Value,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            feature_server: DEFAULT_INSPECT_SERVER.to_string(),
            property: "Category".to_string(),
            value: Value::String("Other".to_string()),
        }
    }
}

impl InspectConfig {
    pub fn settings(&self) -> InspectSettings {
        InspectSettings {
            feature_server: self.feature_server.clone(),
            property: self.property.clone(),
            value: self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulationsConfig {
    pub url: String,
    pub output: PathBuf,
    pub species: String,
    pub key_column: String,
}

impl Default for RegulationsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGULATIONS_URL.to_string(),
            output: PathBuf::from("wv_grouse_regs.json"),
            species: "Ruffed Grouse".to_string(),
            key_column: "Species".to_string(),
        }
    }
}

impl RegulationsConfig {
    pub fn settings(&self) -> RegulationsSettings {
        RegulationsSettings {
            url: self.url.clone(),
            output: self.output.clone(),
            species: self.species.clone(),
            key_column: self.key_column.clone(),
        }
    }
}

impl ProjectConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Reads `path`, or returns the defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!("No config file at {}, using built-in defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value. Unset variables are left
    /// as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Bucket for the archive loader: its own override, else the shared one.
    pub fn archive_bucket(&self) -> &str {
        self.archive.bucket.as_deref().unwrap_or(&self.storage.bucket)
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<()> {
        validate_bucket_name("storage.bucket", &self.bucket)?;
        validate_non_empty_string("storage.region", &self.region)?;
        match self.backend {
            StorageBackend::Local => validate_path("storage.local_root", &self.local_root)?,
            // "auto" only resolves against a custom endpoint (GCS, R2, MinIO).
            StorageBackend::S3 if self.region == "auto" => {
                validate_url("storage.endpoint", validate_required_field("storage.endpoint", &self.endpoint)?)?;
            }
            StorageBackend::S3 => {
                if let Some(endpoint) = &self.endpoint {
                    validate_url("storage.endpoint", endpoint)?;
                }
            }
        }
        Ok(())
    }
}

impl Validate for ClipConfig {
    fn validate(&self) -> Result<()> {
        validate_path("clip.input", &self.input)?;
        validate_path("clip.cutline", &self.cutline)?;
        validate_path("clip.output", &self.output)
    }
}

impl Validate for ArchiveConfig {
    fn validate(&self) -> Result<()> {
        validate_url("archive.url", &self.url)?;
        validate_path("archive.staging_dir", &self.staging_dir)?;
        if let Some(bucket) = &self.bucket {
            validate_bucket_name("archive.bucket", bucket)?;
        }
        Ok(())
    }
}

impl Validate for BoundariesConfig {
    fn validate(&self) -> Result<()> {
        validate_url("boundaries.feature_server", &self.feature_server)?;
        validate_path("boundaries.schema_path", &self.schema_path)?;
        validate_path("boundaries.local_dir", &self.local_dir)?;
        for entry in self.overrides.iter().flatten() {
            validate_non_empty_string("boundaries.overrides.layer", &entry.layer)?;
        }
        Ok(())
    }
}

impl Validate for ColorRampConfig {
    fn validate(&self) -> Result<()> {
        validate_path("color_ramp.input_dir", &self.input_dir)?;
        validate_path("color_ramp.output_dir", &self.output_dir)?;
        if self.input_dir == self.output_dir {
            return Err(EtlError::ConfigValidationError {
                field: "color_ramp.output_dir".to_string(),
                message: "Output directory must differ from the input directory".to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for SuitabilityConfig {
    fn validate(&self) -> Result<()> {
        if self.steps.contains(&PipelineStep::Acquire) {
            validate_url("suitability.dataset_url", &self.dataset_url)?;
        }
        validate_path("suitability.data_root", &self.data_root)
    }
}

impl Validate for TilesConfig {
    fn validate(&self) -> Result<()> {
        validate_path("tiles.input", &self.input)?;
        validate_path("tiles.output_dir", &self.output_dir)?;
        validate_range("tiles.tile_size", self.tile_size, 64, 4096)
    }
}

impl Validate for InspectConfig {
    fn validate(&self) -> Result<()> {
        validate_url("inspect.feature_server", &self.feature_server)?;
        validate_non_empty_string("inspect.property", &self.property)
    }
}

impl Validate for RegulationsConfig {
    fn validate(&self) -> Result<()> {
        validate_url("regulations.url", &self.url)?;
        validate_path("regulations.output", &self.output)?;
        validate_non_empty_string("regulations.species", &self.species)?;
        validate_non_empty_string("regulations.key_column", &self.key_column)
    }
}

impl Validate for ProjectConfig {
    fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.clip.validate()?;
        self.archive.validate()?;
        self.boundaries.validate()?;
        self.color_ramp.validate()?;
        self.suitability.validate()?;
        self.tiles.validate()?;
        self.inspect.validate()?;
        self.regulations.validate()
    }
}
