//! Option sets passed to the raster toolkit. They describe *what* a warp,
//! translate or tiling call should do; `adapters::gdal` turns them into
//! command lines.

use crate::domain::model::ZoomRange;
use serde::{Deserialize, Serialize};

/// Options for cutting a raster to a polygon cutline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipOptions {
    /// Crop the output extent to the cutline's bounding box.
    #[serde(default = "default_true")]
    pub crop_to_cutline: bool,
    /// Value written to pixels outside the cutline.
    #[serde(default)]
    pub dst_nodata: Option<f64>,
    /// GDAL creation options, `KEY=VALUE`.
    #[serde(default = "default_creation_options")]
    pub creation_options: Vec<String>,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            crop_to_cutline: true,
            dst_nodata: None,
            creation_options: default_creation_options(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterFormat {
    GTiff,
    #[serde(rename = "VRT")]
    Vrt,
}

impl RasterFormat {
    pub fn driver_name(&self) -> &'static str {
        match self {
            RasterFormat::GTiff => "GTiff",
            RasterFormat::Vrt => "VRT",
        }
    }
}

/// Linear rescale `[src_min, src_max] -> [dst_min, dst_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub src_min: f64,
    pub src_max: f64,
    pub dst_min: f64,
    pub dst_max: f64,
}

impl Default for ScaleParams {
    // Suitability rasters are probabilities in [0, 1]; tiles want 0..100.
    fn default() -> Self {
        Self {
            src_min: 0.0,
            src_max: 1.0,
            dst_min: 0.0,
            dst_max: 100.0,
        }
    }
}

/// Conversion of a raster to 8-bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateOptions {
    pub format: RasterFormat,
    pub scale: ScaleParams,
    /// Nodata value assigned to every band of the output.
    pub nodata: Option<f64>,
}

impl TranslateOptions {
    pub fn to_byte(format: RasterFormat) -> Self {
        Self {
            format,
            scale: ScaleParams::default(),
            nodata: None,
        }
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

/// Web tile pyramid generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileOptions {
    pub zoom: ZoomRange,
    /// XYZ (top-left origin) naming instead of TMS.
    #[serde(default = "default_true")]
    pub xyz: bool,
    #[serde(default)]
    pub tile_size: Option<u32>,
    /// Source value treated as transparent.
    #[serde(default)]
    pub src_nodata: Option<f64>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub resampling: Option<String>,
    /// Keep tiles that already exist.
    #[serde(default)]
    pub resume: bool,
}

impl TileOptions {
    pub fn xyz(zoom: ZoomRange) -> Self {
        Self {
            zoom,
            xyz: true,
            tile_size: None,
            src_nodata: None,
            profile: None,
            resampling: None,
            resume: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_creation_options() -> Vec<String> {
    vec!["COMPRESS=DEFLATE".to_string()]
}
