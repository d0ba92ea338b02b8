use crate::adapters::http::HttpFetcher;
use crate::adapters::storage::upload_directory;
use crate::core::archive_loader::unzip_file;
use crate::core::clip::clip_raster_by_polygon;
use crate::core::{Job, JobReport, ObjectStore, RasterToolkit};
use crate::domain::model::ZoomRange;
use crate::domain::raster::{ClipOptions, RasterFormat, TileOptions, TranslateOptions};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStep {
    Acquire,
    Clip,
    Tile,
    Upload,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 4] = [
        PipelineStep::Acquire,
        PipelineStep::Clip,
        PipelineStep::Tile,
        PipelineStep::Upload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Acquire => "acquire",
            PipelineStep::Clip => "clip",
            PipelineStep::Tile => "tile",
            PipelineStep::Upload => "upload",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStep {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        PipelineStep::ALL
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EtlError::InvalidConfigValueError {
                field: "step".to_string(),
                value: s.to_string(),
                reason: "Expected one of: acquire, clip, tile, upload".to_string(),
            })
    }
}

/// Streams the dataset zip to `<scratch_dir>/temp.zip`, unpacks it into
/// `root_dir` and removes the zip. A failed download is logged and returned.
pub async fn acquire_dataset(http: &HttpFetcher, url: &str, scratch_dir: &Path, root_dir: &Path) -> Result<()> {
    let local_file = scratch_dir.join("temp.zip");
    http.download_to_file(url, &local_file)
        .await
        .inspect_err(|e| tracing::error!("Download failed: {}", e))?;
    tracing::info!("Downloaded '{}' successfully. Unzipping...", local_file.display());

    unzip_file(&local_file, root_dir)?;
    tokio::fs::remove_file(&local_file).await?;
    tracing::info!(
        "Unzipped to {}, temporary file {} deleted.",
        root_dir.display(),
        local_file.display()
    );
    Ok(())
}

/// 8-bit rescale with nodata 0, then an XYZ pyramid that treats 0 as
/// transparent.
pub async fn create_web_tiles<R: RasterToolkit + ?Sized>(
    toolkit: &R,
    clipped: &Path,
    byte_raster: &Path,
    output_dir: &Path,
    zoom: ZoomRange,
) -> Result<()> {
    toolkit
        .translate(
            clipped,
            byte_raster,
            &TranslateOptions::to_byte(RasterFormat::GTiff).with_nodata(0.0),
        )
        .await?;

    tracing::info!(
        "Starting tile generation for {}. Outputting to {}...",
        clipped.display(),
        output_dir.display()
    );
    let options = TileOptions {
        src_nodata: Some(0.0),
        ..TileOptions::xyz(zoom)
    };
    toolkit.generate_tiles(byte_raster, output_dir, &options).await
}

#[derive(Debug, Clone)]
pub struct SuitabilitySettings {
    pub dataset_url: String,
    /// Where the dataset archive is unpacked.
    pub data_root: PathBuf,
    /// The suitability raster inside the unpacked dataset.
    pub raster: PathBuf,
    pub cutline: PathBuf,
    pub output_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub zoom: ZoomRange,
    pub clip: ClipOptions,
    pub steps: Vec<PipelineStep>,
}

impl SuitabilitySettings {
    pub fn clipped_raster(&self) -> PathBuf {
        self.scratch_dir.join("clipped.tif")
    }

    pub fn byte_raster(&self) -> PathBuf {
        self.scratch_dir.join("clipped_8bit.tif")
    }

    /// Tiles land under the output directory's own name in the bucket.
    pub fn remote_prefix(&self) -> String {
        self.output_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn runs(&self, step: PipelineStep) -> bool {
        self.steps.contains(&step)
    }
}

pub struct SuitabilityTilesJob<S: ObjectStore, R: RasterToolkit> {
    store: S,
    toolkit: R,
    http: HttpFetcher,
    settings: SuitabilitySettings,
}

impl<S: ObjectStore, R: RasterToolkit> SuitabilityTilesJob<S, R> {
    pub fn new(store: S, toolkit: R, http: HttpFetcher, settings: SuitabilitySettings) -> Self {
        Self {
            store,
            toolkit,
            http,
            settings,
        }
    }
}

#[async_trait::async_trait]
impl<S: ObjectStore, R: RasterToolkit> Job for SuitabilityTilesJob<S, R> {
    fn name(&self) -> &'static str {
        "suitability-tiles"
    }

    async fn run(&self) -> Result<JobReport> {
        let s = &self.settings;
        let mut report = JobReport::new(self.name());

        for dir in [&s.scratch_dir, &s.output_dir] {
            tokio::fs::create_dir_all(dir).await?;
        }

        for step in PipelineStep::ALL {
            if !s.runs(step) {
                tracing::info!("Skipping step '{}'", step);
                report.items_skipped += 1;
                continue;
            }

            match step {
                PipelineStep::Acquire => {
                    tracing::info!("Downloading suitability raster...");
                    acquire_dataset(&self.http, &s.dataset_url, &s.scratch_dir, &s.data_root).await?;
                }
                PipelineStep::Clip => {
                    tracing::info!("Clipping raster to state boundary...");
                    clip_raster_by_polygon(&self.toolkit, &s.raster, &s.cutline, &s.clipped_raster(), &s.clip)
                        .await?;
                }
                PipelineStep::Tile => {
                    tracing::info!("Creating web tiles...");
                    create_web_tiles(&self.toolkit, &s.clipped_raster(), &s.byte_raster(), &s.output_dir, s.zoom)
                        .await?;
                    report.outputs.push(s.output_dir.display().to_string());
                }
                PipelineStep::Upload => {
                    tracing::info!("Uploading web tiles to bucket...");
                    let prefix = s.remote_prefix();
                    report.objects_uploaded += upload_directory(&self.store, &s.output_dir, &prefix).await?;
                    report.outputs.push(self.store.uri(&prefix));
                }
            }
            report.items_processed += 1;
        }

        Ok(report)
    }
}

/// The two ways of turning a raster into tiles.
#[derive(Debug, Clone, PartialEq)]
pub enum TileMode {
    /// Rescale `0..1` to 8-bit through a temporary VRT, then tile the VRT.
    Rescale { temp_vrt: PathBuf },
    /// Tile the input as-is in web mercator, keeping existing tiles.
    Direct { tile_size: u32 },
}

#[derive(Debug, Clone)]
pub struct MakeTilesSettings {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub zoom: ZoomRange,
    pub mode: TileMode,
}

pub struct MakeTilesJob<R: RasterToolkit> {
    toolkit: R,
    settings: MakeTilesSettings,
}

impl<R: RasterToolkit> MakeTilesJob<R> {
    pub fn new(toolkit: R, settings: MakeTilesSettings) -> Self {
        Self { toolkit, settings }
    }
}

#[async_trait::async_trait]
impl<R: RasterToolkit> Job for MakeTilesJob<R> {
    fn name(&self) -> &'static str {
        "make-tiles"
    }

    async fn run(&self) -> Result<JobReport> {
        let s = &self.settings;
        if !s.input.is_file() {
            return Err(EtlError::ProcessingError {
                message: format!("Input file not found at {}", s.input.display()),
            });
        }
        tokio::fs::create_dir_all(&s.output_dir).await?;

        match &s.mode {
            TileMode::Rescale { temp_vrt } => {
                tracing::info!("Converting input file to temporary 8-bit layer");
                if let Some(parent) = temp_vrt.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                self.toolkit
                    .translate(&s.input, temp_vrt, &TranslateOptions::to_byte(RasterFormat::Vrt))
                    .await?;

                tracing::info!("Starting tile generation for {}...", s.input.display());
                tracing::info!("Outputting to {} with zoom levels {}", s.output_dir.display(), s.zoom);
                self.toolkit
                    .generate_tiles(temp_vrt, &s.output_dir, &TileOptions::xyz(s.zoom))
                    .await?;
            }
            TileMode::Direct { tile_size } => {
                tracing::info!("Starting tile generation for {}...", s.input.display());
                tracing::info!(
                    "Outputting to {} with tile size {}px and zoom levels {}",
                    s.output_dir.display(),
                    tile_size,
                    s.zoom
                );
                let options = TileOptions {
                    profile: Some("mercator".to_string()),
                    resampling: Some("average".to_string()),
                    tile_size: Some(*tile_size),
                    resume: true,
                    ..TileOptions::xyz(s.zoom)
                };
                self.toolkit.generate_tiles(&s.input, &s.output_dir, &options).await?;
            }
        }

        tracing::info!("Tile generation complete!");
        let mut report = JobReport::new(self.name()).with_output(s.output_dir.display().to_string());
        report.items_processed = 1;
        Ok(report)
    }
}
