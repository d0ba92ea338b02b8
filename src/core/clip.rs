use crate::core::{Job, JobReport, RasterToolkit};
use crate::domain::raster::ClipOptions;
use crate::utils::error::Result;
use crate::utils::validation::validate_existing_file;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ClipSettings {
    pub input: PathBuf,
    pub cutline: PathBuf,
    pub output: PathBuf,
    pub options: ClipOptions,
}

/// Cuts `input` to the polygon(s) in `cutline`, writing `output`.
pub async fn clip_raster_by_polygon<R: RasterToolkit + ?Sized>(
    toolkit: &R,
    input: &Path,
    cutline: &Path,
    output: &Path,
    options: &ClipOptions,
) -> Result<()> {
    validate_existing_file("clip.input", input)?;
    validate_existing_file("clip.cutline", cutline)?;

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!("Clipping {} with {}...", input.display(), cutline.display());
    toolkit.warp_to_cutline(input, cutline, output, options).await?;
    tracing::info!("Successfully clipped raster saved to {}", output.display());
    Ok(())
}

pub struct ClipJob<R: RasterToolkit> {
    toolkit: R,
    settings: ClipSettings,
}

impl<R: RasterToolkit> ClipJob<R> {
    pub fn new(toolkit: R, settings: ClipSettings) -> Self {
        Self { toolkit, settings }
    }
}

#[async_trait::async_trait]
impl<R: RasterToolkit> Job for ClipJob<R> {
    fn name(&self) -> &'static str {
        "clip"
    }

    async fn run(&self) -> Result<JobReport> {
        let s = &self.settings;
        clip_raster_by_polygon(&self.toolkit, &s.input, &s.cutline, &s.output, &s.options).await?;

        let mut report = JobReport::new(self.name()).with_output(s.output.display().to_string());
        report.items_processed = 1;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::RecordingToolkit;
    use crate::utils::error::EtlError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_clip_creates_output_parent_and_calls_warp() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("rugrLC_2010_v3.0.tif");
        let cutline = dir.path().join("wv_boundary.shp");
        std::fs::write(&input, b"tif").unwrap();
        std::fs::write(&cutline, b"shp").unwrap();
        let output = dir.path().join("scratch/clipped.tif");

        let toolkit = RecordingToolkit::default();
        let job = ClipJob::new(
            toolkit.clone(),
            ClipSettings {
                input: input.clone(),
                cutline: cutline.clone(),
                output: output.clone(),
                options: ClipOptions::default(),
            },
        );

        let report = job.run().await.unwrap();

        assert_eq!(report.items_processed, 1);
        assert!(output.parent().unwrap().is_dir());
        assert!(output.is_file());
        assert_eq!(toolkit.calls(), vec![format!("warp {} -> {}", input.display(), output.display())]);
    }

    #[tokio::test]
    async fn test_clip_rejects_missing_cutline() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.tif");
        std::fs::write(&input, b"tif").unwrap();

        let toolkit = RecordingToolkit::default();
        let result = clip_raster_by_polygon(
            &toolkit,
            &input,
            &dir.path().join("missing.shp"),
            &dir.path().join("out.tif"),
            &ClipOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(EtlError::InvalidConfigValueError { .. })));
        assert!(toolkit.calls().is_empty());
    }
}
