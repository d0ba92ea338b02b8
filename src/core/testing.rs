use crate::core::RasterToolkit;
use crate::domain::raster::{ClipOptions, TileOptions, TranslateOptions};
use crate::utils::error::{EtlError, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Fake toolkit that records each call and leaves placeholder outputs on
/// disk, so jobs can be exercised without GDAL installed.
#[derive(Clone, Default)]
pub struct RecordingToolkit {
    calls: Arc<Mutex<Vec<String>>>,
    pub fail_on: Option<&'static str>,
}

impl RecordingToolkit {
    pub fn failing(operation: &'static str) -> Self {
        Self {
            fail_on: Some(operation),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(operation) {
            return Err(EtlError::ToolError {
                tool: operation.to_string(),
                code: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RasterToolkit for RecordingToolkit {
    async fn warp_to_cutline(
        &self,
        input: &Path,
        _cutline: &Path,
        output: &Path,
        _options: &ClipOptions,
    ) -> Result<()> {
        self.record("warp", format!("warp {} -> {}", input.display(), output.display()))?;
        std::fs::write(output, b"clipped")?;
        Ok(())
    }

    async fn translate(&self, input: &Path, output: &Path, options: &TranslateOptions) -> Result<()> {
        self.record(
            "translate",
            format!(
                "translate {} -> {} as {}",
                input.display(),
                output.display(),
                options.format.driver_name()
            ),
        )?;
        std::fs::write(output, b"byte")?;
        Ok(())
    }

    async fn generate_tiles(&self, input: &Path, output_dir: &Path, options: &TileOptions) -> Result<()> {
        self.record(
            "tiles",
            format!("tiles {} -> {} zoom {}", input.display(), output_dir.display(), options.zoom),
        )?;
        let tile_dir = output_dir.join(options.zoom.min.to_string()).join("0");
        std::fs::create_dir_all(&tile_dir)?;
        std::fs::write(tile_dir.join("0.png"), b"png")?;
        Ok(())
    }
}
