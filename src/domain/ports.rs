use crate::domain::model::JobReport;
use crate::domain::raster::{ClipOptions, TileOptions, TranslateOptions};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// A bucket of objects addressed by `/`-separated keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// Display form of a key, e.g. `gs://bucket/key`.
    fn uri(&self, key: &str) -> String;

    async fn upload_file(&self, local: &Path, key: &str) -> Result<()>;

    /// Buckets visible to the current credentials.
    async fn list_buckets(&self) -> Result<Vec<String>>;
}

/// Warp, translate and tile operations delegated to an external raster
/// toolkit. Implementations must leave a complete output at the given path
/// or return an error.
#[async_trait]
pub trait RasterToolkit: Send + Sync {
    async fn warp_to_cutline(
        &self,
        input: &Path,
        cutline: &Path,
        output: &Path,
        options: &ClipOptions,
    ) -> Result<()>;

    async fn translate(&self, input: &Path, output: &Path, options: &TranslateOptions) -> Result<()>;

    async fn generate_tiles(&self, input: &Path, output_dir: &Path, options: &TileOptions) -> Result<()>;
}

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<JobReport>;
}
