use crate::adapters::http::HttpFetcher;
use crate::adapters::storage::join_key;
use crate::core::{Job, JobReport, ObjectStore};
use crate::utils::error::{EtlError, Result};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

#[derive(Debug, Clone)]
pub struct ArchiveLoadSettings {
    pub url: String,
    /// Folder inside the bucket; empty for the bucket root.
    pub prefix: String,
    pub staging_dir: PathBuf,
}

/// Downloads a zip archive and moves its members into object storage one at
/// a time, so the staging disk never holds more than one extracted member.
pub struct ArchiveLoaderJob<S: ObjectStore> {
    store: S,
    http: HttpFetcher,
    settings: ArchiveLoadSettings,
}

impl<S: ObjectStore> ArchiveLoaderJob<S> {
    pub fn new(store: S, http: HttpFetcher, settings: ArchiveLoadSettings) -> Self {
        Self {
            store,
            http,
            settings,
        }
    }
}

/// Writes entry `index` below `staging_dir`. Directory entries yield `None`.
pub fn extract_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    staging_dir: &Path,
) -> Result<Option<(String, PathBuf)>> {
    let mut entry = archive.by_index(index)?;
    if entry.is_dir() {
        return Ok(None);
    }

    let relative = entry.enclosed_name().ok_or_else(|| EtlError::ProcessingError {
        message: format!("Archive entry '{}' escapes the staging directory", entry.name()),
    })?;
    let local = staging_dir.join(relative);
    if let Some(parent) = local.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = std::fs::File::create(&local)?;
    std::io::copy(&mut entry, &mut out)?;
    Ok(Some((entry.name().to_string(), local)))
}

/// Extracts every member of the zip at `zip_path` into `extract_dir`.
pub fn unzip_file(zip_path: &Path, extract_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(extract_dir)?;
    let mut archive = ZipArchive::new(std::fs::File::open(zip_path)?)?;
    archive.extract(extract_dir)?;
    tracing::info!("Files extracted successfully to: {}", extract_dir.display());
    Ok(())
}

#[async_trait::async_trait]
impl<S: ObjectStore> Job for ArchiveLoaderJob<S> {
    fn name(&self) -> &'static str {
        "load-archive"
    }

    async fn run(&self) -> Result<JobReport> {
        let s = &self.settings;
        let mut report = JobReport::new(self.name());

        tracing::info!("Downloading zip file from: {}", s.url);
        let bytes = self.http.get_bytes(&s.url).await.map_err(|e| {
            tracing::error!("Error downloading file: {}", e);
            e
        })?;
        tracing::info!(
            "Download complete. File size: {:.2} MB",
            bytes.len() as f64 / (1024.0 * 1024.0)
        );

        tracing::info!("Extracting files to bucket: {}", self.store.bucket());
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let total = archive.len();
        tracing::info!("Found {} files in the archive", total);

        tokio::fs::create_dir_all(&s.staging_dir).await?;

        for index in 0..total {
            let Some((name, local)) = extract_member(&mut archive, index, &s.staging_dir)? else {
                report.items_skipped += 1;
                continue;
            };
            tracing::info!("Unzipping to {}...", local.display());

            let key = join_key(&s.prefix, &name);
            self.store.upload_file(&local, &key).await?;
            report.objects_uploaded += 1;
            tracing::info!("[{}/{}] Uploaded: {}", report.objects_uploaded, total, key);

            tokio::fs::remove_file(&local).await?;
            tracing::debug!("Deleted {}", local.display());
        }

        report.items_processed = report.objects_uploaded;
        let destination = self.store.uri(&s.prefix);
        tracing::info!(
            "✓ Successfully extracted {} files to {}",
            report.objects_uploaded,
            destination
        );
        Ok(report.with_output(destination))
    }
}
