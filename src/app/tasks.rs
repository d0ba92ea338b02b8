use crate::adapters::gdal::GdalCli;
use crate::adapters::http::HttpFetcher;
use crate::adapters::storage::{AnyStore, LocalStorage};
use crate::config::toml_config::{ProjectConfig, StorageBackend, StorageConfig};
use crate::core::archive_loader::ArchiveLoaderJob;
use crate::core::boundaries::BoundaryHarvestJob;
use crate::core::clip::ClipJob;
use crate::core::color_ramp::ColorRampJob;
use crate::core::credentials::CheckCredentialsJob;
use crate::core::etl::EtlEngine;
use crate::core::inspect::InspectServiceJob;
use crate::core::regulations::RegulationsJob;
use crate::core::tiles::{MakeTilesJob, SuitabilityTilesJob};
use crate::core::{Job, JobReport};
use crate::utils::error::Result;

/// The runnable tasks, independent of how they were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Clip,
    LoadArchive,
    HarvestBoundaries,
    ColorRamp,
    SuitabilityTiles,
    MakeTiles,
    InspectService,
    ScrapeRegulations,
    CheckCredentials,
}

pub async fn build_store(storage: &StorageConfig, bucket: &str) -> Result<AnyStore> {
    match storage.backend {
        StorageBackend::Local => Ok(AnyStore::Local(LocalStorage::new(&storage.local_root, bucket))),
        #[cfg(feature = "cloud")]
        StorageBackend::S3 => Ok(AnyStore::S3(
            crate::adapters::storage::S3Storage::connect(&storage.region, storage.endpoint.as_deref(), bucket).await,
        )),
        #[cfg(not(feature = "cloud"))]
        StorageBackend::S3 => Err(crate::utils::error::EtlError::ConfigError {
            message: "storage.backend = \"s3\" needs the 'cloud' feature".to_string(),
        }),
    }
}

async fn run_job<J: Job>(job: J, monitor: bool) -> Result<JobReport> {
    EtlEngine::new_with_monitoring(job, monitor).run().await
}

/// Builds the adapters `task` needs from `config` and runs it.
pub async fn run_task(task: Task, config: &ProjectConfig, monitor: bool) -> Result<JobReport> {
    let http = HttpFetcher::new();
    let toolkit = GdalCli::new(config.gdal.clone());

    match task {
        Task::Clip => run_job(ClipJob::new(toolkit, config.clip.settings()), monitor).await,
        Task::LoadArchive => {
            let store = build_store(&config.storage, config.archive_bucket()).await?;
            run_job(ArchiveLoaderJob::new(store, http, config.archive.settings()), monitor).await
        }
        Task::HarvestBoundaries => {
            let store = build_store(&config.storage, &config.storage.bucket).await?;
            run_job(BoundaryHarvestJob::new(store, http, config.boundaries.settings()), monitor).await
        }
        Task::ColorRamp => {
            let store = build_store(&config.storage, &config.storage.bucket).await?;
            run_job(ColorRampJob::new(store, config.color_ramp.settings()), monitor).await
        }
        Task::SuitabilityTiles => {
            let store = build_store(&config.storage, &config.storage.bucket).await?;
            let job = SuitabilityTilesJob::new(store, toolkit, http, config.suitability.settings());
            run_job(job, monitor).await
        }
        Task::MakeTiles => run_job(MakeTilesJob::new(toolkit, config.tiles.settings()), monitor).await,
        Task::InspectService => run_job(InspectServiceJob::new(http, config.inspect.settings()), monitor).await,
        Task::ScrapeRegulations => {
            run_job(RegulationsJob::new(http, config.regulations.settings()), monitor).await
        }
        Task::CheckCredentials => {
            let store = build_store(&config.storage, &config.storage.bucket).await?;
            run_job(CheckCredentialsJob::new(store), monitor).await
        }
    }
}
