mod local;
#[cfg(feature = "cloud")]
mod s3;

pub use local::LocalStorage;
#[cfg(feature = "cloud")]
pub use s3::S3Storage;

use crate::domain::ports::ObjectStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Storage backend chosen at run time from configuration.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Local(LocalStorage),
    #[cfg(feature = "cloud")]
    S3(S3Storage),
}

#[async_trait]
impl ObjectStore for AnyStore {
    fn bucket(&self) -> &str {
        match self {
            AnyStore::Local(s) => s.bucket(),
            #[cfg(feature = "cloud")]
            AnyStore::S3(s) => s.bucket(),
        }
    }

    fn uri(&self, key: &str) -> String {
        match self {
            AnyStore::Local(s) => s.uri(key),
            #[cfg(feature = "cloud")]
            AnyStore::S3(s) => s.uri(key),
        }
    }

    async fn upload_file(&self, local: &Path, key: &str) -> Result<()> {
        match self {
            AnyStore::Local(s) => s.upload_file(local, key).await,
            #[cfg(feature = "cloud")]
            AnyStore::S3(s) => s.upload_file(local, key).await,
        }
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        match self {
            AnyStore::Local(s) => s.list_buckets().await,
            #[cfg(feature = "cloud")]
            AnyStore::S3(s) => s.list_buckets().await,
        }
    }
}

pub fn content_type_for(key: &str) -> &'static str {
    let extension = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("geojson") => "application/geo+json",
        Some("json") => "application/json",
        Some("html") => "text/html",
        Some("xml") | Some("kml") => "application/xml",
        _ => "application/octet-stream",
    }
}

/// Joins a bucket prefix and a relative name with exactly one `/` between
/// them. An empty prefix leaves the name unchanged.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Every file below `dir`, sorted.
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Key for `file` under `remote_prefix`, using its path relative to `base`
/// with `/` separators on every platform.
pub fn relative_key(base: &Path, file: &Path, remote_prefix: &str) -> String {
    let relative = file.strip_prefix(base).unwrap_or(file);
    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    join_key(remote_prefix, &name)
}

/// Uploads the tree below `local_dir`, one file at a time. The first failed
/// upload stops the walk; objects already written stay in place.
pub async fn upload_directory<S: ObjectStore + ?Sized>(
    store: &S,
    local_dir: &Path,
    remote_prefix: &str,
) -> Result<usize> {
    let files = collect_files(local_dir)?;
    tracing::info!(
        "Uploading {} files from {} to {}",
        files.len(),
        local_dir.display(),
        store.uri(remote_prefix)
    );

    for (index, file) in files.iter().enumerate() {
        let key = relative_key(local_dir, file, remote_prefix);
        tracing::debug!("[{}/{}] Uploading {} to {}", index + 1, files.len(), file.display(), key);
        store.upload_file(file, &key).await?;
    }

    Ok(files.len())
}
