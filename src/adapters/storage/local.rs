use crate::domain::ports::ObjectStore;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Buckets as subdirectories of a root directory: object `key` in bucket `b`
/// lives at `<root>/<b>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    bucket: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    pub fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(EtlError::StorageError {
                message: format!("Object key '{}' must be a relative path without '..'", key),
            });
        }
        Ok(self.root.join(&self.bucket).join(relative))
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn uri(&self, key: &str) -> String {
        let base = self.root.join(&self.bucket);
        if key.is_empty() {
            format!("file://{}", base.display())
        } else {
            format!("file://{}/{}", base.display(), key)
        }
    }

    async fn upload_file(&self, local: &Path, key: &str) -> Result<()> {
        let path = self.object_path(key)?;
        Self::ensure_parent(&path).await?;
        tokio::fs::copy(local, path).await?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut buckets = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                buckets.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        buckets.sort();
        Ok(buckets)
    }
}
