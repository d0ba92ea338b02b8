use crate::core::{Job, JobReport, ObjectStore};
use crate::utils::error::Result;
use std::io::Write;
use std::sync::Mutex;

/// Lists the buckets the configured credentials can see.
pub struct CheckCredentialsJob<S: ObjectStore, W: Write + Send = std::io::Stdout> {
    store: S,
    out: Mutex<W>,
}

impl<S: ObjectStore> CheckCredentialsJob<S> {
    pub fn new(store: S) -> Self {
        Self::with_writer(store, std::io::stdout())
    }
}

impl<S: ObjectStore, W: Write + Send> CheckCredentialsJob<S, W> {
    pub fn with_writer(store: S, out: W) -> Self {
        Self {
            store,
            out: Mutex::new(out),
        }
    }

    pub fn into_writer(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn print_buckets(&self, buckets: &[String]) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "Buckets:")?;
        for bucket in buckets {
            writeln!(out, "* {}", bucket)?;
        }
        writeln!(out, "Listed all storage buckets.")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: ObjectStore, W: Write + Send> Job for CheckCredentialsJob<S, W> {
    fn name(&self) -> &'static str {
        "check-credentials"
    }

    async fn run(&self) -> Result<JobReport> {
        let buckets = self.store.list_buckets().await?;
        tracing::debug!("Credentials accepted, {} buckets visible", buckets.len());
        self.print_buckets(&buckets)?;

        let mut report = JobReport::new(self.name());
        report.items_processed = buckets.len();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_buckets() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("grousemapper")).unwrap();
        std::fs::create_dir(root.path().join("archive")).unwrap();

        let job = CheckCredentialsJob::with_writer(LocalStorage::new(root.path(), "grousemapper"), Vec::new());
        let report = job.run().await.unwrap();

        assert_eq!(report.items_processed, 2);
        let printed = String::from_utf8(job.into_writer()).unwrap();
        assert_eq!(printed, "Buckets:\n* archive\n* grousemapper\nListed all storage buckets.\n");
    }
}
