use crate::core::{Job, JobReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs a single job with start/finish logging and optional resource
/// sampling around it.
pub struct EtlEngine<J: Job> {
    job: J,
    monitor: SystemMonitor,
}

impl<J: Job> EtlEngine<J> {
    pub fn new(job: J) -> Self {
        Self::new_with_monitoring(job, false)
    }

    pub fn new_with_monitoring(job: J, monitor_enabled: bool) -> Self {
        Self {
            job,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<JobReport> {
        tracing::info!("🚀 Starting {}", self.job.name());
        if self.monitor.is_enabled() {
            self.monitor.log_phase("start");
        }

        let result = self.job.run().await;

        if self.monitor.is_enabled() {
            self.monitor.log_final();
        }
        let mut report = result?;
        report.finish();

        tracing::info!(
            "{} finished: {} processed, {} skipped, {} uploaded{}",
            report.job,
            report.items_processed,
            report.items_skipped,
            report.objects_uploaded,
            report
                .elapsed()
                .map(|d| format!(" in {:.1}s", d.num_milliseconds() as f64 / 1000.0))
                .unwrap_or_default()
        );
        Ok(report)
    }
}
