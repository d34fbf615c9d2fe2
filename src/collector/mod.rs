//! Per-target collection: the four wal-g probes that run on every tick.

use crate::config::Target;
use crate::metrics::{self, MetricsSink};
use crate::probe::{self, Probe, Status};
use crate::storage::{scan_latest_upload, ObjectLister};

use std::sync::Arc;

/// Runs every probe for one target and publishes the results.
///
/// The four steps are individually fault tolerant: any one failing logs and
/// publishes its own fallback value without suppressing the others. Nothing
/// is returned; the metrics sink is the only output.
pub struct TargetCollector {
    verify_probe: Arc<dyn Probe>,
    show_probe: Arc<dyn Probe>,
    count_probe: Arc<dyn Probe>,
    lister: Arc<dyn ObjectLister>,
    sink: Arc<dyn MetricsSink>,
    bucket: String,
}

impl TargetCollector {
    pub fn new(
        verify_probe: Arc<dyn Probe>,
        show_probe: Arc<dyn Probe>,
        count_probe: Arc<dyn Probe>,
        lister: Arc<dyn ObjectLister>,
        sink: Arc<dyn MetricsSink>,
        bucket: String,
    ) -> Self {
        Self {
            verify_probe,
            show_probe,
            count_probe,
            lister,
            sink,
            bucket,
        }
    }

    /// One tick's worth of collection for `target`.
    pub async fn collect(&self, target: &Target) {
        let status = self.verify_status(target).await;
        self.sink.set(
            metrics::VERIFY_INTEGRITY_STATUS,
            &[&target.name],
            status.as_gauge_value(),
        );

        let status = self.show_status(target).await;
        self.sink.set(
            metrics::SHOW_STATUS,
            &[&target.name],
            status.as_gauge_value(),
        );

        let count = self.backup_count(target).await;
        self.sink.set(metrics::BACKUP_COUNT, &[&target.name], count);

        match scan_latest_upload(self.lister.as_ref(), &self.bucket, &target.prefix).await {
            Ok(Some(timestamp)) => {
                tracing::info!("[{}] Last upload timestamp: {}", target.name, timestamp);
                self.sink.set(
                    metrics::LAST_UPLOAD_TIMESTAMP,
                    &[&target.name, &target.prefix],
                    timestamp as f64,
                );
            }
            // No objects yet; leave the gauge at its previous value rather
            // than reporting the epoch.
            Ok(None) => {
                tracing::info!("[{}] No objects found under {}", target.name, target.prefix);
            }
            Err(e) => {
                tracing::error!("[{}] Error scanning bucket {}: {}", target.name, self.bucket, e);
            }
        }
    }

    async fn verify_status(&self, target: &Target) -> Status {
        let env = self.probe_env(target, true);
        let raw = match self.verify_probe.invoke(&env).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("[{}] Error running wal-verify: {}", target.name, e);
                return Status::Unknown;
            }
        };

        let response = match probe::decode_verify(&raw) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("[{}] Error decoding wal-verify output: {}", target.name, e);
                return Status::Unknown;
            }
        };

        let status = Status::normalize(&response.integrity.status);
        tracing::info!(
            "[{}] wal-verify integrity status: {}",
            target.name,
            response.integrity.status.to_lowercase()
        );
        if status != Status::Healthy {
            for detail in &response.integrity.details {
                if !detail.status.eq_ignore_ascii_case("ok") {
                    tracing::warn!(
                        "[{}] timeline {}: {} ({} segments, {}..{})",
                        target.name,
                        detail.timeline_id,
                        detail.status,
                        detail.segments_count,
                        detail.start_segment,
                        detail.end_segment
                    );
                }
            }
        }
        status
    }

    async fn show_status(&self, target: &Target) -> Status {
        let env = self.probe_env(target, true);
        let raw = match self.show_probe.invoke(&env).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("[{}] Error running wal-show: {}", target.name, e);
                return Status::Unknown;
            }
        };

        match probe::decode_show(&raw) {
            Ok(entries) => match entries.first() {
                Some(entry) => {
                    tracing::info!(
                        "[{}] wal-show status: {}",
                        target.name,
                        entry.status.to_lowercase()
                    );
                    Status::normalize(&entry.status)
                }
                None => {
                    tracing::warn!("[{}] wal-show returned no entries", target.name);
                    Status::Unknown
                }
            },
            Err(e) => {
                tracing::error!("[{}] Error decoding wal-show output: {}", target.name, e);
                Status::Unknown
            }
        }
    }

    /// Backup count, with any failure counted as zero so the metric is still
    /// published every tick.
    async fn backup_count(&self, target: &Target) -> f64 {
        let env = self.probe_env(target, false);
        let result = self.count_probe.invoke(&env).await;
        match result.and_then(|raw| probe::decode_count(&raw)) {
            Ok(count) => {
                tracing::info!("[{}] wal-g backup count: {}", target.name, count);
                count
            }
            Err(e) => {
                tracing::error!("[{}] Error counting backups: {}", target.name, e);
                0.0
            }
        }
    }

    /// Environment overrides for a probe invocation. Host-scoped checks also
    /// get PGHOST; the count probe only needs the storage prefix.
    fn probe_env(&self, target: &Target, host_scoped: bool) -> Vec<(String, String)> {
        let mut env = vec![(
            "WALE_S3_PREFIX".to_string(),
            format!("s3://{}/{}", self.bucket, target.prefix),
        )];
        if host_scoped {
            env.push(("PGHOST".to_string(), target.host.clone()));
        }
        env
    }
}
