//! Metrics sink: the collection core publishes gauge updates through this
//! seam instead of touching a process-wide registry.

use prometheus::{GaugeVec, Opts, Registry, TextEncoder};

pub const VERIFY_INTEGRITY_STATUS: &str = "verify_integrity_status";
pub const SHOW_STATUS: &str = "show_status";
pub const BACKUP_COUNT: &str = "backup_count";
pub const LAST_UPLOAD_TIMESTAMP: &str = "last_upload_timestamp";

/// Gauge sink keyed by metric name and label values.
///
/// Implementations must be safe for concurrent `set` calls from multiple
/// target loops; last write wins per label set.
pub trait MetricsSink: Send + Sync {
    fn set(&self, metric: &str, labels: &[&str], value: f64);
}

/// The real sink: a dedicated Prometheus registry holding the four gauges.
pub struct PrometheusSink {
    registry: Registry,
    verify_integrity_status: GaugeVec,
    show_status: GaugeVec,
    backup_count: GaugeVec,
    last_upload_timestamp: GaugeVec,
}

impl PrometheusSink {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let verify_integrity_status = GaugeVec::new(
            Opts::new(
                VERIFY_INTEGRITY_STATUS,
                "wal-g wal-verify integrity status - 0: OK, 1: Error, 2: Unknown",
            ),
            &["target"],
        )?;
        let show_status = GaugeVec::new(
            Opts::new(
                SHOW_STATUS,
                "wal-g wal-show status - 0: OK, 1: Error, 2: Unknown",
            ),
            &["target"],
        )?;
        let backup_count = GaugeVec::new(
            Opts::new(BACKUP_COUNT, "Number of base backups"),
            &["target"],
        )?;
        let last_upload_timestamp = GaugeVec::new(
            Opts::new(
                LAST_UPLOAD_TIMESTAMP,
                "Timestamp of the last wal-g uploaded file in the bucket",
            ),
            &["target", "directory"],
        )?;

        registry.register(Box::new(verify_integrity_status.clone()))?;
        registry.register(Box::new(show_status.clone()))?;
        registry.register(Box::new(backup_count.clone()))?;
        registry.register(Box::new(last_upload_timestamp.clone()))?;

        Ok(Self {
            registry,
            verify_integrity_status,
            show_status,
            backup_count,
            last_upload_timestamp,
        })
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = String::new();
        if let Err(e) = encoder.encode_utf8(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        buffer
    }
}

impl MetricsSink for PrometheusSink {
    fn set(&self, metric: &str, labels: &[&str], value: f64) {
        let gauge = match metric {
            VERIFY_INTEGRITY_STATUS => &self.verify_integrity_status,
            SHOW_STATUS => &self.show_status,
            BACKUP_COUNT => &self.backup_count,
            LAST_UPLOAD_TIMESTAMP => &self.last_upload_timestamp,
            other => {
                tracing::warn!("Ignoring update to unknown metric {}", other);
                return;
            }
        };
        gauge.with_label_values(labels).set(value);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_encode() {
        let sink = PrometheusSink::new().unwrap();
        sink.set(VERIFY_INTEGRITY_STATUS, &["alpha"], 0.0);
        sink.set(BACKUP_COUNT, &["alpha"], 3.0);
        sink.set(LAST_UPLOAD_TIMESTAMP, &["alpha", "postgres/walg/alpha-dev/"], 1700000000.0);

        let text = sink.encode();
        assert!(text.contains("verify_integrity_status{target=\"alpha\"} 0"));
        assert!(text.contains("backup_count{target=\"alpha\"} 3"));
        assert!(text.contains("last_upload_timestamp{"));
    }

    #[test]
    fn test_last_write_wins() {
        let sink = PrometheusSink::new().unwrap();
        sink.set(SHOW_STATUS, &["alpha"], 2.0);
        sink.set(SHOW_STATUS, &["alpha"], 1.0);
        assert!(sink.encode().contains("show_status{target=\"alpha\"} 1"));
    }

    #[test]
    fn test_unknown_metric_is_ignored() {
        let sink = PrometheusSink::new().unwrap();
        sink.set("no_such_metric", &["alpha"], 1.0);
        assert!(!sink.encode().contains("no_such_metric"));
    }
}
