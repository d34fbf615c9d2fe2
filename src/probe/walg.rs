//! wal-g command invocations and their JSON response shapes.

use serde::Deserialize;

/// An external command plus its fixed arguments.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl CommandSpec {
    /// `wal-g wal-verify integrity --json`
    pub fn wal_verify() -> Self {
        Self {
            program: "wal-g",
            args: &["wal-verify", "integrity", "--json"],
        }
    }

    /// `wal-g wal-show --detailed-json`
    pub fn wal_show() -> Self {
        Self {
            program: "wal-g",
            args: &["wal-show", "--detailed-json"],
        }
    }

    /// Counts base backups by listing them and skipping the header line.
    pub fn backup_count() -> Self {
        Self {
            program: "sh",
            args: &["-c", "wal-g backup-list | tail -n +2 | wc -l"],
        }
    }

    /// The full command line, for log output.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.to_string()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Top-level shape of `wal-g wal-verify integrity --json` output.
#[derive(Debug, Deserialize)]
pub struct VerifyResponse {
    pub integrity: Integrity,
}

#[derive(Debug, Deserialize)]
pub struct Integrity {
    pub status: String,
    #[serde(default)]
    pub details: Vec<IntegrityDetail>,
}

/// Per-timeline detail of an integrity scan. Not fed into metrics; surfaced
/// in log output when a timeline is unhealthy.
#[derive(Debug, Deserialize)]
pub struct IntegrityDetail {
    pub timeline_id: i64,
    pub start_segment: String,
    pub end_segment: String,
    pub segments_count: i64,
    pub status: String,
}

/// One entry of `wal-g wal-show --detailed-json` output. Only the status of
/// the first entry feeds the metric.
#[derive(Debug, Deserialize)]
pub struct ShowEntry {
    pub status: String,
}
