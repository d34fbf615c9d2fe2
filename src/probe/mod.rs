//! Probe module: invoking external wal-g checks and decoding their output.
//!
//! Invocation and decoding are separate stages so callers can tell from the
//! error which one failed.

mod status;
mod walg;

pub use status::Status;
pub use walg::{CommandSpec, Integrity, IntegrityDetail, ShowEntry, VerifyResponse};

use thiserror::Error;

/// Probe error types, split by stage.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("command failed: {0}")]
    Invocation(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// A single external status check.
///
/// Narrow by design: the collector only ever hands a probe an environment and
/// gets bytes back, so tests swap in an in-memory fake and never touch wal-g.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    /// Run the check with the given environment overrides on top of the
    /// process environment, returning captured stdout.
    async fn invoke(&self, env: &[(String, String)]) -> Result<Vec<u8>, ProbeError>;
}

/// Runs a [`CommandSpec`] as a subprocess, one fresh process per call.
pub struct CommandProbe {
    spec: CommandSpec,
}

impl CommandProbe {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

#[async_trait::async_trait]
impl Probe for CommandProbe {
    async fn invoke(&self, env: &[(String, String)]) -> Result<Vec<u8>, ProbeError> {
        tracing::debug!("Executing command: {}", self.spec.display());

        let mut cmd = tokio::process::Command::new(self.spec.program);
        cmd.args(self.spec.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null());
        for (key, value) in env {
            cmd.env(key, value);
        }

        let output = cmd.output().await.map_err(|e| {
            ProbeError::Invocation(format!("failed to run {}: {}", self.spec.program, e))
        })?;

        if !output.status.success() {
            return Err(ProbeError::Invocation(format!(
                "{} exited with {}",
                self.spec.program, output.status
            )));
        }

        Ok(output.stdout)
    }
}

/// Decode the `wal-verify integrity --json` payload.
pub fn decode_verify(raw: &[u8]) -> Result<VerifyResponse, ProbeError> {
    serde_json::from_slice(raw).map_err(|e| ProbeError::Decode(e.to_string()))
}

/// Decode the `wal-show --detailed-json` payload.
pub fn decode_show(raw: &[u8]) -> Result<Vec<ShowEntry>, ProbeError> {
    serde_json::from_slice(raw).map_err(|e| ProbeError::Decode(e.to_string()))
}

/// Decode a plain decimal backup count.
pub fn decode_count(raw: &[u8]) -> Result<f64, ProbeError> {
    let text = std::str::from_utf8(raw).map_err(|e| ProbeError::Decode(e.to_string()))?;
    let count: f64 = text
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| ProbeError::Decode(e.to_string()))?;
    if !count.is_finite() || count < 0.0 {
        return Err(ProbeError::Decode(format!("invalid backup count: {}", count)));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_probe_captures_stdout() {
        let probe = CommandProbe::new(CommandSpec {
            program: "sh",
            args: &["-c", "printf '%s' \"$WALMON_TEST_VALUE\""],
        });
        let env = vec![("WALMON_TEST_VALUE".to_string(), "hello".to_string())];
        let output = probe.invoke(&env).await.unwrap();
        assert_eq!(output, b"hello");
    }

    #[tokio::test]
    async fn test_command_probe_nonzero_exit_is_invocation_error() {
        let probe = CommandProbe::new(CommandSpec {
            program: "sh",
            args: &["-c", "exit 3"],
        });
        let err = probe.invoke(&[]).await.unwrap_err();
        assert!(matches!(err, ProbeError::Invocation(_)));
    }

    #[tokio::test]
    async fn test_command_probe_missing_binary_is_invocation_error() {
        let probe = CommandProbe::new(CommandSpec {
            program: "walmon-no-such-binary",
            args: &[],
        });
        let err = probe.invoke(&[]).await.unwrap_err();
        assert!(matches!(err, ProbeError::Invocation(_)));
    }

    #[test]
    fn test_decode_verify() {
        let raw = br#"{"integrity": {"status": "OK", "details": []}}"#;
        let resp = decode_verify(raw).unwrap();
        assert_eq!(resp.integrity.status, "OK");

        let err = decode_verify(b"not json").unwrap_err();
        assert!(matches!(err, ProbeError::Decode(_)));
    }

    #[test]
    fn test_decode_show() {
        let entries = decode_show(br#"[{"status": "error"}, {"status": "ok"}]"#).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, "error");

        // An empty listing decodes fine; the collector decides what it means.
        let entries = decode_show(b"[]").unwrap();
        assert!(entries.is_empty());

        let err = decode_show(br#"{"status": "ok"}"#).unwrap_err();
        assert!(matches!(err, ProbeError::Decode(_)));
    }

    #[test]
    fn test_decode_count() {
        assert_eq!(decode_count(b"3\n").unwrap(), 3.0);
        assert_eq!(decode_count(b"  0 ").unwrap(), 0.0);
        assert!(decode_count(b"three").is_err());
        assert!(decode_count(b"-1").is_err());
        assert!(decode_count(b"").is_err());
    }
}
