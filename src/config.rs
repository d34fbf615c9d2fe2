//! Configuration loaded from environment variables, with defaults matching
//! the deployment this exporter was built for.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Startup configuration errors. These are the only fatal errors in the
/// exporter; everything after scheduling starts is contained per tick.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("no targets configured in PGCLUSTERS")]
    NoTargets,
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// One monitored backup domain, with connection parameters derived from its
/// name and the process-wide environment tag. Immutable after startup.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    /// PGHOST value for host-scoped wal-g checks.
    pub host: String,
    /// Key prefix of this target's backups inside the bucket.
    pub prefix: String,
}

impl Target {
    pub fn new(name: &str, env_tag: &str, host_domain: &str) -> Self {
        Self {
            name: name.to_string(),
            host: format!("{}.{}.{}", name, env_tag, host_domain),
            prefix: format!("postgres/walg/{}-{}/", name, env_tag),
        }
    }
}

/// Exporter configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port for the scrape endpoint (default: 9099)
    pub http_port: u16,
    /// Cadence of the per-target collection loops (default: 30m)
    pub poll_interval: Duration,
    pub targets: Vec<Target>,
    pub bucket: String,
    pub region: String,
    pub env_tag: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PGCLUSTERS`: comma-separated target names (required)
    /// - `S3_BUCKET`: bucket holding the backups (required)
    /// - `S3_BUCKET_REGION`: bucket region (default: "us-east-1")
    /// - `ENV`: environment tag folded into hosts and prefixes (default: "dev")
    /// - `PGHOST_DOMAIN`: domain suffix for host-scoped checks (default: "localdomain")
    /// - `WALMON_PORT`: scrape endpoint port (default: 9099)
    /// - `WALMON_INTERVAL`: poll interval, e.g. "30m", "90s", "1h" (default: "30m")
    pub fn load() -> Result<Self, ConfigError> {
        let http_port = parse_port(&env_or_default("WALMON_PORT", "9099"))?;
        let poll_interval = parse_interval(&env_or_default("WALMON_INTERVAL", "30m"))?;

        let bucket = env::var("S3_BUCKET").map_err(|_| ConfigError::Missing("S3_BUCKET"))?;
        let region = env_or_default("S3_BUCKET_REGION", "us-east-1");
        let env_tag = env_or_default("ENV", "dev");
        let host_domain = env_or_default("PGHOST_DOMAIN", "localdomain");

        let clusters = env::var("PGCLUSTERS").map_err(|_| ConfigError::Missing("PGCLUSTERS"))?;
        let targets: Vec<Target> = clusters
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Target::new(name, &env_tag, &host_domain))
            .collect();
        if targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        Ok(Self {
            http_port,
            poll_interval,
            targets,
            bucket,
            region,
            env_tag,
        })
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        name: "WALMON_PORT",
        value: raw.to_string(),
    })
}

/// Parse an interval like "30m", "90s", "1h", or bare seconds.
fn parse_interval(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "WALMON_INTERVAL",
        value: raw.to_string(),
    };

    let trimmed = raw.trim();
    let split_at = trimmed
        .char_indices()
        .rfind(|(_, c)| c.is_ascii_digit())
        .map(|(idx, _)| idx + 1)
        .ok_or_else(invalid)?;
    let (digits, unit) = trimmed.split_at(split_at);

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let seconds = match unit {
        "" | "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        _ => return Err(invalid()),
    };
    if seconds == 0 {
        return Err(invalid());
    }

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_interval("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_interval("45").unwrap(), Duration::from_secs(45));
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("fast").is_err());
        assert!(parse_interval("10d").is_err());
    }

    #[test]
    fn test_target_derivation() {
        let target = Target::new("alpha", "prod", "db.example.org");
        assert_eq!(target.name, "alpha");
        assert_eq!(target.host, "alpha.prod.db.example.org");
        assert_eq!(target.prefix, "postgres/walg/alpha-prod/");
    }
}
