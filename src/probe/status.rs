//! Normalized status domain for wal-g check results.

/// Health status of one wal-g check, reduced to a fixed three-value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Healthy,
    Unhealthy,
    Unknown,
}

impl Status {
    /// Map a raw status label from wal-g output into the fixed domain.
    ///
    /// Case-insensitive: "ok" is healthy, "error" is unhealthy, and anything
    /// else (including an empty string or garbage from a broken invocation)
    /// is unknown. Total by construction, so a malformed tool response can
    /// never take down a collection loop.
    pub fn normalize(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "ok" => Status::Healthy,
            "error" => Status::Unhealthy,
            _ => Status::Unknown,
        }
    }

    /// Gauge encoding: 0 = healthy, 1 = unhealthy, 2 = unknown.
    pub fn as_gauge_value(self) -> f64 {
        match self {
            Status::Healthy => 0.0,
            Status::Unhealthy => 1.0,
            Status::Unknown => 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_is_case_insensitive() {
        assert_eq!(Status::normalize("ok"), Status::Healthy);
        assert_eq!(Status::normalize("OK"), Status::Healthy);
        assert_eq!(Status::normalize("Ok"), Status::Healthy);
        assert_eq!(Status::normalize("error"), Status::Unhealthy);
        assert_eq!(Status::normalize("ERROR"), Status::Unhealthy);
    }

    #[test]
    fn test_normalize_maps_everything_else_to_unknown() {
        assert_eq!(Status::normalize(""), Status::Unknown);
        assert_eq!(Status::normalize("warning"), Status::Unknown);
        assert_eq!(Status::normalize("ok "), Status::Unknown);
        assert_eq!(Status::normalize("failure"), Status::Unknown);
    }

    #[test]
    fn test_gauge_encoding() {
        assert_eq!(Status::Healthy.as_gauge_value(), 0.0);
        assert_eq!(Status::Unhealthy.as_gauge_value(), 1.0);
        assert_eq!(Status::Unknown.as_gauge_value(), 2.0);
    }
}
