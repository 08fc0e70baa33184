//! Error types for the report pipeline

use chrono::Duration;
use thiserror::Error;

/// The requested time range cannot be queried
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("time range of {requested} exceeds the maximum lookback of {max}")]
    TooLarge { requested: HumanDuration, max: HumanDuration },

    #[error("time range of {requested} is shorter than the minimum of {min}")]
    TooSmall { requested: HumanDuration, min: HumanDuration },

    #[error("start time must be before end time")]
    InvalidOrder,

    #[error("could not parse time '{0}'")]
    Unparseable(String),

    #[error("time range '{0}' reaches outside the supported calendar")]
    OutOfBounds(String),
}

/// A single backend query failed
///
/// Never halts a report: the dispatcher records it and treats the slice as empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned an error: {0}")]
    Backend(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Errors that stop a report before any row is produced
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Range(#[from] RangeError),
}

/// Duration wrapper with compact display (`7d`, `1h 30m`, `45s`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl std::fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.0.num_seconds();
        if total <= 0 {
            return write!(f, "0s");
        }

        let units = [("d", 86_400), ("h", 3_600), ("m", 60), ("s", 1)];
        let mut remaining = total;
        let mut parts = Vec::new();
        for (suffix, secs) in units {
            if remaining >= secs {
                parts.push(format!("{}{}", remaining / secs, suffix));
                remaining %= secs;
            }
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration_display() {
        assert_eq!(HumanDuration(Duration::days(7)).to_string(), "7d");
        assert_eq!(HumanDuration(Duration::minutes(90)).to_string(), "1h 30m");
        assert_eq!(HumanDuration(Duration::seconds(45)).to_string(), "45s");
        assert_eq!(HumanDuration(Duration::zero()).to_string(), "0s");
    }

    #[test]
    fn test_range_error_message() {
        let err = RangeError::TooLarge {
            requested: HumanDuration(Duration::days(8)),
            max: HumanDuration(Duration::days(7)),
        };
        assert_eq!(
            err.to_string(),
            "time range of 8d exceeds the maximum lookback of 7d"
        );
    }

    #[test]
    fn test_timeout_message_keeps_subsecond_precision() {
        let err = QueryError::Timeout(std::time::Duration::from_millis(250));
        assert_eq!(err.to_string(), "query timed out after 250ms");
        let err = QueryError::Timeout(std::time::Duration::from_secs(30));
        assert_eq!(err.to_string(), "query timed out after 30s");
    }
}
