//! Status values and the classification table used for aggregation and readiness.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a work unit, or the composite status of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Nothing to aggregate (a pool without units).
    Empty,
    /// Waiting to be admitted.
    Pending,
    /// Admitted and executing.
    Running,
    /// Finished without error.
    Success,
    /// Finished with an error after exhausting retries.
    Failed,
    /// Never ran because a dependency failed.
    PrecedenceFailed,
}

impl Status {
    /// Severity used when aggregating. Lower wins.
    ///
    /// `Empty` sorts after every real status so it only survives an
    /// aggregation that saw no units at all.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Failed => 0,
            Self::PrecedenceFailed => 1,
            Self::Pending => 2,
            Self::Running => 4,
            Self::Success => 5,
            Self::Empty => u8::MAX,
        }
    }

    /// Whether the status may still change.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Whether the status is a terminal failure.
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed | Self::PrecedenceFailed)
    }

    /// Reduce statuses to the one with the lowest severity.
    ///
    /// Ties keep the first status seen. An empty input yields [`Status::Empty`].
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        statuses.into_iter().fold(Self::Empty, |worst, status| {
            if status.severity() < worst.severity() {
                status
            } else {
                worst
            }
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Empty => "EMPTY",
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::PrecedenceFailed => "PRECEDENCE_FAILED",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Status::Failed.severity() < Status::PrecedenceFailed.severity());
        assert!(Status::PrecedenceFailed.severity() < Status::Pending.severity());
        assert!(Status::Pending.severity() < Status::Running.severity());
        assert!(Status::Running.severity() < Status::Success.severity());
        assert!(Status::Success.severity() < Status::Empty.severity());
    }

    #[test]
    fn test_open_and_failed_table() {
        assert!(Status::Pending.is_open());
        assert!(Status::Running.is_open());
        assert!(!Status::Success.is_open());
        assert!(!Status::Failed.is_open());
        assert!(!Status::PrecedenceFailed.is_open());

        assert!(Status::Failed.is_failed());
        assert!(Status::PrecedenceFailed.is_failed());
        assert!(!Status::Pending.is_failed());
        assert!(!Status::Running.is_failed());
        assert!(!Status::Success.is_failed());
    }

    #[test]
    fn test_aggregate_picks_lowest_severity() {
        let statuses = [Status::Success, Status::Running, Status::Pending, Status::Success];
        assert_eq!(Status::aggregate(statuses), Status::Pending);

        let statuses = [Status::Success, Status::PrecedenceFailed, Status::Failed];
        assert_eq!(Status::aggregate(statuses), Status::Failed);
    }

    #[test]
    fn test_aggregate_empty() {
        assert_eq!(Status::aggregate(std::iter::empty()), Status::Empty);
        assert_eq!(Status::aggregate([Status::Empty, Status::Success]), Status::Success);
    }

    #[test]
    fn test_display_and_serde_agree() {
        let json = serde_json::to_string(&Status::PrecedenceFailed).unwrap();
        assert_eq!(json, "\"PRECEDENCE_FAILED\"");
        assert_eq!(Status::PrecedenceFailed.to_string(), "PRECEDENCE_FAILED");
    }
}
