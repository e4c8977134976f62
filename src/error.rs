//! Error taxonomy for the reconciliation and derived-metrics pipeline.
//!
//! Only conditions that make a run meaningless are errors. A rate that cannot
//! be computed is not one of them: it is carried as `None` through the tables.

use chrono::NaiveDate;
use thiserror::Error;

/// Fatal pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Neither the summary nor the bulletin series has a usable row.
    #[error("nothing to reconcile: summary and bulletin series are both empty")]
    EmptyInput,

    /// A requested vaccination target group has no rows in the dose data.
    #[error("no vaccination rows for target group '{0}'")]
    UnknownTargetGroup(String),

    /// The weekly hospitalization and vaccination tables never meet on a week anchor.
    #[error("daily and vaccination series share no week-anchor dates")]
    NoOverlap,

    /// A correction table entry that cannot be applied.
    #[error("invalid correction for {date} ({field}): {reason}")]
    InvalidCorrection {
        date: NaiveDate,
        field: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_group() {
        let err = PipelineError::UnknownTargetGroup("Age5_9".to_string());
        assert_eq!(err.to_string(), "no vaccination rows for target group 'Age5_9'");
    }

    #[test]
    fn test_invalid_correction_message() {
        let err = PipelineError::InvalidCorrection {
            date: NaiveDate::from_ymd_opt(2022, 1, 18).unwrap(),
            field: "deaths".to_string(),
            reason: "must be a non-negative integer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid correction for 2022-01-18 (deaths): must be a non-negative integer"
        );
    }
}
