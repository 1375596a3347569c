use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Per-URL processing status. Variants are listed in pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    PassedFilterStage1,
    FilteredOutStage1,
    FailedFilterStage1,
    FailedFetch,
    PassedFilterStage2,
    FilteredOutStage2,
    FailedFilterStage2,
    FailedAiProcessing,
    Processed,
    Pushed,
    SavedLocal,
    FailedPush,
    FailedSaveLocal,
}

impl ProcessingStatus {
    pub const ALL: [ProcessingStatus; 13] = [
        ProcessingStatus::PassedFilterStage1,
        ProcessingStatus::FilteredOutStage1,
        ProcessingStatus::FailedFilterStage1,
        ProcessingStatus::FailedFetch,
        ProcessingStatus::PassedFilterStage2,
        ProcessingStatus::FilteredOutStage2,
        ProcessingStatus::FailedFilterStage2,
        ProcessingStatus::FailedAiProcessing,
        ProcessingStatus::Processed,
        ProcessingStatus::Pushed,
        ProcessingStatus::SavedLocal,
        ProcessingStatus::FailedPush,
        ProcessingStatus::FailedSaveLocal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::PassedFilterStage1 => "passed_filter_stage1",
            ProcessingStatus::FilteredOutStage1 => "filtered_out_stage1",
            ProcessingStatus::FailedFilterStage1 => "failed_filter_stage1",
            ProcessingStatus::FailedFetch => "failed_fetch",
            ProcessingStatus::PassedFilterStage2 => "passed_filter_stage2",
            ProcessingStatus::FilteredOutStage2 => "filtered_out_stage2",
            ProcessingStatus::FailedFilterStage2 => "failed_filter_stage2",
            ProcessingStatus::FailedAiProcessing => "failed_ai_processing",
            ProcessingStatus::Processed => "processed",
            ProcessingStatus::Pushed => "pushed",
            ProcessingStatus::SavedLocal => "saved_local",
            ProcessingStatus::FailedPush => "failed_push",
            ProcessingStatus::FailedSaveLocal => "failed_save_local",
        }
    }

    /// Intermediate statuses are overwritten later in the same run.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            ProcessingStatus::PassedFilterStage1
                | ProcessingStatus::PassedFilterStage2
                | ProcessingStatus::Processed
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::FailedFilterStage1
                | ProcessingStatus::FailedFetch
                | ProcessingStatus::FailedFilterStage2
                | ProcessingStatus::FailedAiProcessing
                | ProcessingStatus::FailedPush
                | ProcessingStatus::FailedSaveLocal
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ProcessingStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow!("unknown processing status: {s}"))
    }
}

/// One row of the processing ledger. The URL is the primary key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub url: String,
    pub processed_at: String,
    pub status: ProcessingStatus,
    pub title: Option<String>,
    pub filter_result: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in ProcessingStatus::ALL {
            assert_eq!(status.as_str().parse::<ProcessingStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<ProcessingStatus>().is_err());
    }

    #[test]
    fn intermediate_statuses_are_not_terminal() {
        assert!(!ProcessingStatus::Processed.is_terminal());
        assert!(ProcessingStatus::SavedLocal.is_terminal());
        assert!(ProcessingStatus::FailedFetch.is_failure());
        assert!(!ProcessingStatus::FilteredOutStage2.is_failure());
    }
}
