use serde::Serialize;
use tracing::info;

use crate::output::OutputMethod;
use crate::types::ProcessingStatus;

/// Per-run counters. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_fetched: usize,
    pub skipped_processed: usize,
    pub passed_stage1: usize,
    pub filtered_out_stage1: usize,
    pub failed_stage1: usize,
    pub failed_fetch: usize,
    pub passed_stage2: usize,
    pub filtered_out_stage2: usize,
    pub failed_stage2: usize,
    pub failed_transform: usize,
    pub processed: usize,
    pub pushed: usize,
    pub saved_local: usize,
    pub failed_push: usize,
    pub failed_save_local: usize,
}

impl RunSummary {
    /// Count one status write.
    pub fn record(&mut self, status: ProcessingStatus) {
        *self.counter_mut(status) += 1;
    }

    /// Writes of `status` so far this run.
    pub fn count(&self, status: ProcessingStatus) -> usize {
        let mut copy = *self;
        *copy.counter_mut(status)
    }

    fn counter_mut(&mut self, status: ProcessingStatus) -> &mut usize {
        match status {
            ProcessingStatus::PassedFilterStage1 => &mut self.passed_stage1,
            ProcessingStatus::FilteredOutStage1 => &mut self.filtered_out_stage1,
            ProcessingStatus::FailedFilterStage1 => &mut self.failed_stage1,
            ProcessingStatus::FailedFetch => &mut self.failed_fetch,
            ProcessingStatus::PassedFilterStage2 => &mut self.passed_stage2,
            ProcessingStatus::FilteredOutStage2 => &mut self.filtered_out_stage2,
            ProcessingStatus::FailedFilterStage2 => &mut self.failed_stage2,
            ProcessingStatus::FailedAiProcessing => &mut self.failed_transform,
            ProcessingStatus::Processed => &mut self.processed,
            ProcessingStatus::Pushed => &mut self.pushed,
            ProcessingStatus::SavedLocal => &mut self.saved_local,
            ProcessingStatus::FailedPush => &mut self.failed_push,
            ProcessingStatus::FailedSaveLocal => &mut self.failed_save_local,
        }
    }

    /// Candidates not skipped as already handled.
    pub fn attempted(&self) -> usize {
        self.total_fetched - self.skipped_processed
    }

    pub fn failed(&self) -> usize {
        ProcessingStatus::ALL
            .iter()
            .filter(|status| status.is_failure())
            .map(|status| self.count(*status))
            .sum()
    }

    pub fn delivered(&self) -> usize {
        self.pushed + self.saved_local
    }

    pub fn log(&self, method: OutputMethod) {
        info!("--- Run Summary ---");
        info!("Total unique articles found in feeds: {}", self.total_fetched);
        info!("Previously processed (skipped): {}", self.skipped_processed);
        info!("Attempted: {}", self.attempted());
        info!(
            "Stage 1 (title/summary): passed {}, filtered out {}, failed {}",
            self.passed_stage1, self.filtered_out_stage1, self.failed_stage1
        );
        info!("Content fetch failures: {}", self.failed_fetch);
        info!(
            "Stage 2 (full content): passed {}, filtered out {}, failed {}",
            self.passed_stage2, self.filtered_out_stage2, self.failed_stage2
        );
        info!(
            "Transform: processed {}, failed {}",
            self.processed, self.failed_transform
        );
        match method {
            OutputMethod::Api => info!("Pushed to API: {}, failed: {}", self.pushed, self.failed_push),
            OutputMethod::Local => info!(
                "Saved locally: {}, failed: {}",
                self.saved_local, self.failed_save_local
            ),
        }
        info!("Total failures: {}", self.failed());
        info!("--- Run Finished ---");
    }
}
