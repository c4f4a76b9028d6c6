use std::cmp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::AnalysisReport;

/// Progress advances in fixed steps of 10 up to 100.
pub const PROGRESS_STEP: u8 = 10;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisStage {
    Initial,
    Processing,
    Result,
}

impl Default for AnalysisStage {
    fn default() -> Self {
        AnalysisStage::Initial
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisState {
    pub stage: AnalysisStage,
    pub progress: u8,
    pub is_complete: bool,
    pub run_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub report: Option<AnalysisReport>,
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self {
            stage: AnalysisStage::Initial,
            progress: 0,
            is_complete: false,
            run_id: None,
            started_at: None,
            report: None,
        }
    }
}

impl AnalysisState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_run(&mut self, run_id: String, started_at: DateTime<Utc>) {
        *self = Self {
            stage: AnalysisStage::Processing,
            progress: 0,
            is_complete: false,
            run_id: Some(run_id),
            started_at: Some(started_at),
            report: None,
        };
    }

    /// One tick of simulated progress. Returns true once progress has
    /// saturated; outside `Processing` this is a no-op.
    pub fn advance(&mut self) -> bool {
        if self.stage != AnalysisStage::Processing {
            return false;
        }
        self.progress = cmp::min(self.progress.saturating_add(PROGRESS_STEP), PROGRESS_DONE);
        if self.progress >= PROGRESS_DONE {
            self.is_complete = true;
        }
        self.is_complete
    }

    /// Move to `Result` and install the report. Honored only when the run
    /// is complete; any earlier call leaves the state untouched.
    pub fn show_result(&mut self, report: AnalysisReport) -> bool {
        if self.stage != AnalysisStage::Processing || !self.is_complete {
            return false;
        }
        self.stage = AnalysisStage::Result;
        self.report = Some(report);
        true
    }

    pub fn restart(&mut self) {
        *self = Self::default();
    }
}
