// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRunning,
    TooSoon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Readiness,
    Fetch,
}

/// Result of one `synchronise` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Skipped {
        reason: SkipReason,
    },
    Failed {
        stage: FailureStage,
        error: String,
    },
    /// Some resources failed to bootstrap
    Partial {
        applied: Vec<String>,
        failed: Vec<String>,
        signal_delivered: bool,
    },
    Completed {
        resources: Vec<String>,
        signal_delivered: bool,
    },
}

impl SyncOutcome {
    /// Boolean view used by callers that only need "ok or not".
    ///
    /// A skip counts as success; a completed sync succeeds only if Medusa
    /// acknowledged the completion signal with 200.
    pub fn succeeded(&self) -> bool {
        match self {
            SyncOutcome::Skipped { .. } => true,
            SyncOutcome::Completed { signal_delivered, .. } => *signal_delivered,
            SyncOutcome::Partial { .. } | SyncOutcome::Failed { .. } => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Skipped { reason: SkipReason::AlreadyRunning } => "skipped_already_running",
            SyncOutcome::Skipped { reason: SkipReason::TooSoon } => "skipped_too_soon",
            SyncOutcome::Failed { .. } => "failed",
            SyncOutcome::Partial { .. } => "partial",
            SyncOutcome::Completed { .. } => "completed",
        }
    }
}

/// Process-wide sync bookkeeping. Never persisted.
#[derive(Debug)]
pub struct SyncState {
    phase: SyncPhase,
    last_completed: Option<Instant>,
    last_completed_at: Option<DateTime<Utc>>,
    last_outcome: Option<SyncOutcome>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            phase: SyncPhase::Idle,
            last_completed: None,
            last_completed_at: None,
            last_outcome: None,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Claim the right to run a sync, or say why not
    pub fn try_begin(&mut self, now: Instant, interval: Duration) -> Result<(), SkipReason> {
        if self.phase == SyncPhase::InProgress {
            return Err(SkipReason::AlreadyRunning);
        }
        if let Some(last) = self.last_completed {
            if now.saturating_duration_since(last) < interval {
                return Err(SkipReason::TooSoon);
            }
        }
        self.phase = SyncPhase::InProgress;
        Ok(())
    }

    pub fn mark_completed(&mut self, now: Instant) {
        self.phase = SyncPhase::Completed;
        self.last_completed = Some(now);
        self.last_completed_at = Some(Utc::now());
    }

    /// Back to idle so the next call may retry
    pub fn mark_aborted(&mut self) {
        if self.phase == SyncPhase::InProgress {
            self.phase = SyncPhase::Idle;
        }
    }

    pub fn record_outcome(&mut self, outcome: &SyncOutcome) {
        self.last_outcome = Some(outcome.clone());
    }

    pub fn snapshot(&self) -> SyncStatus {
        SyncStatus {
            phase: self.phase,
            last_completed_at: self.last_completed_at,
            last_outcome: self.last_outcome.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<SyncOutcome>,
}
