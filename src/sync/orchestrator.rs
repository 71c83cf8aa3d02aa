// SPDX-License-Identifier: GPL-3.0-only
use reqwest::StatusCode;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::medusa::{CommerceBackend, SeedData};
use crate::store::ResourceBootstrapper;
use crate::sync::mapper::map_fields_to_resource_keys;
use crate::sync::state::{FailureStage, SyncOutcome, SyncState, SyncStatus};

pub const SYNC_COMPLETED: &str = "SYNC COMPLETED";
pub const SYNC_PARTIAL: &str = "SYNC PARTIAL";

/// Pulls seed data from Medusa and feeds it to the local content types.
///
/// At most one sync runs at a time: the start transition is a single
/// check-and-claim on `state`. Resources are bootstrapped one after the
/// other in the order Medusa listed them, and every result is collected
/// before the sync is declared complete.
pub struct SyncOrchestrator {
    backend: Arc<dyn CommerceBackend>,
    bootstrapper: Arc<dyn ResourceBootstrapper>,
    interval: Duration,
    state: Mutex<SyncState>,
}

struct ApplyReport {
    applied: Vec<String>,
    failed: Vec<String>,
}

/// Holds the single-run claim until the run settles.
///
/// Returns the state to idle if a claimed run is dropped before it settles.
struct RunGuard<'a> {
    orchestrator: &'a SyncOrchestrator,
    settled: bool,
}

impl RunGuard<'_> {
    /// Record the outcome and release the claim in one critical section.
    /// `completed_at` is set only when every resource was applied.
    fn settle(mut self, completed_at: Option<Instant>, outcome: SyncOutcome) -> SyncOutcome {
        let mut state = self.orchestrator.lock_state();
        state.record_outcome(&outcome);
        match completed_at {
            Some(at) => state.mark_completed(at),
            None => state.mark_aborted(),
        }
        self.settled = true;
        outcome
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Sync run dropped before finishing, releasing state");
            self.orchestrator.lock_state().mark_aborted();
        }
    }
}

impl SyncOrchestrator {
    pub fn new(
        backend: Arc<dyn CommerceBackend>,
        bootstrapper: Arc<dyn ResourceBootstrapper>,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            bootstrapper,
            interval,
            state: Mutex::new(SyncState::new()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> SyncStatus {
        self.lock_state().snapshot()
    }

    pub async fn synchronise(&self) -> SyncOutcome {
        let claim = {
            let mut state = self.lock_state();
            let claim = state.try_begin(Instant::now(), self.interval);
            if let Err(reason) = claim {
                state.record_outcome(&SyncOutcome::Skipped { reason });
            }
            claim
        };
        if let Err(reason) = claim {
            warn!(?reason, "Sync request skipped");
            return SyncOutcome::Skipped { reason };
        }

        let guard = RunGuard {
            orchestrator: self,
            settled: false,
        };
        self.run(guard).await
    }

    // The claim stays held through the final signal.
    async fn run(&self, guard: RunGuard<'_>) -> SyncOutcome {

        if let Err(e) = self.backend.wait_until_ready().await {
            warn!(
                error = %e,
                "Unable to connect to Medusa server. Please make sure Medusa server is up and running"
            );
            return guard.settle(
                None,
                SyncOutcome::Failed {
                    stage: FailureStage::Readiness,
                    error: e.to_string(),
                },
            );
        }

        let seed = match self.backend.fetch_seed().await {
            Ok(seed) => seed,
            Err(e) => {
                warn!(error = %e, "Unable to sync with Medusa server. Check data received");
                return guard.settle(
                    None,
                    SyncOutcome::Failed {
                        stage: FailureStage::Fetch,
                        error: e.to_string(),
                    },
                );
            }
        };

        let report = self.apply(&seed).await;

        if report.failed.is_empty() {
            let finished = Instant::now();
            info!(resources = report.applied.len(), "SYNC FINISHED");
            let status = self.backend.notify(SYNC_COMPLETED, 200, None).await;
            guard.settle(
                Some(finished),
                SyncOutcome::Completed {
                    resources: report.applied,
                    signal_delivered: status == Some(StatusCode::OK),
                },
            )
        } else {
            error!(
                applied = report.applied.len(),
                failed = ?report.failed,
                "Sync finished with failed resources"
            );
            let status = self
                .backend
                .notify(SYNC_PARTIAL, 206, Some(json!({ "failed": report.failed })))
                .await;
            guard.settle(
                None,
                SyncOutcome::Partial {
                    applied: report.applied,
                    failed: report.failed,
                    signal_delivered: status == Some(StatusCode::OK),
                },
            )
        }
    }

    // Order matters: regions and providers must exist before products.
    async fn apply(&self, seed: &SeedData) -> ApplyReport {
        let mut report = ApplyReport {
            applied: Vec::new(),
            failed: Vec::new(),
        };

        for sync in map_fields_to_resource_keys(seed) {
            match self.bootstrapper.bootstrap(&sync.resource_key, &sync.payload).await {
                Ok(count) => {
                    info!(resource = %sync.resource_key, field = %sync.field, count, "Resource synchronised");
                    report.applied.push(sync.resource_key);
                }
                Err(e) => {
                    error!(resource = %sync.resource_key, field = %sync.field, error = %e, "Resource bootstrap failed");
                    report.failed.push(sync.resource_key);
                }
            }
        }

        report
    }

    /// Run `synchronise` on a fixed schedule until cancelled
    pub async fn run_periodic(self: Arc<Self>, every: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(every = ?every, "Periodic sync started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Periodic sync stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.synchronise().await;
                    info!(outcome = outcome.label(), success = outcome.succeeded(), "Scheduled sync finished");
                }
            }
        }
    }
}
