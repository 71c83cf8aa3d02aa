// SPDX-License-Identifier: GPL-3.0-only
pub mod mapper;
pub mod orchestrator;
pub mod state;

pub use orchestrator::SyncOrchestrator;
pub use state::{SyncOutcome, SyncStatus};
