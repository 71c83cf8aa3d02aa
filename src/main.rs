// SPDX-License-Identifier: GPL-3.0-only
mod api;
mod config;
mod error;
mod identity;
mod logging;
mod medusa;
mod reset;
mod store;
mod sync;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use api::HttpServer;
use config::Config;
use identity::IdentityProvisioner;
use logging::setup_logging;
use medusa::MedusaBackend;
use reset::DataReset;
use store::models::DEFAULT_ACTIONS;
use store::{ContentStore, SqliteContentStore};
use sync::SyncOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    setup_logging(&config.log_level, config.log_json)?;

    info!("Starting medusa-bridge v{}", env!("CARGO_PKG_VERSION"));

    // Initialize content store
    let store = Arc::new(SqliteContentStore::new(&config.store_db_path).await?);
    info!("Content store initialized at {}", config.store_db_path.display());

    for key in &config.content_types {
        if let Err(e) = store.register_resource(key, DEFAULT_ACTIONS).await {
            warn!(resource = %key, error = %e, "Skipping content type");
        }
    }

    let provisioner = IdentityProvisioner::new(store.clone());
    match provisioner.provision(&config.service_user).await {
        Some(user) => info!(user_id = user.id, username = %user.username, "Service account ready"),
        None => warn!("Service account could not be provisioned"),
    }
    // Logs whether the account Medusa authenticates as is present
    provisioner.find_service_user().await;

    if config.purge_on_startup {
        let report = DataReset::new(store.clone()).purge_all_managed_data().await;
        if !report.failed.is_empty() {
            warn!(failed = ?report.failed, "Some content types were not purged");
        }
    }

    let cancel = CancellationToken::new();

    let backend = Arc::new(MedusaBackend::new(&config, cancel.clone())?);
    info!(url = %backend.base_url(), "Medusa backend configured");

    let orchestrator = Arc::new(SyncOrchestrator::new(backend, store, config.sync_interval()));

    let sync_task = config.sync_schedule().map(|every| {
        tokio::spawn(Arc::clone(&orchestrator).run_periodic(every, cancel.clone()))
    });
    if sync_task.is_none() {
        info!("Scheduled sync disabled");
    }

    // Start HTTP server
    let http_server = HttpServer::new(Arc::clone(&orchestrator), config.local_api_bind);
    let http_cancel = cancel.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.serve(http_cancel).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("All services started. Waiting for shutdown signal...");

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal (Ctrl+C)");
        }
        Err(err) => {
            error!(error = %err, "Unable to listen for shutdown signal");
        }
    }

    // Graceful shutdown
    info!("Initiating graceful shutdown...");
    cancel.cancel();

    if let Some(task) = sync_task {
        if let Err(e) = task.await {
            error!(error = %e, "Sync task did not shut down cleanly");
        }
    }
    if let Err(e) = http_task.await {
        error!(error = %e, "HTTP task did not shut down cleanly");
    }

    info!("Shutdown complete");
    Ok(())
}
