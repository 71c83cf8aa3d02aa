// SPDX-License-Identifier: GPL-3.0-only
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::store::models::API_NAMESPACE;
use crate::store::ContentStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Resource key and number of records removed
    pub purged: Vec<(String, u64)>,
    pub failed: Vec<String>,
}

/// Wipes every record of every application-owned content type.
///
/// Plugin and admin resources are never touched. One failing type is logged
/// and skipped; the rest are still purged.
pub struct DataReset {
    store: Arc<dyn ContentStore>,
}

impl DataReset {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn purge_all_managed_data(&self) -> PurgeReport {
        let mut report = PurgeReport::default();

        let permissions = match self.store.list_resource_actions().await {
            Ok(permissions) => permissions,
            Err(e) => {
                error!(error = %e, "Unable to list content types, nothing purged");
                return report;
            }
        };

        let keys = permissions
            .iter()
            .filter(|(namespace, _)| namespace.starts_with(API_NAMESPACE))
            .flat_map(|(namespace, resource)| {
                resource
                    .controllers
                    .keys()
                    .map(move |controller| format!("{namespace}.{controller}"))
            });

        for key in keys {
            match self.purge_one(&key).await {
                Ok(removed) => report.purged.push((key, removed)),
                Err(e) => {
                    warn!(resource = %key, error = %e, "Unable to purge content type");
                    report.failed.push(key);
                }
            }
        }

        info!(
            purged = report.purged.len(),
            failed = report.failed.len(),
            "Finished purging managed data"
        );
        report
    }

    async fn purge_one(&self, key: &str) -> crate::error::Result<u64> {
        let count = self.store.count(key).await?;
        if count == 0 {
            return Ok(0);
        }
        let removed = self.store.delete(key, count).await?;
        info!(resource = %key, removed, "Purged content type");
        Ok(removed)
    }
}
