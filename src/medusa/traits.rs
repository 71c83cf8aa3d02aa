// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};

use crate::error::Result;

/// Seed payload keyed by Medusa field name, in the order Medusa sent it
pub type SeedData = Map<String, Value>;

#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Block until the commerce backend answers its health probe
    async fn wait_until_ready(&self) -> Result<()>;

    /// Ask the commerce backend for its current seed data
    async fn fetch_seed(&self) -> Result<SeedData>;

    /// Send a signed status signal; `None` when it could not be delivered
    async fn notify(&self, message: &str, code: i32, data: Option<Value>) -> Option<StatusCode>;
}
