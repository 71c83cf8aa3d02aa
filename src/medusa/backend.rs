// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::medusa::readiness::ReadinessProber;
use crate::medusa::signal::{SignalRelay, SignalSigner};
use crate::medusa::traits::{CommerceBackend, SeedData};

/// HTTP client for the Medusa side of the bridge
#[derive(Clone)]
pub struct MedusaBackend {
    client: Client,
    base_url: String,
    prober: ReadinessProber,
    relay: SignalRelay,
}

impl MedusaBackend {
    pub fn new(config: &Config, cancel: CancellationToken) -> Result<Self> {
        let signer = SignalSigner::new(config.signal_secret.as_deref())?;

        // 3xx must not count as healthy
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("medusa-bridge/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let base_url = config.medusa_backend_url.trim_end_matches('/').to_string();
        let prober = ReadinessProber::new(client.clone(), &config.readiness).with_cancellation(cancel);
        let relay = SignalRelay::new(client.clone(), base_url.clone(), signer, prober.clone());

        Ok(Self {
            client,
            base_url,
            prober,
            relay,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl CommerceBackend for MedusaBackend {
    async fn wait_until_ready(&self) -> Result<()> {
        self.prober.wait_until_ready(&self.base_url).await.map(|_| ())
    }

    async fn fetch_seed(&self) -> Result<SeedData> {
        let url = self.endpoint("hooks/seed");
        info!(url = %url, "Attempting to sync with Medusa server");

        let response = self.client.post(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Seed request rejected");
            return Err(BridgeError::UnexpectedStatus { url, status });
        }

        match response.json::<Value>().await? {
            Value::Object(fields) => {
                info!(fields = fields.len(), "Received seed data from Medusa");
                Ok(fields)
            }
            other => Err(BridgeError::InvalidSeed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn notify(&self, message: &str, code: i32, data: Option<Value>) -> Option<StatusCode> {
        self.relay.notify(message, code, data).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
