// SPDX-License-Identifier: GPL-3.0-only
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
#[cfg(test)]
use jsonwebtoken::{DecodingKey, Validation, decode};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::{BridgeError, Result};
use crate::medusa::readiness::ReadinessProber;

/// Status notification carried as the claims of an HS256 token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    pub message: String,
    pub code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub iat: i64,
}

impl SignalMessage {
    pub fn new(message: impl Into<String>, code: i32, data: Option<Value>) -> Self {
        Self {
            message: message.into(),
            code,
            data,
            iat: chrono::Utc::now().timestamp(),
        }
    }
}

/// Signs and verifies signal tokens with the secret shared with Medusa
#[derive(Clone)]
pub struct SignalSigner {
    encoding_key: EncodingKey,
    #[cfg(test)]
    decoding_key: DecodingKey,
}

impl SignalSigner {
    /// Refuses to build without a non-empty secret
    pub fn new(secret: Option<&str>) -> Result<Self> {
        match secret {
            Some(secret) if !secret.is_empty() => Ok(Self {
                encoding_key: EncodingKey::from_secret(secret.as_bytes()),
                #[cfg(test)]
                decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            }),
            _ => Err(BridgeError::MissingSecret),
        }
    }

    pub fn sign(&self, message: &SignalMessage) -> Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), message, &self.encoding_key)?)
    }

    #[cfg(test)]
    pub fn verify(&self, token: &str) -> Result<SignalMessage> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Ok(decode::<SignalMessage>(token, &self.decoding_key, &validation)?.claims)
    }
}

/// Posts signed status messages to `{base}/hooks/strapi-signal`
#[derive(Clone)]
pub struct SignalRelay {
    client: Client,
    base_url: String,
    signer: SignalSigner,
    prober: ReadinessProber,
}

impl SignalRelay {
    pub fn new(client: Client, base_url: String, signer: SignalSigner, prober: ReadinessProber) -> Self {
        Self {
            client,
            base_url,
            signer,
            prober,
        }
    }

    /// Send a signal once Medusa is ready. Never fails: problems are logged
    /// and reported as `None`.
    pub async fn notify(&self, message: &str, code: i32, data: Option<Value>) -> Option<StatusCode> {
        match self.try_notify(SignalMessage::new(message, code, data)).await {
            Ok(status) => {
                info!(message = %message, code, status = %status, "Signal delivered to Medusa");
                Some(status)
            }
            Err(e) => {
                error!(message = %message, code, error = %e, "Unable to send message to Medusa server");
                None
            }
        }
    }

    async fn try_notify(&self, message: SignalMessage) -> Result<StatusCode> {
        self.prober.wait_until_ready(&self.base_url).await?;

        let signed_message = self.signer.sign(&message)?;
        let url = format!("{}/hooks/strapi-signal", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&json!({ "signedMessage": signed_message }))
            .send()
            .await?;

        Ok(response.status())
    }
}
