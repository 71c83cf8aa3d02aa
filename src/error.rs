// SPDX-License-Identifier: GPL-3.0-only
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("Medusa server at {url} not ready after {waited:?}")]
    Timeout { url: String, waited: Duration },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: reqwest::StatusCode },

    #[error("Signal secret is not configured (set MEDUSA_STRAPI_SECRET)")]
    MissingSecret,

    #[error("Failed to sign or verify signal: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid seed data: {0}")]
    InvalidSeed(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Password hashing failed: {0}")]
    Password(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
