// SPDX-License-Identifier: GPL-3.0-only
use tracing_subscriber::{fmt, EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

// sqlx logs every statement at info
const QUIET_DEPENDENCIES: &str = "sqlx=warn,hyper=warn,reqwest=warn";

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{log_level},{QUIET_DEPENDENCIES}")))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn setup_logging(log_level: &str, json: bool) -> anyhow::Result<()> {
    let fmt_layer = if json {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(build_filter(log_level))
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
