use std::sync::OnceLock;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use crate::Result;

static SUBSCRIBER: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// One structured record emitted by a pipeline stage.
#[derive(Debug, Serialize)]
pub struct LogEvent<'a> {
    pub filename: &'a str,
    pub timestamp: DateTime<Utc>,
    pub component: &'a str,
    pub operation: &'a str,
    pub stage: &'a str,
    pub line_num: u32,
    pub error: Option<&'a str>,
    pub message: &'a str,
}

/// Directive used when `RUST_LOG` is unset: pipeline events at `info`, dependencies at `warn`.
pub const DEFAULT_FILTER: &str = "warn,fiscal_metrics=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a flattened JSON subscriber for pipeline events, filtered by `RUST_LOG`.
///
/// Only the first call installs anything; later calls report the outcome of that first
/// attempt.
pub fn init_logging() -> Result<()> {
    let installed = SUBSCRIBER.get_or_init(|| {
        fmt()
            .with_env_filter(env_filter())
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_target(true)
            .try_init()
            .map_err(|error| format!("failed to install fiscal_metrics subscriber: {error}"))
    });

    installed.clone().map_err(|message| anyhow!(message))
}

/// Emit a structured pipeline event. Events carrying an error are logged at `warn`.
pub fn log_event(
    filename: &str,
    component: &str,
    operation: &str,
    stage: &str,
    line_num: u32,
    message: &str,
    error: Option<&str>,
) {
    let event = LogEvent {
        filename,
        timestamp: Utc::now(),
        component,
        operation,
        stage,
        line_num,
        error,
        message,
    };

    let serialized = serde_json::to_string(&event);
    match (serialized, error) {
        (Ok(json), Some(_)) => warn!(target: "fiscal_metrics", json = %json),
        (Ok(json), None) => info!(target: "fiscal_metrics", json = %json),
        (Err(_), Some(error)) => warn!(target: "fiscal_metrics", message, error),
        (Err(_), None) => info!(target: "fiscal_metrics", message),
    }
}
