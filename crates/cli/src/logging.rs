//! Logging setup
//!
//! Logs go to stderr so table and JSON output on stdout stay machine-readable.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `adbtray=warn`)
//! - `ADBTRAY_LOG_FORMAT`: `json`, `pretty` or `compact` (default)

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "adbtray=warn";

pub fn init_logging() {
    let log_format =
        std::env::var("ADBTRAY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        "pretty" => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}
