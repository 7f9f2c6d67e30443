//! Invoice ledger HTTP server
//!
//! Usage: `lms-invoicing [config.yaml]`. Without an argument the path is
//! taken from `LMS_INVOICING_CONFIG`; without either, defaults are used.

use anyhow::Result;
use lms_invoicing::config::AppConfig;
use lms_invoicing::server::{BillingHost, ServerBuilder};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LMS_INVOICING_CONFIG").ok());

    let config = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path);
            AppConfig::from_yaml_file(&path)?
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            AppConfig::default()
        }
    };

    let addr = config.server.bind_address();
    let permissive_cors = config.server.permissive_cors;
    tracing::info!(
        backend = ?config.storage.backend,
        prefix = %config.invoicing.number_prefix,
        "Starting invoice ledger"
    );

    let host = BillingHost::from_config(config).await?;

    let mut builder = ServerBuilder::new().with_host(host);
    if permissive_cors {
        builder = builder.with_permissive_cors();
    }
    builder.serve(&addr).await
}
