//! Lending service binary

use lending_core::{BorrowWorkflow, Config};
use notification_bus::LogDispatcher;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Shelfshare lending server");

    // Load configuration
    let config = Config::from_env()?;

    // Open the workflow over local storage, logging notifications
    let _workflow = BorrowWorkflow::open(config, Arc::new(LogDispatcher::new()))?;
    tracing::info!("Lending workflow ready");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down lending server");
    Ok(())
}
