//! mongowrap — connect to MongoDB and bootstrap the unauthenticated user.

mod cli;

use clap::Parser;
use mongowrap_client::{BootstrapOutcome, DocumentStoreClient};
use mongowrap_db::MongoConnector;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mongowrap=info".parse()?))
        .json()
        .init();

    let cli = Cli::parse();
    let config = cli.store_config()?;

    let client = DocumentStoreClient::new(config, MongoConnector)?;
    match client.connect().await {
        Ok(BootstrapOutcome::Created { id }) => {
            tracing::info!(id = %id, "Unauthenticated user created");
        }
        Ok(BootstrapOutcome::Skipped) => {
            tracing::info!("Unauthenticated user bootstrap not needed");
        }
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "Cannot reach MongoDB");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
