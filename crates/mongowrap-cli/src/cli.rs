//! Command-line arguments and configuration loading.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use mongowrap_client::StoreConfig;

/// Connect to MongoDB and make sure the unauthenticated user exists.
#[derive(Debug, Parser)]
#[command(name = "mongowrap", version, about)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Override the configured host.
    #[arg(long)]
    pub host: Option<String>,

    /// Override the configured port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the configured database name.
    #[arg(long)]
    pub db_name: Option<String>,
}

impl Cli {
    /// Load the configuration file and apply command-line overrides.
    pub fn store_config(&self) -> anyhow::Result<StoreConfig> {
        let mut config = load_config(&self.config)?;
        if let Some(host) = &self.host {
            config.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(db_name) = &self.db_name {
            config.db_name = Some(db_name.clone());
        }
        Ok(config)
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<StoreConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parsing config file {}", path.display()))
}

fn parse_config(text: &str) -> anyhow::Result<StoreConfig> {
    Ok(toml::from_str(text)?)
}
