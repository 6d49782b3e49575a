use anyhow::{Context, Result, anyhow};
use libqrtrack::storage::StorageConfig;
use serde::Deserialize;
use std::{collections::HashMap, path::Path};
use tokio::fs::read_to_string;
use tracing::debug;

/// The parts of the server configuration that this tool cares about
#[derive(Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl Config {
    fn parse(contents: &str, env: &str) -> Result<Self> {
        let mut configs: HashMap<String, Config> =
            serde_yaml::from_str(contents).with_context(|| "Couldn't parse config file")?;
        configs
            .remove(env)
            .ok_or_else(|| anyhow!("No environment named '{env}' in config file"))
    }

    /// Load the given environment from a server configuration file, falling
    /// back to environment variables when the file doesn't exist.
    pub async fn load<P: AsRef<Path>>(path: P, env: &str) -> Result<Self> {
        let p = path.as_ref();
        match read_to_string(p).await {
            Ok(contents) => {
                debug!(?p, env, "Loading server config");
                Self::parse(&contents, env)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?p, "No config file, using environment variables");
                Ok(Self {
                    storage: StorageConfig::from_vars(|name| std::env::var(name).ok())?,
                    public_base_url: std::env::var("RENDER_EXTERNAL_URL").ok(),
                })
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read config file {p:?}")),
        }
    }
}
