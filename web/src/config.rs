use anyhow::{Context, Result};
use libqrtrack::storage::StorageConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

const MAP_KEY_VAR: &str = "KAKAO_APP_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct MapConfig {
    /// A file holding the kakao maps javascript key
    #[serde(default)]
    pub(crate) keyfile: String,
    #[serde(skip)]
    pub(crate) key: Option<SecretString>,
}

impl PartialEq for MapConfig {
    fn eq(&self, other: &Self) -> bool {
        self.keyfile == other.keyfile
            && self.key.as_ref().map(|k| k.expose_secret())
                == other.key.as_ref().map(|k| k.expose_secret())
    }
}

impl MapConfig {
    pub(crate) fn key(&self) -> Option<&str> {
        self.key.as_ref().map(|k| k.expose_secret())
    }
}

/// A static descriptive field shown above the location
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct Detail {
    pub(crate) label: String,
    pub(crate) value: String,
}

impl Detail {
    fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

fn default_details() -> Vec<Detail> {
    vec![
        Detail::new("Build date", "2025-06-11"),
        Detail::new("Specification", "JG RWA 4B motor specification improvement"),
        Detail::new("Baseline performance", "No issues"),
        Detail::new("Notes", "n/a"),
    ]
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListenConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
}

pub(crate) const DEFAULT_HTTP_PORT: u16 = 5000;
const DEFAULT_HOST: &str = "0.0.0.0";

fn default_listen() -> ListenConfig {
    ListenConfig {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_HTTP_PORT,
    }
}

// This handles the case where the `listen` block is PRESENT, but a field may be missing.
fn deserialize_listen_with_default_port<'de, D>(deserializer: D) -> Result<ListenConfig, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct PartialListenConfig {
        host: Option<String>,
        port: Option<u16>,
    }

    let partial_config = PartialListenConfig::deserialize(deserializer)?;

    Ok(ListenConfig {
        host: partial_config
            .host
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: partial_config.port.unwrap_or(DEFAULT_HTTP_PORT),
    })
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    #[serde(default = "default_listen")]
    #[serde(deserialize_with = "deserialize_listen_with_default_port")]
    pub(crate) listen: ListenConfig,
    #[serde(default)]
    pub(crate) storage: StorageConfig,
    /// The address that phones should use to reach the server. When it is
    /// not set, the local network address is used.
    #[serde(default)]
    pub(crate) public_base_url: Option<String>,
    #[serde(default)]
    pub(crate) map: MapConfig,
    #[serde(default = "default_details")]
    pub(crate) details: Vec<Detail>,
}

impl EnvConfig {
    /// Build the configuration from environment variables alone, for hosts
    /// where shipping a config file is inconvenient.
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = StorageConfig::from_vars(&var)?;
        let port = match var("PORT") {
            Some(p) => p
                .parse()
                .with_context(|| format!("Invalid value for PORT: '{p}'"))?,
            None => DEFAULT_HTTP_PORT,
        };
        Ok(Self {
            listen: ListenConfig {
                host: DEFAULT_HOST.to_string(),
                port,
            },
            storage,
            public_base_url: var("RENDER_EXTERNAL_URL"),
            map: MapConfig::default(),
            details: default_details(),
        })
    }

    pub(crate) fn init(&mut self) -> Result<()> {
        // 'keyfile' entry in environment config takes priority
        if !self.map.keyfile.is_empty() {
            debug!("Looking up map key from file '{}'", self.map.keyfile);
            let key = std::fs::read_to_string(&self.map.keyfile).with_context(|| {
                format!("Failed to read map key from file '{}'", self.map.keyfile)
            })?;
            self.map.key = Some(key.trim().to_string().into());
        } else {
            debug!("Looking up map key from environment variable");
            self.map.key = std::env::var(MAP_KEY_VAR)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(Into::into);
            if self.map.key.is_none() {
                warn!("{MAP_KEY_VAR} is not set, the location page will not be available");
            }
        }
        Ok(())
    }
}
