use crate::{EnvConfig, TemplateEngine, template_engine};
use anyhow::{Context, Result};
use axum::response::IntoResponse;
use axum_template::RenderHtml;
use libqrtrack::{net, storage::DynBackend};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info, trace};

#[derive(Debug)]
pub struct SharedState {
    pub storage: DynBackend,
    pub tmpl: TemplateEngine,
    pub config: EnvConfig,
    pub datadir: PathBuf,
}

impl SharedState {
    pub async fn new(env: EnvConfig, datadir: PathBuf) -> Result<Self> {
        let tmpl_path = datadir.join("templates");
        let template = template_engine(&tmpl_path);
        trace!("Creating shared app state");
        debug!(?env.storage, "Opening location storage");
        let storage = env
            .storage
            .open()
            .await
            .with_context(|| format!("Unable to open location storage {:?}", env.storage))?;
        info!("Storing locations in {}", storage.describe());
        Ok(Self {
            storage,
            tmpl: template,
            config: env,
            datadir,
        })
    }

    pub fn render_template<K, S>(&self, key: K, data: S) -> impl IntoResponse + use<K, S>
    where
        K: AsRef<str>,
        S: Serialize,
    {
        RenderHtml(key, self.tmpl.clone(), data)
    }

    /// The url that the QR code and the page's own links should point to
    pub fn public_url(&self) -> String {
        net::server_url(
            self.config.public_base_url.as_deref(),
            self.config.listen.port,
        )
    }

    #[cfg(test)]
    pub fn test(storage: DynBackend, map_key: Option<&str>) -> Self {
        let template = template_engine("./templates");
        debug!("Creating test shared app state");
        let mut config = EnvConfig::from_vars(|name| match name {
            "RENDER_EXTERNAL_URL" => Some("http://tracker.test".to_string()),
            _ => None,
        })
        .expect("Failed to create test config");
        config.map.key = map_key.map(|k| k.to_string().into());
        Self {
            storage,
            tmpl: template,
            config,
            datadir: ".".into(),
        }
    }
}

pub type AppState = Arc<SharedState>;
