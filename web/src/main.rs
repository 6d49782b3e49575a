use anyhow::{Context, Result, anyhow};
use axum::{
    Router,
    routing::{get, post},
};
use axum_template::engine::Engine;
use clap::Parser;
use config::EnvConfig;
use minijinja::Environment;
use state::{AppState, SharedState};
use std::{
    collections::HashMap,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, info};
use tracing_subscriber::filter::EnvFilter;

mod api;
mod config;
mod error;
mod html;
mod state;
#[cfg(test)]
mod tests;
mod util;

const API_PREFIX: &str = "/api/v1";

pub type TemplateEngine = Engine<Environment<'static>>;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(
        short,
        long,
        default_value = "qrtrack.yaml",
        help = "Configuration file; environment variables are used if it doesn't exist"
    )]
    pub config: PathBuf,
    #[arg(short, long, default_value = "dev", help = "Name of the environment in the config file")]
    pub env: String,
    #[arg(short, long, help = "Address to listen on, overriding the configuration")]
    pub listen: Option<String>,
    #[arg(short, long, help = "Port to listen on, overriding the configuration")]
    pub port: Option<u16>,
    #[arg(
        short,
        long,
        default_value = "web",
        help = "Directory containing the templates and static files"
    )]
    pub datadir: PathBuf,
}

pub(crate) fn template_engine<P: AsRef<Path>>(path: P) -> TemplateEngine {
    let mut jinja = Environment::new();
    jinja.set_loader(minijinja::path_loader(path));
    jinja.add_filter("timefmt", util::format_timestamp);
    jinja.add_filter("coord", util::format_coordinate);
    Engine::from(jinja)
}

async fn load_config(args: &Cli) -> Result<EnvConfig> {
    let mut env = match tokio::fs::read_to_string(&args.config).await {
        Ok(contents) => {
            debug!("Loading environment '{}' from {:?}", args.env, args.config);
            let mut configs: HashMap<String, EnvConfig> = serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {:?}", args.config))?;
            configs.remove(&args.env).ok_or_else(|| {
                anyhow!(
                    "No environment named '{}' in config file {:?}",
                    args.env,
                    args.config
                )
            })?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(
                "Config file {:?} not found, configuring from environment variables",
                args.config
            );
            EnvConfig::from_env()?
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read config file {:?}", args.config));
        }
    };
    if let Some(host) = &args.listen {
        env.listen.host = host.clone();
    }
    if let Some(port) = args.port {
        env.listen.port = port;
    }
    env.init()?;
    Ok(env)
}

pub(crate) fn app(state: AppState) -> Router {
    let static_dir = state.datadir.join("static");
    Router::new()
        .merge(html::router())
        .route("/update_location", post(api::location::update_location))
        .nest(API_PREFIX, api::router())
        .route("/healthz", get(api::health))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
pub(crate) fn test_app(
    storage: libqrtrack::storage::DynBackend,
    map_key: Option<&str>,
) -> (Router, AppState) {
    let state = Arc::new(SharedState::test(storage, map_key));
    (app(state.clone()), state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("QRTRACK_LOG"))
        .init();
    let args = Cli::parse();
    let env = load_config(&args).await?;

    let addr: SocketAddr = format!("{}:{}", env.listen.host, env.listen.port).parse()?;
    let shared_state = Arc::new(SharedState::new(env, args.datadir).await?);
    info!("QR code points to {}", shared_state.public_url());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(shared_state)).await?;
    Ok(())
}
