//! This is a command-line tool to help set up and inspect a location tracker
//! served by `qrtrackweb`
use crate::{cli::*, config::Config};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use libqrtrack::{net, qr};
use tracing::debug;

mod cli;
mod config;
mod output;

const PUBLIC_URL_VAR: &str = "RENDER_EXTERNAL_URL";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Cli::parse();

    match args.command {
        Commands::Qr { url, port, output } => {
            let url = url.or_else(|| std::env::var(PUBLIC_URL_VAR).ok());
            let url = net::server_url(url.as_deref(), port);
            println!("Generating QR code for URL: {url}");
            qr::save_png(&url, &output)
                .await
                .with_context(|| format!("Failed to generate QR code {output:?}"))?;
            println!("QR code saved to {}", output.display());
            Ok(())
        }
        Commands::LocalIp => {
            println!("{}", net::local_ip());
            Ok(())
        }
        Commands::Show { storage } => {
            let cfg = Config::load(&storage.config, &storage.env).await?;
            debug!(?cfg.storage, "Opening storage");
            let backend = cfg.storage.open().await?;
            let loc = backend
                .latest()
                .await
                .with_context(|| format!("Failed to read from {}", backend.describe()))?
                .ok_or_else(|| anyhow!("No location has been recorded yet"))?;
            println!("{}", output::format_one(&loc, storage.output)?);
            Ok(())
        }
        Commands::History { storage, limit } => {
            let cfg = Config::load(&storage.config, &storage.env).await?;
            debug!(?cfg.storage, "Opening storage");
            let backend = cfg.storage.open().await?;
            let locs = backend
                .history(limit)
                .await
                .with_context(|| format!("Failed to read from {}", backend.describe()))?;
            println!("{}", output::format_seq(&locs, storage.output)?);
            Ok(())
        }
    }
}
