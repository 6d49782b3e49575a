use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct StorageArgs {
    #[arg(
        short,
        long,
        default_value = "qrtrack.yaml",
        help = "Server configuration file; environment variables are used if it doesn't exist"
    )]
    pub config: PathBuf,
    #[arg(short, long, default_value = "dev", help = "Name of the environment in the config file")]
    pub env: String,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Generate a QR code image that points to the server")]
    Qr {
        #[arg(short, long, help = "Url to encode instead of the detected server address")]
        url: Option<String>,
        #[arg(short, long, default_value_t = 5000, help = "Server port used with the local ip address")]
        port: u16,
        #[arg(short, long, default_value = "sample_info_qr.png")]
        output: PathBuf,
    },
    #[command(about = "Print the local network address of this machine")]
    LocalIp,
    #[command(about = "Show the last recorded location")]
    Show {
        #[command(flatten)]
        storage: StorageArgs,
    },
    #[command(about = "Show previously recorded locations, newest first")]
    History {
        #[command(flatten)]
        storage: StorageArgs,
        #[arg(short, long)]
        limit: Option<u32>,
    },
}
