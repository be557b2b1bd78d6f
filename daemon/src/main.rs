use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::app::run_app;

mod app;

/// Installs, updates and runs a Waterfall proxy server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Application config file (JSON), created with defaults if missing
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the latest build and write the default config
    Install { id: String },
    /// Remove the current jar, or download the latest build if there is none
    Update { id: String },
    /// Run the server until it exits; Ctrl-C asks it to stop, a second Ctrl-C kills it
    Start {
        id: String,
        /// Let the server use the terminal directly instead of the embedded console
        #[arg(long)]
        no_console: bool,
    },
    /// Check that the server jar is installed
    Validate { id: String },
    /// Check that a directory holds a server jar that can be imported
    Import { id: String, path: PathBuf },
    /// Print the latest published `<version>/<build>`
    RemoteBuild,
    /// Download and render config.yml for the server
    CreateConfig { id: String },
}

fn init_logger(debug: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }),
    };
    builder.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.debug);
    run_app(args).await
}
