use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use log::{debug, info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use waterfall_protocol::management::instance::ProcessStatus;

use waterfall_daemon::config::AppConfig;
use waterfall_daemon::management::comm::{ConsoleSink, ProcessHandle};
use waterfall_daemon::management::http::build_http_client;
use waterfall_daemon::management::java::JavaLocator;
use waterfall_daemon::management::version::VersionResolver;
use waterfall_daemon::management::{ServerPlugin, UpdateOutcome, WaterfallServer};
use waterfall_daemon::storage::ServerPaths;

use crate::{Args, Command};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
const CONSOLE_DRAIN: Duration = Duration::from_secs(2);

struct AppState {
    config: AppConfig,
    paths: ServerPaths,
}

impl AppState {
    fn load(args: &Args) -> anyhow::Result<Self> {
        let config = AppConfig::load(&args.config)
            .with_context(|| format!("failed to load {}", args.config.display()))?;
        debug!(
            "config loaded: {}",
            serde_json::to_string_pretty(&config).unwrap_or_default()
        );
        Ok(Self {
            paths: ServerPaths::new(&config.servers_root),
            config,
        })
    }

    fn server(&self, id: &str, console: ConsoleSink) -> anyhow::Result<WaterfallServer> {
        let installation = self.paths.load_installation(id)?;
        WaterfallServer::builder(installation)
            .remote(self.config.remote.clone())
            .runtime(Arc::new(JavaLocator::new(self.config.java_path.clone())))
            .console(console)
            .build()
    }
}

pub async fn run_app(args: Args) -> anyhow::Result<()> {
    info!("waterfall-daemon v{}", VERSION);
    let state = AppState::load(&args)?;

    match args.command {
        Command::Install { id } => {
            let server = state.server(&id, ConsoleSink::new())?;
            let build = server.install().await?;
            info!("installed {} into {}", build, server.installation().root.display());
        }
        Command::Update { id } => {
            let server = state.server(&id, ConsoleSink::new())?;
            match server.update().await? {
                UpdateOutcome::StaleArtifactRemoved => {
                    info!("old {} removed", server.installation().artifact)
                }
                UpdateOutcome::Installed(build) => info!("updated to {}", build),
            }
        }
        Command::Start { id, no_console } => {
            let console = ConsoleSink::new();
            let printer = forward_console(&console, |line| println!("{}", line));
            let server = state.server(&id, console)?;
            let result = run_until_exit(&server, !no_console).await;
            // the printer only sees Closed once every sink clone is gone
            drop(server);
            finish_console(printer).await;
            result?;
        }
        Command::Validate { id } => {
            let server = state.server(&id, ConsoleSink::new())?;
            if !server.validate_install() {
                bail!(
                    "{} not found in {}",
                    server.installation().artifact,
                    server.installation().root.display()
                );
            }
            info!("server {} is installed", id);
        }
        Command::Import { id, path } => {
            let server = state.server(&id, ConsoleSink::new())?;
            let validation = server.validate_import(&path);
            if !validation.valid {
                bail!(validation.message.unwrap_or_default());
            }
            info!("{} can be imported", path.display());
        }
        Command::RemoteBuild => {
            let client = build_http_client(&state.config.remote)?;
            let resolver = VersionResolver::new(client, state.config.remote.index_url.clone());
            println!("{}", resolver.resolve().await?);
        }
        Command::CreateConfig { id } => {
            let server = state.server(&id, ConsoleSink::new())?;
            if !server.create_server_config().await? {
                bail!("config template could not be downloaded");
            }
            info!("config written for server {}", id);
        }
    }
    Ok(())
}

fn forward_console<F>(console: &ConsoleSink, mut emit: F) -> JoinHandle<()>
where
    F: FnMut(String) + Send + 'static,
{
    let mut lines = console.subscribe();
    tokio::spawn(async move {
        loop {
            match lines.recv().await {
                Ok(line) => emit(line),
                Err(RecvError::Lagged(skipped)) => warn!("console skipped {} lines", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Lets the forwarder print what is still queued, then gives up after [`CONSOLE_DRAIN`].
async fn finish_console(mut printer: JoinHandle<()>) {
    if tokio::time::timeout(CONSOLE_DRAIN, &mut printer).await.is_err() {
        warn!("console output did not close, dropping the rest");
        printer.abort();
    }
}

/// Plays the host: start, wait for Ctrl-C, ask for a stop, then watch for the exit.
async fn run_until_exit(server: &WaterfallServer, redirect_console: bool) -> anyhow::Result<()> {
    let mut handle = server.start(redirect_console).await?;

    let exited = tokio::select! {
        status = handle.wait() => Some(status?),
        _ = tokio::signal::ctrl_c() => None,
    };
    if let Some(status) = exited {
        info!("server exited: {}", status);
        return Ok(());
    }

    server.stop(&mut handle).await?;
    info!("stop request sent, waiting for the server to exit (Ctrl-C again to kill)");
    wait_or_kill(&mut handle).await
}

async fn wait_or_kill(handle: &mut ProcessHandle) -> anyhow::Result<()> {
    let exited = tokio::select! {
        status = handle.wait() => Some(status?),
        _ = tokio::signal::ctrl_c() => None,
    };
    match exited {
        Some(status) => info!("server exited: {}", status),
        None if handle.status() == ProcessStatus::Running => {
            warn!("killing server (pid={:?})", handle.id());
            handle.kill().await?;
        }
        None => {}
    }
    Ok(())
}
