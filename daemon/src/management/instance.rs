use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use reqwest::Client;
use url::Url;
use waterfall_protocol::management::instance::{BuildDescriptor, ServerInstallation, Validation};

use crate::config::RemoteConfig;
use crate::management::artifact::ArtifactInstaller;
use crate::management::comm::{ConsoleSink, ProcessHandle, ProcessSupervisor};
use crate::management::error::SupervisorResult;
use crate::management::http::build_http_client;
use crate::management::java::{JavaLocator, RuntimeLocator};
use crate::management::provision::{self, ConfigProvisioner, CONFIG_FILE_NAME};
use crate::management::version::VersionResolver;

/// Which branch an update took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// An artifact was present and has been deleted. Nothing was downloaded.
    StaleArtifactRemoved,
    /// No artifact was present, so the latest build was downloaded.
    Installed(BuildDescriptor),
}

/// Lifecycle operations the host drives for one server instance.
#[async_trait::async_trait]
pub trait ServerPlugin: Send + Sync {
    fn installation(&self) -> &ServerInstallation;

    async fn install(&self) -> SupervisorResult<BuildDescriptor>;

    async fn update(&self) -> SupervisorResult<UpdateOutcome>;

    async fn start(&self, redirect_console: bool) -> SupervisorResult<ProcessHandle>;

    async fn stop(&self, handle: &mut ProcessHandle) -> SupervisorResult<()>;

    fn validate_install(&self) -> bool;

    fn validate_import(&self, path: &Path) -> Validation;

    async fn remote_build(&self) -> SupervisorResult<BuildDescriptor>;

    /// The installed build is never recorded, so there is nothing to report.
    fn local_build(&self) -> Option<BuildDescriptor> {
        None
    }

    async fn create_server_config(&self) -> SupervisorResult<bool>;
}

pub struct WaterfallServer {
    installation: ServerInstallation,
    resolver: VersionResolver,
    installer: ArtifactInstaller,
    provisioner: ConfigProvisioner,
    supervisor: ProcessSupervisor,
    config_template: Url,
}

impl WaterfallServer {
    pub fn builder(installation: ServerInstallation) -> WaterfallServerBuilder {
        WaterfallServerBuilder::new(installation)
    }

    pub fn console(&self) -> &ConsoleSink {
        self.supervisor.console()
    }
}

#[async_trait::async_trait]
impl ServerPlugin for WaterfallServer {
    fn installation(&self) -> &ServerInstallation {
        &self.installation
    }

    async fn install(&self) -> SupervisorResult<BuildDescriptor> {
        self.supervisor.locate_runtime()?;

        let build = self.resolver.resolve().await?;
        self.installer
            .install(&build, &self.installation.artifact_path())
            .await?;
        info!("server {} installed build {}", self.installation.id, build);

        // a missing config does not undo a good install
        match self.create_server_config().await {
            Ok(true) => {}
            Ok(false) => warn!(
                "server {}: {} was not created",
                self.installation.id, CONFIG_FILE_NAME
            ),
            Err(err) => warn!(
                "server {}: could not create {}: {}",
                self.installation.id, CONFIG_FILE_NAME, err
            ),
        }
        Ok(build)
    }

    // FIXME: a cleanly removed jar ends the update without downloading the new build.
    // Kept on purpose until the owner confirms whether this is intended.
    async fn update(&self) -> SupervisorResult<UpdateOutcome> {
        let artifact = self.installation.artifact_path();
        if self.installer.remove_stale(&artifact).await? {
            return Ok(UpdateOutcome::StaleArtifactRemoved);
        }

        let build = self.resolver.resolve().await?;
        self.installer.install(&build, &artifact).await?;
        info!("server {} updated to build {}", self.installation.id, build);
        Ok(UpdateOutcome::Installed(build))
    }

    async fn start(&self, redirect_console: bool) -> SupervisorResult<ProcessHandle> {
        self.supervisor
            .start(&self.installation, redirect_console)
            .await
    }

    async fn stop(&self, handle: &mut ProcessHandle) -> SupervisorResult<()> {
        self.supervisor.stop(handle).await
    }

    fn validate_install(&self) -> bool {
        self.installation.artifact_path().is_file()
    }

    fn validate_import(&self, path: &Path) -> Validation {
        if self.installation.artifact_path_in(path).is_file() {
            Validation::ok()
        } else {
            Validation::invalid(format!(
                "Invalid Path! Fail to find {}",
                self.installation.artifact
            ))
        }
    }

    async fn remote_build(&self) -> SupervisorResult<BuildDescriptor> {
        self.resolver.resolve().await
    }

    async fn create_server_config(&self) -> SupervisorResult<bool> {
        let dest = self.installation.root.join(CONFIG_FILE_NAME);
        self.provisioner
            .provision(
                &self.config_template,
                &dest,
                &provision::substitutions(&self.installation),
            )
            .await
    }
}

pub struct WaterfallServerBuilder {
    installation: ServerInstallation,
    remote: Option<RemoteConfig>,
    client: Option<Client>,
    runtime: Option<Arc<dyn RuntimeLocator>>,
    console: Option<ConsoleSink>,
}

impl WaterfallServerBuilder {
    pub fn new(installation: ServerInstallation) -> Self {
        Self {
            installation,
            remote: None,
            client: None,
            runtime: None,
            console: None,
        }
    }

    pub fn remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn RuntimeLocator>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn console(mut self, console: ConsoleSink) -> Self {
        self.console = Some(console);
        self
    }

    pub fn build(self) -> anyhow::Result<WaterfallServer> {
        let remote = self.remote.unwrap_or_default();
        let client = match self.client {
            Some(client) => client,
            None => build_http_client(&remote).context("failed to build http client")?,
        };
        let runtime: Arc<dyn RuntimeLocator> = match self.runtime {
            Some(runtime) => runtime,
            None => Arc::new(JavaLocator::default()),
        };

        Ok(WaterfallServer {
            installation: self.installation,
            resolver: VersionResolver::new(client.clone(), remote.index_url),
            installer: ArtifactInstaller::new(client.clone(), remote.artifact_base_url),
            provisioner: ConfigProvisioner::new(client),
            supervisor: ProcessSupervisor::new(runtime, self.console.unwrap_or_default()),
            config_template: remote.config_template_url,
        })
    }
}
