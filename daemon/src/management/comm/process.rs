use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use waterfall_protocol::management::instance::{ProcessStatus, ServerInstallation};

use crate::management::comm::{ConsoleSink, ProcessHelper};
use crate::management::error::{SupervisorError, SupervisorResult};
use crate::management::java::RuntimeLocator;

/// Line the server reads as "shut down gracefully".
pub const STOP_COMMAND: &str = "end";
const NO_GUI_FLAG: &str = "nogui";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;
#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x00000010;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStartInfo {
    pub target: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl ProcessStartInfo {
    /// `<runtime> <launch args...> -jar <artifact> nogui`, run inside the instance root.
    pub fn for_installation(runtime: PathBuf, inst: &ServerInstallation) -> Self {
        let mut args = Vec::with_capacity(inst.arguments.len() + 3);
        args.extend_from_slice(inst.arguments.as_slice());
        args.push("-jar".into());
        args.push(inst.artifact.clone());
        args.push(NO_GUI_FLAG.into());
        Self {
            target: runtime,
            args,
            working_dir: inst.root.clone(),
        }
    }
}

/// A running (or recently running) server process.
///
/// Stays usable after the process exits; `status()` then reports `NotRunning`.
pub struct ProcessHandle {
    child: Child,
    redirected: bool,
    stdin: Option<ChildStdin>,
    readers: Vec<JoinHandle<()>>,
}

impl ProcessHandle {
    /// The os process id, or `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether stdio is piped through the console sink.
    pub fn is_redirected(&self) -> bool {
        self.redirected
    }

    pub fn status(&mut self) -> ProcessStatus {
        match self.child.try_wait() {
            Ok(None) => ProcessStatus::Running,
            Ok(Some(_)) => ProcessStatus::NotRunning,
            Err(err) => {
                warn!("could not poll process (pid={:?}): {}", self.id(), err);
                ProcessStatus::NotRunning
            }
        }
    }

    /// Waits for the process to exit and for both console readers to drain.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }
        Ok(status)
    }

    /// Forcefully kills the process and reaps it.
    pub async fn kill(&mut self) -> SupervisorResult<()> {
        let pid = self.id();
        self.child.kill().await.map_err(|err| {
            SupervisorError::ProcessControl(format!(
                "could not kill process (pid={:?}): {}",
                pid, err
            ))
        })
    }

    pub async fn send_line(&mut self, line: &str) -> SupervisorResult<()> {
        let pid = self.child.id();
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            SupervisorError::ProcessControl("process stdin is not redirected".into())
        })?;
        let write = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        };
        write.await.map_err(|err| {
            SupervisorError::ProcessControl(format!(
                "could not write to process (pid={:?}): {}",
                pid, err
            ))
        })
    }
}

/// Spawns the server and forwards its output, one instance at a time.
pub struct ProcessSupervisor {
    runtime: Arc<dyn RuntimeLocator>,
    console: ConsoleSink,
}

impl ProcessSupervisor {
    pub fn new(runtime: Arc<dyn RuntimeLocator>, console: ConsoleSink) -> Self {
        Self { runtime, console }
    }

    pub fn console(&self) -> &ConsoleSink {
        &self.console
    }

    pub fn locate_runtime(&self) -> SupervisorResult<PathBuf> {
        self.runtime
            .locate()
            .ok_or_else(|| SupervisorError::DependencyMissing("Java is not installed".into()))
    }

    pub async fn start(
        &self,
        inst: &ServerInstallation,
        redirect_console: bool,
    ) -> SupervisorResult<ProcessHandle> {
        let start_info = ProcessStartInfo::for_installation(self.locate_runtime()?, inst);
        debug!("starting {:?}", start_info);

        let mut cmd = Command::new(&start_info.target);
        cmd.args(&start_info.args)
            .current_dir(&start_info.working_dir);
        if redirect_console {
            cmd.stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            // keep terminal Ctrl-C away from the child, it is stopped through stdin
            #[cfg(unix)]
            cmd.process_group(0);
            #[cfg(windows)]
            cmd.creation_flags(CREATE_NO_WINDOW);
        } else {
            #[cfg(windows)]
            cmd.creation_flags(CREATE_NEW_CONSOLE);
        }

        let mut child = cmd.spawn().map_err(SupervisorError::ProcessStart)?;
        info!("server {} started (pid={:?})", inst.id, child.id());

        let mut readers = vec![];
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, self.console.clone(), "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, self.console.clone(), "stderr"));
        }

        Ok(ProcessHandle {
            stdin: child.stdin.take(),
            child,
            redirected: redirect_console,
            readers,
        })
    }

    /// Asks the server to shut down: request sent, not confirmed.
    ///
    /// Never waits for the exit; use [`ProcessHandle::wait`] or the host's own
    /// exit detection for that.
    pub async fn stop(&self, handle: &mut ProcessHandle) -> SupervisorResult<()> {
        if handle.redirected {
            handle.send_line(STOP_COMMAND).await?;
        } else {
            // no window to message here, ask the os instead.
            // a reaped child has no id, so a recycled pid is never signalled
            let pid = handle.id().ok_or_else(|| {
                SupervisorError::ProcessControl("process has already exited".into())
            })?;
            ProcessHelper::terminate(pid).map_err(|err| {
                SupervisorError::ProcessControl(format!(
                    "could not terminate process (pid={}): {}",
                    pid, err
                ))
            })?;
        }
        debug!("stop requested (pid={:?})", handle.id());
        Ok(())
    }
}

/// Pushes every line of `stream` to `console` until the stream closes.
fn spawn_reader<R>(stream: R, console: ConsoleSink, name: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    console.push(String::from_utf8_lossy(&buf).into_owned());
                }
                Err(err) => {
                    debug!("{} closed: {}", name, err);
                    break;
                }
            }
        }
    })
}
