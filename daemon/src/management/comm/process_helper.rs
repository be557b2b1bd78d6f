use std::io;
#[cfg(unix)]
use nix::sys::signal::{kill, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
#[cfg(windows)]
use winapi::shared::minwindef::FALSE;
#[cfg(windows)]
use winapi::um::handleapi::CloseHandle;
#[cfg(windows)]
use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
#[cfg(windows)]
use winapi::um::winnt::PROCESS_TERMINATE;

/// Out-of-band stop for children whose stdin is not ours to write to.
pub struct ProcessHelper;

impl ProcessHelper {
    /// Sends SIGTERM (Unix) or terminates the process (Windows).
    ///
    /// Returns as soon as the request is delivered.
    pub fn terminate(pid: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            let pid = i32::try_from(pid)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
            kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
        }
        #[cfg(windows)]
        {
            let handle = unsafe { OpenProcess(PROCESS_TERMINATE, FALSE, pid) };
            if handle.is_null() {
                return Err(io::Error::last_os_error());
            }
            let result = unsafe { TerminateProcess(handle, 1) };
            unsafe { CloseHandle(handle) };
            if result == 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn terminate_stops_sleeping_child() {
        let mut child = tokio::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();

        ProcessHelper::terminate(child.id().unwrap()).unwrap();

        let status = tokio::time::timeout(std::time::Duration::from_secs(10), child.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!status.success());
    }
}
