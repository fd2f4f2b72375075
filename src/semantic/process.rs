//! Lifecycle of the external converter process.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Errors raised while managing the converter process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The executable could not be launched.
    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The termination signal could not be delivered.
    #[error("failed to signal process {pid}: {message}")]
    Signal { pid: u32, message: String },

    /// Waiting for the process to exit failed.
    #[error("failed to wait for process exit: {0}")]
    Wait(#[source] std::io::Error),
}

/// What [`ProcessHandle::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new process was launched.
    Spawned { pid: Option<u32> },
    /// A live process was already recorded; nothing was launched.
    AlreadyRunning { pid: Option<u32> },
}

/// What [`ProcessHandle::stop`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No process was recorded.
    NotRunning,
    /// The recorded process had already exited on its own.
    AlreadyExited(ExitStatus),
    /// The process was terminated by this call.
    Stopped(ExitStatus),
}

/// Zero-or-one running converter process.
pub struct ProcessHandle {
    child: Mutex<Option<Child>>,
    grace: Duration,
    spawned: AtomicUsize,
}

impl ProcessHandle {
    /// `grace` bounds how long stop waits after SIGTERM before killing.
    pub fn new(grace: Duration) -> Self {
        Self {
            child: Mutex::new(None),
            grace,
            spawned: AtomicUsize::new(0),
        }
    }

    /// Number of processes launched over the lifetime of this handle.
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }

    /// Whether a live process is currently recorded.
    pub async fn is_running(&self) -> bool {
        let mut slot = self.child.lock().await;
        match slot.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Launch `program` unless a live process is already recorded.
    ///
    /// A recorded process that has exited is reaped and replaced. Output of
    /// the new process is forwarded line by line to the service log.
    pub async fn start(&self, program: &Path, args: &[String]) -> Result<StartOutcome, ProcessError> {
        let mut slot = self.child.lock().await;

        if let Some(child) = slot.as_mut() {
            match child.try_wait() {
                Ok(None) => {
                    info!("Converter is already running (pid {:?})", child.id());
                    return Ok(StartOutcome::AlreadyRunning { pid: child.id() });
                }
                Ok(Some(status)) => {
                    debug!("Previous converter exited with {}", status);
                    *slot = None;
                }
                Err(e) => {
                    warn!("Could not query converter state, treating it as running: {}", e);
                    return Ok(StartOutcome::AlreadyRunning { pid: child.id() });
                }
            }
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, true));
        }

        let pid = child.id();
        info!("Started converter {:?} (pid {:?}) with {:?}", program, pid, args);
        self.spawned.fetch_add(1, Ordering::Relaxed);
        *slot = Some(child);

        Ok(StartOutcome::Spawned { pid })
    }

    /// Terminate the recorded process, if any.
    ///
    /// The record is cleared on every path, including errors, so a process
    /// that cannot be reaped never blocks the next start. A process dropped
    /// on an error path, or by cancelling this call, is killed.
    pub async fn stop(&self) -> Result<StopOutcome, ProcessError> {
        let mut slot = self.child.lock().await;
        let Some(mut child) = slot.take() else {
            debug!("No converter process to stop");
            return Ok(StopOutcome::NotRunning);
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!("Converter had already exited with {}", status);
            return Ok(StopOutcome::AlreadyExited(status));
        }

        if let Err(e) = send_terminate(&mut child) {
            let _ = child.start_kill();
            return Err(e);
        }

        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(Ok(status)) => {
                info!("Converter stopped with {}", status);
                Ok(StopOutcome::Stopped(status))
            }
            Ok(Err(e)) => Err(ProcessError::Wait(e)),
            Err(_) => {
                warn!(
                    "Converter did not exit within {:?} of SIGTERM, killing it",
                    self.grace
                );
                child.kill().await.map_err(ProcessError::Wait)?;
                let status = child.wait().await.map_err(ProcessError::Wait)?;
                Ok(StopOutcome::Stopped(status))
            }
        }
    }
}

/// Resolve an executable: paths are checked as given, bare names via `PATH`.
pub fn locate_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    which::which(program).ok()
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> Result<(), ProcessError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(|e| ProcessError::Signal {
        pid,
        message: e.to_string(),
    })
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> Result<(), ProcessError> {
    let pid = child.id().unwrap_or_default();
    child.start_kill().map_err(|e| ProcessError::Signal {
        pid,
        message: e.to_string(),
    })
}

async fn forward_output<R>(reader: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_stderr => warn!(target: "converter", "{}", line),
            Ok(Some(line)) => info!(target: "converter", "{}", line),
            Ok(None) => break,
            Err(e) => {
                debug!("Converter output closed: {}", e);
                break;
            }
        }
    }
}
