//! Lifecycle of the external executable: pre-launch cleanup, spawn with
//! captured stdio, grace-period liveness, and idempotent termination.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::EmbedConfig;
use crate::error::{EmbedderError, Result};

/// Exit information collected from a dead foreign process.
#[derive(Debug, Clone)]
pub struct ProcessExit {
	pub exit_code: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

/// Owns the spawned child; exactly one session owns a handle at a time.
#[derive(Debug)]
pub struct ProcessHandle {
	child: Child,
	pid: u32,
	executable: PathBuf,
}

impl ProcessHandle {
	pub fn pid(&self) -> u32 {
		self.pid
	}

	/// Non-blocking liveness probe; returns exit details once the process is
	/// gone. Probe errors are treated as "still alive" and retried next tick.
	pub fn try_exit(&mut self) -> Option<ProcessExit> {
		match self.child.try_wait() {
			Ok(Some(status)) => {
				let (stdout, stderr) = self.drain_output();
				Some(ProcessExit {
					exit_code: status.code(),
					stdout,
					stderr,
				})
			}
			Ok(None) => None,
			Err(err) => {
				debug!(target: "opcon.process", error = %err, "liveness probe failed");
				None
			}
		}
	}

	/// Reads whatever the dead process left on its piped stdio.
	fn drain_output(&mut self) -> (String, String) {
		let mut stdout = String::new();
		let mut stderr = String::new();
		if let Some(mut pipe) = self.child.stdout.take() {
			let _ = pipe.read_to_string(&mut stdout);
		}
		if let Some(mut pipe) = self.child.stderr.take() {
			let _ = pipe.read_to_string(&mut stderr);
		}
		(stdout, stderr)
	}
}

/// Starts and stops the external tool with the settle timing from
/// [`EmbedConfig`].
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
	settle: Duration,
}

impl ProcessLauncher {
	pub fn new(config: &EmbedConfig) -> Self {
		Self {
			settle: config.kill_settle(),
		}
	}

	/// Spawns `executable` with its own directory as cwd and piped stdio.
	///
	/// Any already-running instance of the same executable is killed first to
	/// avoid duplicate or zombie instances. Judging whether the new process
	/// survives its startup grace period is the caller's job, via
	/// [`ProcessHandle::try_exit`].
	pub async fn spawn(&self, executable: &Path) -> Result<ProcessHandle> {
		if sweep_by_name(executable) {
			debug!(target: "opcon.process", "killed stale instance, settling");
			tokio::time::sleep(self.settle).await;
		}

		// Many native tools resolve sibling configuration files relative to
		// their working directory.
		let workdir = executable.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));

		let child = Command::new(executable)
			.current_dir(workdir)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.map_err(|e| EmbedderError::Launch {
				executable: executable.display().to_string(),
				exit_code: None,
				stdout: String::new(),
				stderr: format!("failed to spawn: {e}"),
			})?;

		let pid = child.id();
		debug!(target: "opcon.process", pid, executable = %executable.display(), "process started");

		Ok(ProcessHandle {
			child,
			pid,
			executable: executable.to_path_buf(),
		})
	}

	/// Terminates the tracked process: graceful signal, bounded wait,
	/// forceful kill, then a by-name sweep for orphaned instances the handle
	/// does not reflect.
	pub async fn terminate(&self, mut handle: ProcessHandle) {
		signal_graceful(handle.pid);

		for _ in 0..8 {
			if matches!(handle.child.try_wait(), Ok(Some(_))) {
				break;
			}
			tokio::time::sleep(Duration::from_millis(250)).await;
		}

		if !matches!(handle.child.try_wait(), Ok(Some(_))) {
			if let Err(err) = handle.child.kill() {
				warn!(target: "opcon.process", pid = handle.pid, error = %err, "kill failed");
			}
		}
		// Reap so the OS entry is released before the sweep runs.
		let _ = handle.child.wait();

		sweep_by_name(&handle.executable);
	}
}

/// Kills every running instance of `executable` by image name. Returns
/// `true` when at least one instance was killed.
pub fn sweep_by_name(executable: &Path) -> bool {
	let Some(name) = executable.file_name().and_then(|n| n.to_str()) else {
		return false;
	};

	#[cfg(windows)]
	{
		Command::new("taskkill")
			.args(["/F", "/IM", name])
			.output()
			.map(|output| output.status.success())
			.unwrap_or(false)
	}

	#[cfg(unix)]
	{
		Command::new("pkill")
			.args(["-x", name])
			.output()
			.map(|output| output.status.success())
			.unwrap_or(false)
	}

	#[cfg(not(any(unix, windows)))]
	{
		false
	}
}

fn signal_graceful(pid: u32) {
	#[cfg(windows)]
	{
		// Without /F this posts WM_CLOSE instead of terminating outright.
		let _ = Command::new("taskkill").args(["/PID", &pid.to_string()]).output();
	}

	#[cfg(unix)]
	{
		let _ = Command::new("kill").args(["-TERM", &pid.to_string()]).output();
	}

	#[cfg(not(any(unix, windows)))]
	{
		let _ = pid;
	}
}
