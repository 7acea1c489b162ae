//! The embedding session: single source of truth for session state, attempt
//! counters, and last-known geometry.
//!
//! One session coordinates one embeddable external tool through
//! launch → discovery polling → embed → resize-sync → teardown, tolerating a
//! foreign, uncooperative, possibly slow-starting process. All state
//! mutation goes through session methods; collaborators only ever read.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::EmbedConfig;
use crate::diag::{DiagLevel, DiagRecord, DiagnosticsSink};
use crate::embedder::{EmbedResult, WindowEmbedder};
use crate::error::{EmbedderError, Result};
use crate::geometry::Size;
use crate::locator::{MatchCriteria, WindowLocator};
use crate::process::{ProcessExit, ProcessHandle, ProcessLauncher, sweep_by_name};
use crate::resize::ResizeSynchronizer;
use crate::window_system::{WindowHandle, WindowSystem};

/// What the session requires from its host: a reparent target, its current
/// size, and the ability to get the host window out of the way.
pub trait HostSurface: Send + Sync {
	fn container_handle(&self) -> WindowHandle;
	fn container_size(&self) -> Size;
	fn minimize_host(&self);
}

/// [`HostSurface`] backed by raw window handles resolved through the window
/// system; suits hosts that expose native handles for their widgets.
pub struct HandleHostSurface {
	ws: Arc<dyn WindowSystem>,
	container: WindowHandle,
	host_window: WindowHandle,
}

impl HandleHostSurface {
	pub fn new(ws: Arc<dyn WindowSystem>, container: WindowHandle, host_window: WindowHandle) -> Self {
		Self {
			ws,
			container,
			host_window,
		}
	}
}

impl HostSurface for HandleHostSurface {
	fn container_handle(&self) -> WindowHandle {
		self.container
	}

	fn container_size(&self) -> Size {
		// A zero size falls through the minimum-usable guard downstream.
		self.ws.client_size(self.container).unwrap_or(Size::new(0, 0))
	}

	fn minimize_host(&self) {
		if let Err(err) = self.ws.minimize(self.host_window) {
			warn!(target: "opcon.session", error = %err, "failed to minimize host window");
		}
	}
}

/// Presents candidate window titles to the user and returns the chosen
/// index, or `None` when cancelled.
pub trait WindowPicker {
	fn pick(&self, titles: &[String]) -> Option<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Idle,
	Launching,
	Polling,
	TimedOut,
	Embedded,
}

impl std::fmt::Display for SessionState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			SessionState::Idle => "idle",
			SessionState::Launching => "launching",
			SessionState::Polling => "polling",
			SessionState::TimedOut => "timed-out",
			SessionState::Embedded => "embedded",
		};
		f.write_str(name)
	}
}

#[derive(Debug)]
struct SessionShared {
	state: SessionState,
	foreign: Option<WindowHandle>,
	poll_attempts: u32,
}

struct SessionInner {
	config: EmbedConfig,
	criteria: MatchCriteria,
	ws: Arc<dyn WindowSystem>,
	host: Arc<dyn HostSurface>,
	diag: Arc<dyn DiagnosticsSink>,
	launcher: ProcessLauncher,
	locator: WindowLocator,
	embedder: WindowEmbedder,
	resize: ResizeSynchronizer,
	shared: Mutex<SessionShared>,
	process: Mutex<Option<ProcessHandle>>,
	ticker: Mutex<Option<JoinHandle<()>>>,
}

/// Clonable handle to one embedding session. Created once at host startup;
/// `teardown` (or drop) releases every timer and process resource.
#[derive(Clone)]
pub struct EmbeddingSession {
	inner: Arc<SessionInner>,
}

impl EmbeddingSession {
	pub fn new(config: EmbedConfig, ws: Arc<dyn WindowSystem>, host: Arc<dyn HostSurface>, diag: Arc<dyn DiagnosticsSink>) -> Self {
		let criteria = MatchCriteria::new(config.target_title.clone(), config.title_keywords.clone());
		let launcher = ProcessLauncher::new(&config);
		let locator = WindowLocator::new(Arc::clone(&ws));
		let embedder = WindowEmbedder::new(Arc::clone(&ws));
		let resize = ResizeSynchronizer::new(Arc::clone(&ws), Arc::clone(&host), &config);

		Self {
			inner: Arc::new(SessionInner {
				config,
				criteria,
				ws,
				host,
				diag,
				launcher,
				locator,
				embedder,
				resize,
				shared: Mutex::new(SessionShared {
					state: SessionState::Idle,
					foreign: None,
					poll_attempts: 0,
				}),
				process: Mutex::new(None),
				ticker: Mutex::new(None),
			}),
		}
	}

	/// Launches the external tool and starts discovery polling.
	///
	/// Re-entrant calls are no-ops: only an `Idle` session launches. The
	/// spawned handle is tracked before the startup grace period so a
	/// concurrent `teardown()` can reach the process; a teardown that lands
	/// during the grace wins, and the launch resolves as a quiet `Ok`. On a
	/// launch failure the session reports diagnostics, rests in `Idle`, and
	/// returns the typed error.
	pub async fn launch(&self) -> Result<()> {
		{
			let mut shared = self.inner.shared.lock();
			if shared.state != SessionState::Idle {
				debug!(target: "opcon.session", state = %shared.state, "launch ignored, session not idle");
				return Ok(());
			}
			shared.state = SessionState::Launching;
		}
		self.inner.diag.emit(DiagRecord::new(
			DiagLevel::Info,
			format!("launching {}", self.inner.config.executable.display()),
		));

		let handle = match self.inner.launcher.spawn(&self.inner.config.executable).await {
			Ok(handle) => handle,
			Err(err) => {
				let message = match &err {
					EmbedderError::Launch { stderr, .. } => format!("launch failed: {}", excerpt(stderr)),
					other => format!("launch failed: {other}"),
				};
				self.inner.transition(SessionState::Idle, DiagLevel::Error, message);
				return Err(err);
			}
		};
		let pid = handle.pid();
		*self.inner.process.lock() = Some(handle);

		tokio::time::sleep(self.inner.config.launch_grace()).await;

		if self.inner.shared.lock().state != SessionState::Launching {
			// Torn down while waiting out the grace; teardown usually already
			// took the handle, but a settle-window race can leave it behind.
			let leftover = self.inner.process.lock().take();
			if let Some(handle) = leftover {
				self.inner.launcher.terminate(handle).await;
			}
			debug!(target: "opcon.session", "launch overtaken by teardown");
			return Ok(());
		}

		if let Some(exit) = self.inner.poll_process_exit() {
			self.inner.transition(
				SessionState::Idle,
				DiagLevel::Error,
				format!("launch failed (exit code {:?}): {}", exit.exit_code, excerpt(&exit.stderr)),
			);
			return Err(EmbedderError::Launch {
				executable: self.inner.config.executable.display().to_string(),
				exit_code: exit.exit_code,
				stdout: exit.stdout,
				stderr: exit.stderr,
			});
		}

		self.inner.shared.lock().poll_attempts = 0;
		self.inner
			.transition(SessionState::Polling, DiagLevel::Info, format!("process started (pid {pid}), polling for window"));
		SessionInner::start_ticker(&self.inner);
		Ok(())
	}

	/// Runs the manual-selection fallback after a discovery timeout.
	///
	/// Returns `Ok(true)` when the chosen window was embedded. Declining tears
	/// the session down to `Idle`; an empty window list means the timeout
	/// cannot be recovered, so it tears down and surfaces as
	/// [`EmbedderError::DiscoveryTimeout`]; an embed failure is reported,
	/// tears down, and returns the typed error.
	pub async fn select_manually(&self, picker: &dyn WindowPicker) -> Result<bool> {
		{
			let shared = self.inner.shared.lock();
			if shared.state != SessionState::TimedOut {
				debug!(target: "opcon.session", state = %shared.state, "manual selection ignored outside timed-out state");
				return Ok(false);
			}
		}

		let candidates = self.inner.locator.enumerate_all();
		if candidates.is_empty() {
			// Attempts reset on teardown; read them while they still count.
			let attempts = self.inner.shared.lock().poll_attempts;
			self.inner
				.diag
				.emit(DiagRecord::new(DiagLevel::Warning, "no windows available for manual selection"));
			self.teardown().await;
			return Err(EmbedderError::DiscoveryTimeout { attempts });
		}

		let titles: Vec<String> = candidates.iter().map(|c| c.title.clone()).collect();
		let Some(index) = picker.pick(&titles).filter(|i| *i < candidates.len()) else {
			self.inner.diag.emit(DiagRecord::new(DiagLevel::Info, "manual selection declined"));
			self.teardown().await;
			return Ok(false);
		};

		let chosen = &candidates[index];
		match self
			.inner
			.embedder
			.embed(chosen.handle, self.inner.host.container_handle(), self.inner.host.container_size())
		{
			EmbedResult::Embedded => {
				self.inner.finish_embed(chosen.handle, &chosen.title);
				// Liveness watching resumes for the embedded window.
				SessionInner::start_ticker(&self.inner);
				Ok(true)
			}
			EmbedResult::Failed { reason } => {
				self.inner
					.diag
					.emit(DiagRecord::new(DiagLevel::Error, format!("manual embed failed: {reason}")));
				self.teardown().await;
				Err(EmbedderError::Embed { reason })
			}
		}
	}

	/// Stops every timer, terminates the process, closes the foreign window,
	/// and resets to `Idle`. Safe to call repeatedly.
	pub async fn teardown(&self) {
		// Timers stop first so a stale tick cannot act on cleared handles.
		self.inner.stop_ticker();
		self.inner.resize.disarm();

		let process = self.inner.process.lock().take();
		let (foreign, state_before) = {
			let mut shared = self.inner.shared.lock();
			shared.poll_attempts = 0;
			let state_before = shared.state;
			// Claim the end state up front: an in-flight launch that resumes
			// while the process is being terminated must observe the teardown.
			shared.state = SessionState::Idle;
			(shared.foreign.take(), state_before)
		};
		let was_active = process.is_some() || foreign.is_some() || state_before != SessionState::Idle;

		if let Some(handle) = process {
			self.inner.launcher.terminate(handle).await;
		} else if was_active {
			// The tracked handle may not reflect orphaned instances.
			sweep_by_name(&self.inner.config.executable);
		}

		if let Some(window) = foreign {
			self.inner.ws.close_window(window);
		}

		if state_before != SessionState::Idle {
			self.inner.transition(SessionState::Idle, DiagLevel::Info, "session closed".to_string());
		}
	}

	/// Gives up on embedding: maximizes the foreign window as an independent
	/// top-level window again and minimizes the host. Reparent and style
	/// state are left as they are.
	pub fn detach_to_foreground(&self) -> Result<()> {
		let foreign = self.inner.shared.lock().foreign;
		let Some(window) = foreign else {
			warn!(target: "opcon.session", "detach requested without an embedded window");
			return Err(EmbedderError::Embed {
				reason: "no embedded window to detach".to_string(),
			});
		};

		self.inner.ws.maximize(window)?;
		self.inner.host.minimize_host();
		self.inner
			.diag
			.emit(DiagRecord::new(DiagLevel::Info, "foreign window detached to foreground, host minimized"));
		Ok(())
	}

	pub fn on_container_resized(&self, size: Size) {
		self.inner.resize.on_container_resized(size);
	}

	pub fn on_host_resized(&self) {
		self.inner.resize.on_host_resized();
	}

	pub fn on_tab_activated(&self) {
		self.inner.resize.on_tab_activated();
	}

	pub fn state(&self) -> SessionState {
		self.inner.shared.lock().state
	}

	pub fn is_embedded(&self) -> bool {
		self.state() == SessionState::Embedded
	}

	pub fn poll_attempts(&self) -> u32 {
		self.inner.shared.lock().poll_attempts
	}

	pub fn last_synced_size(&self) -> Option<Size> {
		self.inner.resize.last_synced()
	}
}

impl SessionInner {
	/// Moves to `next` and emits exactly one diagnostic record for it.
	fn transition(&self, next: SessionState, level: DiagLevel, message: String) {
		let prev = {
			let mut shared = self.shared.lock();
			let prev = shared.state;
			shared.state = next;
			prev
		};
		debug!(target: "opcon.session", from = %prev, to = %next, "state transition");
		self.diag.emit(DiagRecord::new(level, message));
	}

	fn start_ticker(inner: &Arc<Self>) {
		let interval = inner.config.poll_interval();

		let mut slot = inner.ticker.lock();
		if let Some(old) = slot.take() {
			old.abort();
		}
		let inner = Arc::clone(inner);
		*slot = Some(tokio::spawn(async move {
			loop {
				tokio::time::sleep(interval).await;
				if !inner.tick() {
					break;
				}
			}
		}));
	}

	fn stop_ticker(&self) {
		if let Some(task) = self.ticker.lock().take() {
			task.abort();
		}
	}

	/// One cooperative scheduler tick. Returns `false` when the ticker
	/// should stop.
	fn tick(&self) -> bool {
		let state = self.shared.lock().state;
		match state {
			SessionState::Polling => self.tick_polling(),
			SessionState::Embedded => self.tick_embedded(),
			_ => false,
		}
	}

	fn tick_polling(&self) -> bool {
		// Within a tick: liveness, then attempt accounting, then discovery.
		if let Some(exit) = self.poll_process_exit() {
			self.transition(
				SessionState::Idle,
				DiagLevel::Error,
				format!("process exited during discovery (exit code {:?}): {}", exit.exit_code, excerpt(&exit.stderr)),
			);
			return false;
		}

		let attempts = {
			let mut shared = self.shared.lock();
			shared.poll_attempts += 1;
			shared.poll_attempts
		};
		if attempts > self.config.poll_limit {
			self.transition(
				SessionState::TimedOut,
				DiagLevel::Warning,
				format!("no matching window after {} attempts, manual selection available", attempts - 1),
			);
			return false;
		}

		let Some(candidate) = self.locator.poll_once(&self.criteria) else {
			return true;
		};

		match self.embedder.embed(candidate.handle, self.host.container_handle(), self.host.container_size()) {
			EmbedResult::Embedded => {
				self.finish_embed(candidate.handle, &candidate.title);
				true
			}
			EmbedResult::Failed { reason } => {
				// Self-healing: stay in Polling and retry next tick.
				self.diag
					.emit(DiagRecord::new(DiagLevel::Warning, format!("embed attempt failed ({reason}), retrying")));
				true
			}
		}
	}

	fn tick_embedded(&self) -> bool {
		let Some(exit) = self.poll_process_exit() else {
			return true;
		};
		self.resize.disarm();
		self.shared.lock().foreign = None;
		self.transition(
			SessionState::Idle,
			DiagLevel::Warning,
			format!("foreign process exited (exit code {:?})", exit.exit_code),
		);
		false
	}

	fn finish_embed(&self, window: WindowHandle, title: &str) {
		self.shared.lock().foreign = Some(window);
		self.transition(SessionState::Embedded, DiagLevel::Info, format!("embedded window \"{title}\""));
		self.resize.arm(window);
		self.resize.schedule_delayed_resync();
	}

	fn poll_process_exit(&self) -> Option<ProcessExit> {
		let mut guard = self.process.lock();
		let exit = guard.as_mut()?.try_exit();
		if exit.is_some() {
			*guard = None;
		}
		exit
	}
}

impl Drop for SessionInner {
	fn drop(&mut self) {
		if let Some(task) = self.ticker.get_mut().take() {
			task.abort();
		}
	}
}

/// Trims captured stderr to something a log line can carry.
fn excerpt(text: &str) -> String {
	let trimmed = text.trim();
	if trimmed.is_empty() {
		return "<no output>".to_string();
	}
	trimmed.chars().take(200).collect()
}
