//! Debounced propagation of container geometry to the embedded window.
//!
//! OS resize notifications fire at high frequency during a drag; reapplying
//! window placement on every event is wasteful and visually jittery. Each
//! trigger source therefore restarts a short debounce timer and only the
//! last requested size before the timer fires is ever applied.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{trace, warn};

use crate::config::EmbedConfig;
use crate::error::EmbedderError;
use crate::geometry::Size;
use crate::session::HostSurface;
use crate::window_system::{WindowHandle, WindowSystem};

/// Which event source asked for a resync; each has its own debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTrigger {
	Container,
	Host,
	TabActivated,
}

/// Pending debounce token, superseded by newer requests (last write wins).
#[derive(Debug, Clone, Copy)]
pub struct ResizeRequest {
	pub target: Size,
	pub scheduled_at: Instant,
}

#[derive(Default)]
struct ResizeShared {
	window: Option<WindowHandle>,
	pending: Option<ResizeRequest>,
	last_synced: Option<Size>,
}

struct ResizeInner {
	ws: Arc<dyn WindowSystem>,
	shared: Mutex<ResizeShared>,
	min_usable: i32,
}

impl ResizeInner {
	fn apply_pending(&self) {
		let (window, request) = {
			let mut shared = self.shared.lock();
			(shared.window, shared.pending.take())
		};
		let (Some(window), Some(request)) = (window, request) else {
			return;
		};
		self.apply(window, request.target);
	}

	fn apply(&self, window: WindowHandle, target: Size) {
		if !target.is_usable(self.min_usable) {
			trace!(target: "opcon.resize", size = %target, "target below minimum usable size, dropped");
			return;
		}
		// The foreign window may have been closed independently.
		if !self.ws.is_visible(window) {
			trace!(target: "opcon.resize", window = window.0, "window not visible, skipping resync");
			return;
		}
		match self.ws.place(window, target) {
			Ok(()) => {
				self.shared.lock().last_synced = Some(target);
				trace!(target: "opcon.resize", window = window.0, size = %target, "bounds resynced");
			}
			// Failing to resize is not fatal to the embedding.
			Err(err) => {
				let err = EmbedderError::Resize { reason: err.to_string() };
				warn!(target: "opcon.resize", window = window.0, error = %err, "resync placement failed");
			}
		}
	}
}

/// Keeps an embedded window's bounds equal to its container's bounds.
pub struct ResizeSynchronizer {
	inner: Arc<ResizeInner>,
	host: Arc<dyn HostSurface>,
	container_delay: Duration,
	host_delay: Duration,
	activation_delay: Duration,
	resync_delay: Duration,
	debounce_task: Mutex<Option<JoinHandle<()>>>,
	resync_task: Mutex<Option<JoinHandle<()>>>,
}

impl ResizeSynchronizer {
	pub fn new(ws: Arc<dyn WindowSystem>, host: Arc<dyn HostSurface>, config: &EmbedConfig) -> Self {
		Self {
			inner: Arc::new(ResizeInner {
				ws,
				shared: Mutex::new(ResizeShared::default()),
				min_usable: config.min_usable_px,
			}),
			host,
			container_delay: Duration::from_millis(config.container_debounce_ms),
			host_delay: Duration::from_millis(config.host_debounce_ms),
			activation_delay: Duration::from_millis(config.activation_debounce_ms),
			resync_delay: Duration::from_millis(config.resync_delay_ms),
			debounce_task: Mutex::new(None),
			resync_task: Mutex::new(None),
		}
	}

	/// Starts synchronizing `window`; stays armed for the life of the embed.
	pub fn arm(&self, window: WindowHandle) {
		self.inner.shared.lock().window = Some(window);
	}

	/// Stops all timers and forgets the window and recorded geometry.
	pub fn disarm(&self) {
		Self::cancel(&self.debounce_task);
		Self::cancel(&self.resync_task);
		let mut shared = self.inner.shared.lock();
		shared.window = None;
		shared.pending = None;
		shared.last_synced = None;
	}

	pub fn on_container_resized(&self, size: Size) {
		self.schedule(ResizeTrigger::Container, size);
	}

	pub fn on_host_resized(&self) {
		self.schedule(ResizeTrigger::Host, self.host.container_size());
	}

	pub fn on_tab_activated(&self) {
		self.schedule(ResizeTrigger::TabActivated, self.host.container_size());
	}

	/// One-shot re-application shortly after an embed: some native tools
	/// resize their own client content asynchronously after first becoming a
	/// child window, so a single immediate placement is not always enough.
	pub fn schedule_delayed_resync(&self) {
		let inner = Arc::clone(&self.inner);
		let host = Arc::clone(&self.host);
		let delay = self.resync_delay;

		let mut slot = self.resync_task.lock();
		if let Some(old) = slot.take() {
			old.abort();
		}
		*slot = Some(tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			let window = inner.shared.lock().window;
			if let Some(window) = window {
				inner.apply(window, host.container_size());
			}
		}));
	}

	/// Last geometry actually applied to the embedded window.
	pub fn last_synced(&self) -> Option<Size> {
		self.inner.shared.lock().last_synced
	}

	fn schedule(&self, trigger: ResizeTrigger, target: Size) {
		{
			let mut shared = self.inner.shared.lock();
			if shared.window.is_none() {
				return;
			}
			// Undersized targets occur transiently during panel re-layout
			// and are ignored entirely, not merely deferred.
			if !target.is_usable(self.inner.min_usable) {
				trace!(target: "opcon.resize", ?trigger, size = %target, "ignoring undersized resize");
				return;
			}
			shared.pending = Some(ResizeRequest {
				target,
				scheduled_at: Instant::now(),
			});
		}

		let delay = match trigger {
			ResizeTrigger::Container => self.container_delay,
			ResizeTrigger::Host => self.host_delay,
			ResizeTrigger::TabActivated => self.activation_delay,
		};

		// Idempotent start: cancel-then-start, so a burst of events keeps
		// pushing the deadline out and collapses into one application.
		let inner = Arc::clone(&self.inner);
		let mut slot = self.debounce_task.lock();
		if let Some(old) = slot.take() {
			old.abort();
		}
		*slot = Some(tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			inner.apply_pending();
		}));
	}

	fn cancel(slot: &Mutex<Option<JoinHandle<()>>>) {
		if let Some(task) = slot.lock().take() {
			task.abort();
		}
	}
}

impl Drop for ResizeSynchronizer {
	fn drop(&mut self) {
		Self::cancel(&self.debounce_task);
		Self::cancel(&self.resync_task);
	}
}
