//! One-shot adoption of a located foreign window into the host container.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::EmbedderError;
use crate::geometry::Size;
use crate::window_system::{WindowHandle, WindowSystem};

/// Outcome of an embed attempt. Failures carry a reason and never propagate
/// as faults; a failed embed must not crash the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedResult {
	Embedded,
	Failed { reason: String },
}

impl EmbedResult {
	pub fn is_embedded(&self) -> bool {
		matches!(self, EmbedResult::Embedded)
	}
}

/// Performs the reparent + chrome-strip + initial placement sequence.
#[derive(Clone)]
pub struct WindowEmbedder {
	ws: Arc<dyn WindowSystem>,
}

impl WindowEmbedder {
	pub fn new(ws: Arc<dyn WindowSystem>) -> Self {
		Self { ws }
	}

	/// Embeds `foreign` into `container` at `target` size.
	///
	/// Order matters: the show-state is normalized before the reparent so the
	/// OS is not asked to adopt a minimized or maximized window, and the
	/// placement carries the frame-changed flag so the stripped style takes
	/// effect immediately. A rejected reparent leaves the window untouched;
	/// failures after the reparent are caught and reported, not raised.
	pub fn embed(&self, foreign: WindowHandle, container: WindowHandle, target: Size) -> EmbedResult {
		if let Err(err) = self.ws.restore(foreign) {
			// Not fatal: a window that refuses SW_RESTORE may still reparent.
			debug!(target: "opcon.embed", window = foreign.0, error = %err, "restore before reparent failed");
		}

		if self.ws.reparent(foreign, container).is_err() {
			warn!(target: "opcon.embed", window = foreign.0, "reparent rejected by window system");
			return EmbedResult::Failed {
				reason: "reparent-rejected".to_string(),
			};
		}

		if let Err(err) = self.try_finish(foreign, target) {
			warn!(target: "opcon.embed", window = foreign.0, error = %err, "embed failed after reparent");
			return EmbedResult::Failed {
				reason: err.to_string(),
			};
		}

		debug!(target: "opcon.embed", window = foreign.0, size = %target, "window embedded");
		EmbedResult::Embedded
	}

	fn try_finish(&self, foreign: WindowHandle, target: Size) -> Result<(), EmbedderError> {
		self.ws.strip_chrome(foreign)?;
		self.ws.place(foreign, target)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::window_system::fake::{FakeWindowSystem, WindowCall};

	fn setup() -> (FakeWindowSystem, WindowEmbedder, WindowHandle, WindowHandle) {
		let ws = FakeWindowSystem::new();
		let foreign = ws.add_window("Target App");
		let container = ws.add_window("Host Container");
		let embedder = WindowEmbedder::new(Arc::new(ws.clone()));
		(ws, embedder, foreign, container)
	}

	#[test]
	fn embeds_with_restore_reparent_strip_place_order() {
		let (ws, embedder, foreign, container) = setup();

		let result = embedder.embed(foreign, container, Size::new(800, 600));
		assert!(result.is_embedded());
		assert_eq!(
			ws.calls(),
			vec![
				WindowCall::Restore(foreign),
				WindowCall::Reparent {
					window: foreign,
					parent: container
				},
				WindowCall::StripChrome(foreign),
				WindowCall::Place {
					window: foreign,
					size: Size::new(800, 600)
				},
			]
		);
	}

	#[test]
	fn rejected_reparent_leaves_window_untouched() {
		let (ws, embedder, foreign, container) = setup();
		ws.set_fail_reparent(true);

		let result = embedder.embed(foreign, container, Size::new(800, 600));
		assert_eq!(
			result,
			EmbedResult::Failed {
				reason: "reparent-rejected".to_string()
			}
		);
		assert!(!ws.chrome_stripped(foreign));
		assert!(ws.placements().is_empty());
	}

	#[test]
	fn strip_failure_surfaces_as_failed_without_panicking() {
		let (ws, embedder, foreign, container) = setup();
		ws.set_fail_strip(true);

		match embedder.embed(foreign, container, Size::new(800, 600)) {
			EmbedResult::Failed { reason } => assert!(reason.contains("SetWindowLong")),
			other => panic!("expected failure, got {other:?}"),
		}
		assert!(ws.placements().is_empty());
	}

	#[test]
	fn place_failure_surfaces_as_failed() {
		let (ws, embedder, foreign, container) = setup();
		ws.set_fail_place(true);

		match embedder.embed(foreign, container, Size::new(800, 600)) {
			EmbedResult::Failed { reason } => assert!(reason.contains("SetWindowPos")),
			other => panic!("expected failure, got {other:?}"),
		}
		// Reparent and strip already happened; retry next tick is the
		// session's job.
		assert_eq!(ws.parent_of(foreign), Some(container));
	}
}
