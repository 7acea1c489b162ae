//! Seam between the embedding logic and the OS window registry.
//!
//! Everything the session needs from the window manager goes through
//! [`WindowSystem`], so the state machine, locator, embedder, and resize
//! synchronizer all run unchanged against the in-memory [`fake`] backend.
//! The Win32 backend lives in [`win32`] and is only compiled on Windows.

pub mod fake;
#[cfg(windows)]
pub mod win32;

use crate::error::Result;
use crate::geometry::Size;

/// Opaque OS window identifier. A lookup key, never an ownership relation:
/// the window belongs to a foreign process and may vanish at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// One visible top-level window observed during an enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCandidate {
	pub handle: WindowHandle,
	pub title: String,
}

/// Window-manager primitives needed to discover, reparent, and place a
/// foreign window. Calls are synchronous and bounded; failures surface as
/// [`crate::EmbedderError::WindowSystem`].
pub trait WindowSystem: Send + Sync {
	/// Enumerates visible top-level windows in OS z/creation order.
	fn visible_windows(&self) -> Vec<WindowCandidate>;

	fn is_visible(&self, window: WindowHandle) -> bool;

	/// Normalizes show-state to "restored" (not minimized/maximized).
	fn restore(&self, window: WindowHandle) -> Result<()>;

	fn maximize(&self, window: WindowHandle) -> Result<()>;

	fn minimize(&self, window: WindowHandle) -> Result<()>;

	/// Makes `new_parent` the OS-level parent of `window`.
	fn reparent(&self, window: WindowHandle, new_parent: WindowHandle) -> Result<()>;

	/// Removes caption, sizing border, system menu, and min/max affordances
	/// and marks the window as a child so the OS treats it as owned content.
	fn strip_chrome(&self, window: WindowHandle) -> Result<()>;

	/// Places the window at (0,0) in its parent's client area with `size`,
	/// showing it and forcing style re-evaluation.
	fn place(&self, window: WindowHandle, size: Size) -> Result<()>;

	/// Current client-area size of `window`.
	fn client_size(&self, window: WindowHandle) -> Result<Size>;

	/// Best-effort close; the window may already be gone.
	fn close_window(&self, window: WindowHandle);
}
