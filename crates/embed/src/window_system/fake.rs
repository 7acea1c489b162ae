//! In-memory window system for unit testing the embedding pipeline.
//!
//! Windows are scripted by the test, every mutating call is recorded, and
//! individual operations can be made to fail to exercise error paths.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{WindowCandidate, WindowHandle, WindowSystem};
use crate::error::{EmbedderError, Result};
use crate::geometry::Size;

/// Every mutating call a [`FakeWindowSystem`] has observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCall {
	Restore(WindowHandle),
	Maximize(WindowHandle),
	Minimize(WindowHandle),
	Reparent { window: WindowHandle, parent: WindowHandle },
	StripChrome(WindowHandle),
	Place { window: WindowHandle, size: Size },
	Close(WindowHandle),
}

#[derive(Debug)]
struct FakeWindow {
	handle: WindowHandle,
	title: String,
	visible: bool,
	parent: Option<WindowHandle>,
	chrome_stripped: bool,
	client_size: Size,
}

#[derive(Debug, Default)]
struct FakeState {
	windows: Vec<FakeWindow>,
	calls: Vec<WindowCall>,
	next_handle: isize,
	fail_reparent: bool,
	fail_strip: bool,
	fail_place: bool,
}

/// Scriptable [`WindowSystem`] in the spirit of an in-memory fake transport:
/// the test controls the world and inspects what the code under test did.
#[derive(Debug, Clone, Default)]
pub struct FakeWindowSystem {
	state: Arc<Mutex<FakeState>>,
}

impl FakeWindowSystem {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a visible window and returns its handle.
	pub fn add_window(&self, title: &str) -> WindowHandle {
		let mut state = self.state.lock();
		state.next_handle += 1;
		let handle = WindowHandle(state.next_handle);
		state.windows.push(FakeWindow {
			handle,
			title: title.to_string(),
			visible: true,
			parent: None,
			chrome_stripped: false,
			client_size: Size::new(0, 0),
		});
		handle
	}

	pub fn remove_window(&self, handle: WindowHandle) {
		self.state.lock().windows.retain(|w| w.handle != handle);
	}

	pub fn set_visible(&self, handle: WindowHandle, visible: bool) {
		if let Some(w) = self.state.lock().windows.iter_mut().find(|w| w.handle == handle) {
			w.visible = visible;
		}
	}

	pub fn set_client_size(&self, handle: WindowHandle, size: Size) {
		if let Some(w) = self.state.lock().windows.iter_mut().find(|w| w.handle == handle) {
			w.client_size = size;
		}
	}

	pub fn set_fail_reparent(&self, fail: bool) {
		self.state.lock().fail_reparent = fail;
	}

	pub fn set_fail_strip(&self, fail: bool) {
		self.state.lock().fail_strip = fail;
	}

	pub fn set_fail_place(&self, fail: bool) {
		self.state.lock().fail_place = fail;
	}

	pub fn parent_of(&self, handle: WindowHandle) -> Option<WindowHandle> {
		self.state.lock().windows.iter().find(|w| w.handle == handle).and_then(|w| w.parent)
	}

	pub fn chrome_stripped(&self, handle: WindowHandle) -> bool {
		self.state
			.lock()
			.windows
			.iter()
			.find(|w| w.handle == handle)
			.is_some_and(|w| w.chrome_stripped)
	}

	/// All recorded calls, in order.
	pub fn calls(&self) -> Vec<WindowCall> {
		self.state.lock().calls.clone()
	}

	/// Just the placement calls, in order.
	pub fn placements(&self) -> Vec<(WindowHandle, Size)> {
		self.state
			.lock()
			.calls
			.iter()
			.filter_map(|c| match c {
				WindowCall::Place { window, size } => Some((*window, *size)),
				_ => None,
			})
			.collect()
	}

	pub fn clear_calls(&self) {
		self.state.lock().calls.clear();
	}
}

impl WindowSystem for FakeWindowSystem {
	fn visible_windows(&self) -> Vec<WindowCandidate> {
		self.state
			.lock()
			.windows
			.iter()
			.filter(|w| w.visible)
			.map(|w| WindowCandidate {
				handle: w.handle,
				title: w.title.clone(),
			})
			.collect()
	}

	fn is_visible(&self, window: WindowHandle) -> bool {
		self.state.lock().windows.iter().any(|w| w.handle == window && w.visible)
	}

	fn restore(&self, window: WindowHandle) -> Result<()> {
		self.state.lock().calls.push(WindowCall::Restore(window));
		Ok(())
	}

	fn maximize(&self, window: WindowHandle) -> Result<()> {
		self.state.lock().calls.push(WindowCall::Maximize(window));
		Ok(())
	}

	fn minimize(&self, window: WindowHandle) -> Result<()> {
		self.state.lock().calls.push(WindowCall::Minimize(window));
		Ok(())
	}

	fn reparent(&self, window: WindowHandle, new_parent: WindowHandle) -> Result<()> {
		let mut state = self.state.lock();
		if state.fail_reparent {
			return Err(EmbedderError::WindowSystem("SetParent returned null".to_string()));
		}
		state.calls.push(WindowCall::Reparent {
			window,
			parent: new_parent,
		});
		if let Some(w) = state.windows.iter_mut().find(|w| w.handle == window) {
			w.parent = Some(new_parent);
		}
		Ok(())
	}

	fn strip_chrome(&self, window: WindowHandle) -> Result<()> {
		let mut state = self.state.lock();
		if state.fail_strip {
			return Err(EmbedderError::WindowSystem("SetWindowLong failed".to_string()));
		}
		state.calls.push(WindowCall::StripChrome(window));
		if let Some(w) = state.windows.iter_mut().find(|w| w.handle == window) {
			w.chrome_stripped = true;
		}
		Ok(())
	}

	fn place(&self, window: WindowHandle, size: Size) -> Result<()> {
		let mut state = self.state.lock();
		if state.fail_place {
			return Err(EmbedderError::WindowSystem("SetWindowPos failed".to_string()));
		}
		state.calls.push(WindowCall::Place { window, size });
		Ok(())
	}

	fn client_size(&self, window: WindowHandle) -> Result<Size> {
		self.state
			.lock()
			.windows
			.iter()
			.find(|w| w.handle == window)
			.map(|w| w.client_size)
			.ok_or_else(|| EmbedderError::WindowSystem(format!("no such window: {window:?}")))
	}

	fn close_window(&self, window: WindowHandle) {
		let mut state = self.state.lock();
		state.calls.push(WindowCall::Close(window));
		state.windows.retain(|w| w.handle != window);
	}
}
