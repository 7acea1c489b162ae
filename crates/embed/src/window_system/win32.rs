//! Win32 backend: EnumWindows discovery, SetParent reparenting, style
//! stripping, and SetWindowPos placement.
//!
//! All calls must happen on threads of the process that owns no affinity
//! conflict with the manipulated windows; the session confines them to the
//! host's event-loop thread.

use tracing::debug;
use windows::Win32::Foundation::{HWND, LPARAM, RECT};
use windows::core::BOOL;
use windows::Win32::UI::WindowsAndMessaging::{
	CloseWindow, EnumWindows, GetClientRect, GetWindowLongW, GetWindowTextW, IsWindowVisible, SetParent, SetWindowLongW, SetWindowPos, ShowWindow,
	GWL_STYLE, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_SHOWWINDOW, SW_MAXIMIZE, SW_MINIMIZE, SW_RESTORE, WS_CAPTION, WS_CHILD, WS_MAXIMIZEBOX,
	WS_MINIMIZEBOX, WS_SYSMENU, WS_THICKFRAME,
};

use super::{WindowCandidate, WindowHandle, WindowSystem};
use crate::error::{EmbedderError, Result};
use crate::geometry::Size;

/// Live window registry of the current desktop session.
#[derive(Debug, Default)]
pub struct Win32WindowSystem;

impl Win32WindowSystem {
	pub fn new() -> Self {
		Self
	}
}

fn hwnd(handle: WindowHandle) -> HWND {
	HWND(handle.0 as *mut core::ffi::c_void)
}

unsafe extern "system" fn collect_visible(window: HWND, lparam: LPARAM) -> BOOL {
	let out = unsafe { &mut *(lparam.0 as *mut Vec<WindowCandidate>) };
	if unsafe { IsWindowVisible(window) }.as_bool() {
		let mut buf = [0u16; 512];
		let len = unsafe { GetWindowTextW(window, &mut buf) };
		out.push(WindowCandidate {
			handle: WindowHandle(window.0 as isize),
			title: String::from_utf16_lossy(&buf[..len.max(0) as usize]),
		});
	}
	BOOL(1)
}

impl WindowSystem for Win32WindowSystem {
	fn visible_windows(&self) -> Vec<WindowCandidate> {
		let mut out: Vec<WindowCandidate> = Vec::new();
		let result = unsafe { EnumWindows(Some(collect_visible), LPARAM(&mut out as *mut _ as isize)) };
		if let Err(err) = result {
			debug!(target: "opcon.win32", error = %err, "EnumWindows aborted");
		}
		out
	}

	fn is_visible(&self, window: WindowHandle) -> bool {
		unsafe { IsWindowVisible(hwnd(window)) }.as_bool()
	}

	fn restore(&self, window: WindowHandle) -> Result<()> {
		// Return value is the previous visibility state, not an error.
		let _ = unsafe { ShowWindow(hwnd(window), SW_RESTORE) };
		Ok(())
	}

	fn maximize(&self, window: WindowHandle) -> Result<()> {
		let _ = unsafe { ShowWindow(hwnd(window), SW_MAXIMIZE) };
		Ok(())
	}

	fn minimize(&self, window: WindowHandle) -> Result<()> {
		let _ = unsafe { ShowWindow(hwnd(window), SW_MINIMIZE) };
		Ok(())
	}

	fn reparent(&self, window: WindowHandle, new_parent: WindowHandle) -> Result<()> {
		unsafe { SetParent(hwnd(window), Some(hwnd(new_parent))) }
			.map_err(|e| EmbedderError::WindowSystem(format!("SetParent failed: {e}")))?;
		Ok(())
	}

	fn strip_chrome(&self, window: WindowHandle) -> Result<()> {
		unsafe {
			let style = GetWindowLongW(hwnd(window), GWL_STYLE) as u32;
			let mut new_style = style & !(WS_CAPTION.0 | WS_THICKFRAME.0 | WS_SYSMENU.0 | WS_MINIMIZEBOX.0 | WS_MAXIMIZEBOX.0);
			new_style |= WS_CHILD.0;
			SetWindowLongW(hwnd(window), GWL_STYLE, new_style as i32);
			debug!(
				target: "opcon.win32",
				window = window.0,
				old_style = format_args!("0x{style:X}"),
				new_style = format_args!("0x{new_style:X}"),
				"stripped window chrome"
			);
		}
		Ok(())
	}

	fn place(&self, window: WindowHandle, size: Size) -> Result<()> {
		unsafe {
			SetWindowPos(
				hwnd(window),
				None,
				0,
				0,
				size.width,
				size.height,
				SWP_SHOWWINDOW | SWP_FRAMECHANGED | SWP_NOACTIVATE,
			)
		}
		.map_err(|e| EmbedderError::WindowSystem(format!("SetWindowPos failed: {e}")))
	}

	fn client_size(&self, window: WindowHandle) -> Result<Size> {
		let mut rect = RECT::default();
		unsafe { GetClientRect(hwnd(window), &mut rect) }
			.map_err(|e| EmbedderError::WindowSystem(format!("GetClientRect failed: {e}")))?;
		Ok(Size::new(rect.right - rect.left, rect.bottom - rect.top))
	}

	fn close_window(&self, window: WindowHandle) {
		if let Err(err) = unsafe { CloseWindow(hwnd(window)) } {
			debug!(target: "opcon.win32", window = window.0, error = %err, "CloseWindow failed");
		}
	}
}
