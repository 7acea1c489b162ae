//! Title-based discovery of the foreign window.
//!
//! The foreign process may take an unbounded time to show its window (it can
//! launch helpers or load configuration first), so discovery is a repeated
//! non-blocking scan driven by the session's poll timer, never a blocking
//! wait.

use std::sync::Arc;

use tracing::trace;

use crate::window_system::{WindowCandidate, WindowSystem};

/// Identification rules for the foreign window.
///
/// A title matches when it is non-empty and either equals `exact_title` or
/// contains any keyword (case-sensitive). When several windows match, the
/// first in enumeration order wins; that tie-break is deliberate and
/// documented rather than clever.
#[derive(Debug, Clone, Default)]
pub struct MatchCriteria {
	pub exact_title: String,
	pub keywords: Vec<String>,
}

impl MatchCriteria {
	pub fn new(exact_title: impl Into<String>, keywords: Vec<String>) -> Self {
		Self {
			exact_title: exact_title.into(),
			keywords,
		}
	}

	pub fn matches(&self, title: &str) -> bool {
		if title.is_empty() {
			return false;
		}
		if !self.exact_title.is_empty() && title == self.exact_title {
			return true;
		}
		self.keywords.iter().any(|k| !k.is_empty() && title.contains(k.as_str()))
	}
}

/// Scans the window registry for candidates.
#[derive(Clone)]
pub struct WindowLocator {
	ws: Arc<dyn WindowSystem>,
}

impl WindowLocator {
	pub fn new(ws: Arc<dyn WindowSystem>) -> Self {
		Self { ws }
	}

	/// One enumeration pass; returns the first window matching `criteria`.
	pub fn poll_once(&self, criteria: &MatchCriteria) -> Option<WindowCandidate> {
		let found = self.ws.visible_windows().into_iter().find(|c| criteria.matches(&c.title));
		if let Some(candidate) = &found {
			trace!(target: "opcon.locator", title = %candidate.title, handle = candidate.handle.0, "matched window");
		}
		found
	}

	/// Every visible window with a non-empty title, in enumeration order.
	/// Used for the manual-selection fallback.
	pub fn enumerate_all(&self) -> Vec<WindowCandidate> {
		self.ws.visible_windows().into_iter().filter(|c| !c.title.is_empty()).collect()
	}
}
