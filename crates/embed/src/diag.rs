//! Diagnostics records surfaced to the host.
//!
//! Every state transition and user-visible failure of a session produces one
//! [`DiagRecord`] on a host-provided sink; this is the only coupling between
//! the embedding core and host-side logging or UI.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagLevel {
	Info,
	Warning,
	Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagRecord {
	pub timestamp_ms: u64,
	pub level: DiagLevel,
	pub message: String,
}

impl DiagRecord {
	pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
		Self {
			timestamp_ms: now_ms(),
			level,
			message: message.into(),
		}
	}
}

/// Unix timestamp in milliseconds.
pub fn now_ms() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Host-provided destination for session diagnostics.
pub trait DiagnosticsSink: Send + Sync {
	fn emit(&self, record: DiagRecord);
}

/// Forwards diagnostics to `tracing` under the `opcon.session` target.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
	fn emit(&self, record: DiagRecord) {
		match record.level {
			DiagLevel::Info => info!(target: "opcon.session", "{}", record.message),
			DiagLevel::Warning => warn!(target: "opcon.session", "{}", record.message),
			DiagLevel::Error => error!(target: "opcon.session", "{}", record.message),
		}
	}
}

/// Buffers diagnostics in memory for a host log pane or assertions in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
	records: Mutex<Vec<DiagRecord>>,
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a snapshot of everything emitted so far.
	pub fn records(&self) -> Vec<DiagRecord> {
		self.records.lock().clone()
	}

	/// Takes all buffered records, clearing the buffer.
	pub fn take(&self) -> Vec<DiagRecord> {
		std::mem::take(&mut *self.records.lock())
	}
}

impl DiagnosticsSink for MemorySink {
	fn emit(&self, record: DiagRecord) {
		self.records.lock().push(record);
	}
}
