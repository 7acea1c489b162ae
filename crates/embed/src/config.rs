use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for one embedding session, loadable from a JSON file.
///
/// The defaults mirror the behavior of the tool this was built to host: a
/// slow-starting native executable whose window can take tens of seconds to
/// appear, driven by one-second discovery polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
	/// Executable to launch; its parent directory becomes the working
	/// directory so the tool can resolve sibling configuration files.
	pub executable: PathBuf,
	/// Title that identifies the foreign window exactly.
	pub target_title: String,
	/// Fallback substrings; first enumeration-order match wins.
	pub title_keywords: Vec<String>,
	/// Discovery ticks before giving up and offering manual selection.
	pub poll_limit: u32,
	pub poll_interval_ms: u64,
	/// How long a freshly spawned process gets before liveness is judged.
	pub launch_grace_ms: u64,
	/// Pause after killing a stale instance, before relaunching.
	pub kill_settle_ms: u64,
	pub container_debounce_ms: u64,
	pub host_debounce_ms: u64,
	pub activation_debounce_ms: u64,
	/// One-shot geometry re-application after a successful embed.
	pub resync_delay_ms: u64,
	/// Resize targets under this many logical units are dropped.
	pub min_usable_px: i32,
}

impl Default for EmbedConfig {
	fn default() -> Self {
		Self {
			executable: PathBuf::new(),
			target_title: String::new(),
			title_keywords: Vec::new(),
			poll_limit: 30,
			poll_interval_ms: 1000,
			launch_grace_ms: 2000,
			kill_settle_ms: 1000,
			container_debounce_ms: 300,
			host_debounce_ms: 200,
			activation_debounce_ms: 100,
			resync_delay_ms: 250,
			min_usable_px: 100,
		}
	}
}

impl EmbedConfig {
	/// Reads a config from a JSON file; absent fields keep their defaults.
	pub fn from_file(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path)?;
		Ok(serde_json::from_str(&text)?)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn launch_grace(&self) -> Duration {
		Duration::from_millis(self.launch_grace_ms)
	}

	pub fn kill_settle(&self) -> Duration {
		Duration::from_millis(self.kill_settle_ms)
	}
}
