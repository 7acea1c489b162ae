use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedderError>;

#[derive(Debug, Error)]
pub enum EmbedderError {
	/// Process failed to start or exited within the launch grace period.
	#[error("launch failed: {executable} exited with code {exit_code:?}")]
	Launch {
		executable: String,
		exit_code: Option<i32>,
		stdout: String,
		stderr: String,
	},

	/// No matching window appeared within the polling budget.
	#[error("no matching window found after {attempts} attempts")]
	DiscoveryTimeout { attempts: u32 },

	/// Reparent/style/placement failed while embedding a located window.
	#[error("embed failed: {reason}")]
	Embed { reason: String },

	/// Placement failed during a resize resync; never fatal to the session.
	#[error("resize failed: {reason}")]
	Resize { reason: String },

	/// An underlying window-system call failed.
	#[error("window system call failed: {0}")]
	WindowSystem(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}
