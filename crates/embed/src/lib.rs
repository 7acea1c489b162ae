//! Embedding of foreign top-level windows into a host-owned container.
//!
//! The aggregate is [`EmbeddingSession`]: it launches an external,
//! uncooperative GUI executable, polls the window system until the window it
//! creates can be identified by title, reparents that window into a host
//! container, strips its native chrome, and keeps its bounds synchronized
//! with the container through debounced resize propagation. Window-system
//! access goes through the [`WindowSystem`] trait so the whole state machine
//! runs against [`window_system::fake::FakeWindowSystem`] in tests.

pub mod config;
pub mod diag;
pub mod embedder;
pub mod error;
pub mod geometry;
pub mod locator;
pub mod process;
pub mod resize;
pub mod session;
pub mod window_system;

pub use config::EmbedConfig;
pub use diag::{DiagLevel, DiagRecord, DiagnosticsSink, MemorySink, TracingSink};
pub use embedder::{EmbedResult, WindowEmbedder};
pub use error::{EmbedderError, Result};
pub use geometry::Size;
pub use locator::{MatchCriteria, WindowLocator};
pub use resize::{ResizeSynchronizer, ResizeTrigger};
pub use session::{EmbeddingSession, HandleHostSurface, HostSurface, SessionState, WindowPicker};
pub use window_system::{WindowCandidate, WindowHandle, WindowSystem};
