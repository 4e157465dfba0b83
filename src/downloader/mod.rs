//! Download engine and batch orchestration

pub mod engine;
pub mod events;
pub mod orchestrator;
pub mod verifier;

// Re-export for convenience
pub use engine::{DownloadRequest, MediaEngine, YtDlpEngine};
pub use events::{EngineEvent, EventSink};
pub use orchestrator::{BatchOutcome, BatchRunner, BatchUpdate, LogLevel};
pub use verifier::{candidate_extensions, verify};
