//! tubequeue library

pub mod backend;
pub mod downloader;
pub mod extractor;
pub mod format;
pub mod queue;
pub mod utils;

// Re-export main types for easier use
pub use backend::{BackendActor, BackendCommand, BackendEvent};
pub use downloader::{
    BatchOutcome, BatchRunner, BatchUpdate, DownloadRequest, EngineEvent, EventSink, LogLevel,
    MediaEngine, YtDlpEngine,
};
pub use extractor::{MediaAnalyzer, VideoInfo};
pub use format::{FormatSelection, Postprocessing, ResolvedFormat};
pub use queue::{CheckState, DownloadItem, JobQueue};
pub use utils::{AppSettings, TubequeueError};
