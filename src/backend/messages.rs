use crate::downloader::LogLevel;
use crate::extractor::VideoInfo;
use crate::format::FormatSelection;
use crate::queue::{CheckState, DownloadItem};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Commands sent from the front end to the backend
#[derive(Debug, Clone)]
pub enum BackendCommand {
    Analyze {
        url: String,
    },
    FetchThumbnail {
        video_id: String,
    },
    AddToQueue {
        url: String,
        title: Option<String>,
        video_id: String,
        selection: FormatSelection,
    },
    SetChecked {
        queue_key: String,
        checked: bool,
    },
    SetAllChecked(bool),
    RemoveChecked,
    StartBatch,
    Shutdown,
}

/// Events sent from the backend to the front end
#[derive(Debug, Clone)]
pub enum BackendEvent {
    // Analysis
    AnalysisStarted,
    AnalysisCompleted(Result<VideoInfo, String>),

    // Thumbnail
    ThumbnailLoaded { video_id: String, bytes: Vec<u8> },
    ThumbnailFailed { video_id: String },

    // Queue
    QueueChanged {
        items: Vec<DownloadItem>,
        check_state: CheckState,
    },
    /// Add/start rejected; shown as a status message, queue unchanged
    Rejected(String),

    // Batch life-cycle
    BatchStarted { total: usize },
    Status(String),
    Percent(u8),
    Log {
        line: String,
        level: LogLevel,
        at: DateTime<Utc>,
    },
    ItemStarted {
        index: usize,
        total: usize,
        label: String,
    },
    ItemFinished {
        label: String,
        verified_path: Option<PathBuf>,
    },
    /// Terminal batch event; the start control is usable again
    BatchFinished { attempted: usize, verified: usize },

    /// Modal-style user-visible error
    Error(String),
}
