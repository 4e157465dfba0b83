//! Error handling for tubequeue

use thiserror::Error;

/// Main error type for tubequeue
#[derive(Debug, Error)]
pub enum TubequeueError {
    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("an identical video and format combination is already queued: {0}")]
    DuplicateKey(String),

    #[error("no queue items are checked")]
    EmptySelection,

    #[error("failed to analyze URL: {0}")]
    AnalysisFailed(String),

    #[error("playlist downloads are not supported, provide a single video URL")]
    PlaylistUrl,

    #[error("download failed for {item}: {message}")]
    ItemFailed { item: String, message: String },

    #[error("no output file found for {0}")]
    VerificationFailed(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
