//! Utility modules for error handling, configuration and file timestamps

pub mod config;
pub mod error;
pub mod fs_times;

// Re-export for convenience
pub use config::{default_download_dir, AppSettings};
pub use error::TubequeueError;
