pub mod item;
pub mod manager;

pub use item::{compute_key, extract_video_id, sanitize_filename, DownloadItem};
pub use manager::{CheckState, JobQueue};
