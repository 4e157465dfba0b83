pub mod models;
pub mod thumbnail;
pub mod ytdlp;

pub use models::{AudioOption, FormatInfo, VideoInfo};
pub use thumbnail::fetch_thumbnail;
pub use ytdlp::{find_ffmpeg, find_ytdlp, MediaAnalyzer};
