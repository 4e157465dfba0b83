//! yt-dlp download engine
//!
//! Invokes yt-dlp for one queue entry and translates its line-based output
//! into [`EngineEvent`]s. The call blocks (from the caller's point of view)
//! until the process exits; events are pushed into the sink as they arrive.

use crate::downloader::events::{EngineEvent, EventSink};
use crate::format::Postprocessing;
use crate::utils::error::TubequeueError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

/// Stdout line prefixes produced by our --progress-template / --print args
const PROGRESS_PREFIX: &str = "progress>";
const FINAL_PATH_PREFIX: &str = "finalpath>";

/// One fully-specified engine invocation
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    /// yt-dlp `-f` expression
    pub selector: String,
    /// Output path template, `{base}.%(ext)s`
    pub output_template: String,
    /// Engine-internal retry count (pass-through)
    pub retries: u32,
    pub merge_output_format: Option<String>,
    pub postprocessing: Postprocessing,
    pub ffmpeg_location: Option<PathBuf>,
}

/// A media download engine: runs one request to completion, emitting
/// progress events into the sink along the way.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn download(&self, request: &DownloadRequest, sink: &dyn EventSink) -> Result<()>;
}

/// The real engine, shelling out to yt-dlp
pub struct YtDlpEngine {
    ytdlp_path: PathBuf,
}

impl YtDlpEngine {
    pub fn new() -> Result<Self> {
        let ytdlp_path =
            crate::extractor::find_ytdlp().ok_or(TubequeueError::YtDlpNotFound)?;
        Ok(Self { ytdlp_path })
    }

    pub fn with_path(ytdlp_path: PathBuf) -> Self {
        Self { ytdlp_path }
    }

    /// Command-line arguments for a request, separated out for testing.
    fn build_args(request: &DownloadRequest) -> Vec<String> {
        let mut args = vec![
            "--newline".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--retries".to_string(),
            request.retries.to_string(),
            // Progress dicts as prefixed JSON lines. --print implies
            // --quiet, which drops the progress display entirely unless
            // --progress is passed alongside it.
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!("download:{PROGRESS_PREFIX}%(progress)j"),
            // Final output path, printed after any postprocessor rename
            "--no-simulate".to_string(),
            "--print".to_string(),
            format!("after_move:{FINAL_PATH_PREFIX}%(filepath)s"),
            "-f".to_string(),
            request.selector.clone(),
            "-o".to_string(),
            request.output_template.clone(),
        ];

        if let Some(container) = &request.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.clone());
        }

        match &request.postprocessing {
            Postprocessing::None => {}
            Postprocessing::ExtractAudio { codec } => {
                args.push("--extract-audio".to_string());
                args.push("--audio-format".to_string());
                args.push(codec.clone());
                args.push("--audio-quality".to_string());
                args.push("0".to_string());
            }
            Postprocessing::ReencodeAudioTrack => {
                args.push("--postprocessor-args".to_string());
                args.push("ffmpeg:-c:v copy -c:a aac -b:a 192k".to_string());
            }
        }

        if let Some(ffmpeg) = &request.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().into_owned());
        }

        args.push(request.url.clone());
        args
    }

    fn handle_stdout_line(line: &str, sink: &dyn EventSink) {
        if let Some(json) = line.strip_prefix(PROGRESS_PREFIX) {
            match serde_json::from_str::<RawProgress>(json) {
                Ok(progress) => {
                    if let Some(event) = progress.into_event() {
                        sink.emit(event);
                    }
                }
                Err(e) => debug!("Unparseable progress line: {} ({})", json, e),
            }
        } else if let Some(path) = line.strip_prefix(FINAL_PATH_PREFIX) {
            sink.emit(EngineEvent::Finished {
                filename: Some(PathBuf::from(path)),
            });
        } else if is_postprocessor_line(line) {
            sink.emit(EngineEvent::Postprocessing);
        }
    }
}

fn is_postprocessor_line(line: &str) -> bool {
    ["[Merger]", "[ExtractAudio]", "[VideoConvertor]", "[VideoRemuxer]", "[Fixup"]
        .iter()
        .any(|tag| line.starts_with(tag))
}

/// yt-dlp progress dict, as serialized by `%(progress)j`
#[derive(Debug, Deserialize)]
struct RawProgress {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    downloaded_bytes: Option<f64>,
    #[serde(default)]
    total_bytes: Option<f64>,
    #[serde(default)]
    total_bytes_estimate: Option<f64>,
    #[serde(default, rename = "_eta_str")]
    eta_str: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

impl RawProgress {
    fn into_event(self) -> Option<EngineEvent> {
        match self.status.as_deref() {
            Some("downloading") => Some(EngineEvent::Downloading {
                downloaded_bytes: self.downloaded_bytes.unwrap_or(0.0).max(0.0) as u64,
                total_bytes: self
                    .total_bytes
                    .or(self.total_bytes_estimate)
                    .filter(|t| *t > 0.0)
                    .map(|t| t as u64),
                eta: self.eta_str.filter(|s| !s.trim().is_empty()),
            }),
            Some("finished") => Some(EngineEvent::Finished {
                filename: self.filename.map(PathBuf::from),
            }),
            Some("error") => Some(EngineEvent::Error {
                message: "engine reported a download error".to_string(),
            }),
            _ => None,
        }
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    async fn download(&self, request: &DownloadRequest, sink: &dyn EventSink) -> Result<()> {
        let args = Self::build_args(request);
        debug!("Running {} {}", self.ytdlp_path.display(), args.join(" "));

        let mut child = AsyncCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to spawn yt-dlp")?;

        let stdout = child.stdout.take().context("yt-dlp stdout missing")?;
        let stderr = child.stderr.take().context("yt-dlp stderr missing")?;
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();

        let mut stderr_tail: Vec<String> = Vec::new();
        let mut stderr_done = false;

        let mut note_stderr = |line: String, tail: &mut Vec<String>| {
            if line.starts_with("ERROR") {
                warn!("yt-dlp: {}", line);
                sink.emit(EngineEvent::Error {
                    message: line.clone(),
                });
            }
            tail.push(line);
            if tail.len() > 8 {
                tail.remove(0);
            }
        };

        loop {
            tokio::select! {
                line = stdout_lines.next_line() => match line? {
                    Some(line) => Self::handle_stdout_line(&line, sink),
                    None => break,
                },
                line = stderr_lines.next_line(), if !stderr_done => match line? {
                    Some(line) => note_stderr(line, &mut stderr_tail),
                    None => stderr_done = true,
                },
            }
        }
        while let Some(line) = stderr_lines.next_line().await? {
            note_stderr(line, &mut stderr_tail);
        }

        let status = child.wait().await?;
        if !status.success() {
            let detail = if stderr_tail.is_empty() {
                format!("yt-dlp exited with {status}")
            } else {
                stderr_tail.join("\n")
            };
            return Err(TubequeueError::ItemFailed {
                item: request.url.clone(),
                message: detail,
            }
            .into());
        }
        Ok(())
    }
}
