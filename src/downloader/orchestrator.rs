//! Sequential batch orchestration
//!
//! One worker drives the whole batch: items run one at a time through the
//! engine, per-item failures are logged and skipped, every item gets an
//! output-verification pass, and a terminal update is always delivered so
//! the start control can be re-enabled.

use crate::downloader::engine::{DownloadRequest, MediaEngine};
use crate::downloader::events::EngineEvent;
use crate::downloader::verifier;
use crate::format;
use crate::queue::item::{sanitize_filename, DownloadItem};
use crate::utils::fs_times;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Severity tag carried on user-facing log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Action,
    Error,
}

/// Normalized worker-to-consumer updates for a batch run
#[derive(Debug, Clone)]
pub enum BatchUpdate {
    /// Human status line
    Status(String),
    /// Displayed progress, 0-100
    Percent(u8),
    Log { line: String, level: LogLevel },
    ItemStarted {
        index: usize,
        total: usize,
        label: String,
    },
    ItemFinished {
        label: String,
        verified_path: Option<PathBuf>,
    },
    /// Terminal update; sent exactly once per run, on every exit path
    BatchFinished { attempted: usize, verified: usize },
}

/// Result summary of one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub verified: usize,
}

/// Runs a checked-items snapshot sequentially through an engine
pub struct BatchRunner {
    engine: Arc<dyn MediaEngine>,
    download_dir: PathBuf,
    retries: u32,
    ffmpeg_location: Option<PathBuf>,
}

impl BatchRunner {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        download_dir: PathBuf,
        retries: u32,
        ffmpeg_location: Option<PathBuf>,
    ) -> Self {
        Self {
            engine,
            download_dir,
            retries,
            ffmpeg_location,
        }
    }

    /// Process every item in `jobs`, in order. A failing item does not
    /// abort the batch. Returns after the terminal `BatchFinished` update
    /// has been sent.
    pub async fn run(
        &self,
        jobs: Vec<DownloadItem>,
        updates: mpsc::UnboundedSender<BatchUpdate>,
    ) -> BatchOutcome {
        let total = jobs.len();
        let mut verified_count = 0;

        for (index, item) in jobs.iter().enumerate() {
            let label = item.display_label();
            let _ = updates.send(BatchUpdate::ItemStarted {
                index,
                total,
                label: label.clone(),
            });
            let _ = updates.send(BatchUpdate::Status(format!(
                "Downloading {}/{}: {}",
                index + 1,
                total,
                label
            )));
            let _ = updates.send(BatchUpdate::Log {
                line: format!("[download] {label}"),
                level: LogLevel::Info,
            });

            let base = self.download_dir.join(sanitize_filename(&item.title));
            let request = self.build_request(item, &base);

            // Last path the engine claimed to have finished, shared with
            // the event sink
            let reported_path: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
            let sink = event_sink(updates.clone(), reported_path.clone());

            if let Err(e) = self.engine.download(&request, &sink).await {
                error!("Item failed: {} - {:#}", label, e);
                let _ = updates.send(BatchUpdate::Log {
                    line: format!("Download failed: {label} - {e:#}"),
                    level: LogLevel::Error,
                });
            }

            // Even a "successful" engine call may not have reported the
            // final path; re-derive it from the output base.
            let reported = reported_path.lock().expect("sink lock").take();
            let verified_path = verifier::verify(
                reported.as_deref(),
                &base,
                item.is_audio_only,
                item.format_param.as_deref(),
                &item.ext_param,
            );
            match &verified_path {
                Some(path) => {
                    verified_count += 1;
                    let _ = updates.send(BatchUpdate::Log {
                        line: format!(
                            "Completed: {} -> {}",
                            label,
                            path.file_name().unwrap_or_default().to_string_lossy()
                        ),
                        level: LogLevel::Success,
                    });
                }
                None => {
                    let _ = updates.send(BatchUpdate::Log {
                        line: format!("No output file found for: {label}"),
                        level: LogLevel::Error,
                    });
                }
            }
            let _ = updates.send(BatchUpdate::ItemFinished {
                label,
                verified_path,
            });
            let _ = updates.send(BatchUpdate::Percent(0));
        }

        info!("Batch complete: {}/{} items verified", verified_count, total);
        let _ = updates.send(BatchUpdate::Status("All downloads complete".to_string()));
        let _ = updates.send(BatchUpdate::Log {
            line: "All downloads complete".to_string(),
            level: LogLevel::Success,
        });
        let _ = updates.send(BatchUpdate::BatchFinished {
            attempted: total,
            verified: verified_count,
        });

        BatchOutcome {
            attempted: total,
            verified: verified_count,
        }
    }

    fn build_request(&self, item: &DownloadItem, base: &std::path::Path) -> DownloadRequest {
        let resolved = format::resolve(&item.selection());
        DownloadRequest {
            url: item.url.clone(),
            selector: resolved.selector,
            output_template: format!("{}.%(ext)s", base.display()),
            retries: self.retries,
            merge_output_format: resolved.merge_output_format,
            postprocessing: resolved.postprocessing,
            ffmpeg_location: self.ffmpeg_location.clone(),
        }
    }
}

/// Adapt engine events onto the batch update channel.
fn event_sink(
    updates: mpsc::UnboundedSender<BatchUpdate>,
    reported_path: Arc<Mutex<Option<PathBuf>>>,
) -> impl Fn(EngineEvent) + Send + Sync {
    move |event| match event {
        EngineEvent::Downloading {
            downloaded_bytes,
            total_bytes,
            eta,
        } => {
            let percent = percent_of(downloaded_bytes, total_bytes);
            let _ = updates.send(BatchUpdate::Percent(percent.round() as u8));
            let status = match eta {
                Some(eta) => format!("Downloading: {percent:.1}% (about {eta} left)"),
                None => format!("Downloading: {percent:.1}%"),
            };
            let _ = updates.send(BatchUpdate::Status(status));
        }
        EngineEvent::Postprocessing => {
            let _ = updates.send(BatchUpdate::Status(
                "Running FFmpeg conversion / merge...".to_string(),
            ));
            let _ = updates.send(BatchUpdate::Log {
                line: "[postprocess] running FFmpeg...".to_string(),
                level: LogLevel::Action,
            });
        }
        EngineEvent::Finished { filename } => {
            if let Some(path) = &filename {
                fs_times::stamp(path, None);
                *reported_path.lock().expect("sink lock") = Some(path.clone());
            }
            let _ = updates.send(BatchUpdate::Percent(100));
            let _ = updates.send(BatchUpdate::Status("Item processed".to_string()));
            let _ = updates.send(BatchUpdate::Log {
                line: "[done] file processed".to_string(),
                level: LogLevel::Success,
            });
        }
        EngineEvent::Error { message } => {
            let _ = updates.send(BatchUpdate::Status("Download failed".to_string()));
            let _ = updates.send(BatchUpdate::Log {
                line: format!("[error] {message}"),
                level: LogLevel::Error,
            });
        }
    }
}

/// downloaded/total as 0-100, clamped; 0 when the total is unknown.
fn percent_of(downloaded: u64, total: Option<u64>) -> f64 {
    match total {
        Some(total) if total > 0 => {
            (downloaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}
