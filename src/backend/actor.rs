use super::messages::{BackendCommand, BackendEvent};
use crate::downloader::{BatchRunner, BatchUpdate, LogLevel, MediaEngine};
use crate::extractor::{self, MediaAnalyzer};
use crate::queue::{DownloadItem, JobQueue};
use crate::utils::config::AppSettings;
use crate::utils::error::TubequeueError;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Owns the queue and drives analysis, thumbnails and batch downloads.
///
/// All queue mutation is funneled through the command channel, so the batch
/// worker never races user toggles; batches operate on a snapshot taken at
/// start time.
pub struct BackendActor {
    receiver: mpsc::Receiver<BackendCommand>,
    sender: mpsc::Sender<BackendEvent>,

    settings: AppSettings,
    queue: JobQueue,
    engine: Arc<dyn MediaEngine>,
    analyzer: Option<Arc<MediaAnalyzer>>,
    batch_running: Arc<AtomicBool>,
}

impl BackendActor {
    pub fn new(
        settings: AppSettings,
        engine: Arc<dyn MediaEngine>,
        receiver: mpsc::Receiver<BackendCommand>,
        sender: mpsc::Sender<BackendEvent>,
    ) -> Self {
        Self {
            receiver,
            sender,
            settings,
            queue: JobQueue::new(),
            engine,
            analyzer: None,
            batch_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) {
        info!("BackendActor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                BackendCommand::Analyze { url } => self.handle_analyze(url).await,
                BackendCommand::FetchThumbnail { video_id } => {
                    self.spawn_thumbnail_fetch(video_id);
                }
                BackendCommand::AddToQueue {
                    url,
                    title,
                    video_id,
                    selection,
                } => {
                    let item =
                        DownloadItem::new(&url, title.as_deref(), &video_id, &selection);
                    match self.queue.add(item) {
                        Ok(()) => self.emit_queue_changed().await,
                        Err(e) => {
                            let _ = self.sender.send(BackendEvent::Rejected(e.to_string())).await;
                        }
                    }
                }
                BackendCommand::SetChecked { queue_key, checked } => {
                    if self.queue.set_checked(&queue_key, checked) {
                        self.emit_queue_changed().await;
                    }
                }
                BackendCommand::SetAllChecked(checked) => {
                    self.queue.set_all_checked(checked);
                    self.emit_queue_changed().await;
                }
                BackendCommand::RemoveChecked => {
                    let removed = self.queue.remove_checked();
                    info!("Removed {} checked queue entries", removed);
                    self.emit_queue_changed().await;
                }
                BackendCommand::StartBatch => self.handle_start_batch().await,
                BackendCommand::Shutdown => {
                    info!("BackendActor shutting down");
                    break;
                }
            }
        }
    }

    async fn emit_queue_changed(&self) {
        let _ = self
            .sender
            .send(BackendEvent::QueueChanged {
                items: self.queue.items().to_vec(),
                check_state: self.queue.check_state(),
            })
            .await;
    }

    async fn handle_analyze(&mut self, url: String) {
        let _ = self.sender.send(BackendEvent::AnalysisStarted).await;

        let analyzer = match self.analyzer_handle() {
            Ok(a) => a,
            Err(e) => {
                let _ = self
                    .sender
                    .send(BackendEvent::AnalysisCompleted(Err(e.to_string())))
                    .await;
                let _ = self.sender.send(BackendEvent::Error(e.to_string())).await;
                return;
            }
        };

        let sender = self.sender.clone();
        let timeout = Duration::from_secs(self.settings.thumbnail_timeout_secs);
        tokio::spawn(async move {
            match analyzer.analyze(&url).await {
                Ok(info) => {
                    let video_id = info.id.clone();
                    let _ = sender
                        .send(BackendEvent::AnalysisCompleted(Ok(info)))
                        .await;
                    fetch_thumbnail_task(sender, video_id, timeout).await;
                }
                Err(e) => {
                    warn!("Analysis failed for {}: {:#}", url, e);
                    let message = format!("{e:#}");
                    let _ = sender
                        .send(BackendEvent::AnalysisCompleted(Err(message.clone())))
                        .await;
                    let _ = sender.send(BackendEvent::Error(message)).await;
                }
            }
        });
    }

    fn spawn_thumbnail_fetch(&self, video_id: String) {
        let sender = self.sender.clone();
        let timeout = Duration::from_secs(self.settings.thumbnail_timeout_secs);
        tokio::spawn(fetch_thumbnail_task(sender, video_id, timeout));
    }

    async fn handle_start_batch(&mut self) {
        if self.batch_running.load(Ordering::SeqCst) {
            let _ = self
                .sender
                .send(BackendEvent::Rejected(
                    "a download batch is already running".to_string(),
                ))
                .await;
            return;
        }

        let jobs = self.queue.checked_snapshot();
        if jobs.is_empty() {
            let _ = self
                .sender
                .send(BackendEvent::Error(TubequeueError::EmptySelection.to_string()))
                .await;
            return;
        }

        let total = jobs.len();
        self.batch_running.store(true, Ordering::SeqCst);
        let _ = self.sender.send(BackendEvent::BatchStarted { total }).await;
        let _ = self
            .sender
            .send(BackendEvent::Status(format!(
                "Preparing to download {total} checked items..."
            )))
            .await;

        let runner = BatchRunner::new(
            self.engine.clone(),
            self.settings.download_dir.clone(),
            self.settings.engine_retries,
            extractor::find_ffmpeg(),
        );

        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            runner.run(jobs, update_tx).await;
        });

        // Forward worker updates. BatchFinished must reach the consumer on
        // every exit path, even when the worker dies mid-item, so when the
        // channel closes without a terminal update one is synthesized from
        // the counts seen so far.
        let sender = self.sender.clone();
        let running = self.batch_running.clone();
        tokio::spawn(async move {
            let mut verified = 0;
            let mut terminal_seen = false;
            while let Some(update) = update_rx.recv().await {
                if let BatchUpdate::ItemFinished {
                    verified_path: Some(_),
                    ..
                } = &update
                {
                    verified += 1;
                }
                let terminal = matches!(update, BatchUpdate::BatchFinished { .. });
                if terminal {
                    terminal_seen = true;
                    // Clear before forwarding, so a StartBatch sent in
                    // response to the terminal event is never bounced.
                    running.store(false, Ordering::SeqCst);
                }
                let _ = sender.send(map_update(update)).await;
                if terminal {
                    break;
                }
            }
            if !terminal_seen {
                error!("Batch worker stopped without a terminal update");
                running.store(false, Ordering::SeqCst);
                let _ = sender
                    .send(BackendEvent::Log {
                        line: "Batch worker stopped unexpectedly".to_string(),
                        level: LogLevel::Error,
                        at: Utc::now(),
                    })
                    .await;
                let _ = sender
                    .send(BackendEvent::BatchFinished {
                        attempted: total,
                        verified,
                    })
                    .await;
            }
        });
    }

    fn analyzer_handle(&mut self) -> anyhow::Result<Arc<MediaAnalyzer>> {
        if let Some(analyzer) = &self.analyzer {
            return Ok(analyzer.clone());
        }
        let analyzer = Arc::new(MediaAnalyzer::new()?);
        self.analyzer = Some(analyzer.clone());
        Ok(analyzer)
    }
}

async fn fetch_thumbnail_task(
    sender: mpsc::Sender<BackendEvent>,
    video_id: String,
    timeout: Duration,
) {
    match extractor::fetch_thumbnail(&video_id, timeout).await {
        Ok(bytes) => {
            let _ = sender
                .send(BackendEvent::ThumbnailLoaded { video_id, bytes })
                .await;
        }
        Err(e) => {
            warn!("Thumbnail fetch failed for {}: {:#}", video_id, e);
            let _ = sender.send(BackendEvent::ThumbnailFailed { video_id }).await;
        }
    }
}

fn map_update(update: BatchUpdate) -> BackendEvent {
    match update {
        BatchUpdate::Status(s) => BackendEvent::Status(s),
        BatchUpdate::Percent(p) => BackendEvent::Percent(p),
        BatchUpdate::Log { line, level } => BackendEvent::Log {
            line,
            level,
            at: Utc::now(),
        },
        BatchUpdate::ItemStarted { index, total, label } => {
            // The runner sends its own Status line for the item; mapping
            // this to another Status would print it twice.
            BackendEvent::ItemStarted { index, total, label }
        }
        BatchUpdate::ItemFinished {
            label,
            verified_path,
        } => BackendEvent::ItemFinished {
            label,
            verified_path,
        },
        BatchUpdate::BatchFinished {
            attempted,
            verified,
        } => BackendEvent::BatchFinished {
            attempted,
            verified,
        },
    }
}
