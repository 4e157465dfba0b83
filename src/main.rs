//! tubequeue - sequential yt-dlp batch downloader
//!
//! Headless front end: analyzes each URL, queues one item per URL with the
//! chosen quality options, then runs the whole batch sequentially, echoing
//! the backend's status and log stream to the terminal.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tubequeue::backend::{BackendActor, BackendCommand, BackendEvent};
use tubequeue::downloader::LogLevel;
use tubequeue::format::FormatSelection;
use tubequeue::utils::AppSettings;
use tubequeue::YtDlpEngine;

#[derive(Parser)]
#[command(name = "tubequeue", about = "Queue videos and download them one at a time with yt-dlp")]
struct Args {
    /// Video URLs to queue (one download item each)
    #[arg(required = true)]
    urls: Vec<String>,

    /// Download audio only
    #[arg(long)]
    audio_only: bool,

    /// Maximum video height, e.g. 720 (video mode; omit for best available)
    #[arg(long)]
    resolution: Option<u32>,

    /// Merge container for video mode
    #[arg(long, default_value = "mp4")]
    container: String,

    /// Target audio extension for audio mode
    #[arg(long, default_value = "m4a")]
    audio_format: String,

    /// Override the remembered download directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut settings = AppSettings::load();
    if let Some(dir) = &args.output_dir {
        settings
            .set_download_dir(dir)
            .with_context(|| format!("cannot use download directory {}", dir.display()))?;
    }
    println!("Downloading to: {}", settings.download_dir.display());

    let engine = Arc::new(YtDlpEngine::new()?);
    let (cmd_tx, cmd_rx) = mpsc::channel::<BackendCommand>(64);
    let (event_tx, mut event_rx) = mpsc::channel::<BackendEvent>(256);
    let actor = BackendActor::new(settings, engine, cmd_rx, event_tx);
    tokio::spawn(actor.run());

    let mut remaining = args.urls.clone().into_iter();
    let mut current_url = remaining
        .next()
        .context("at least one URL is required")?;
    cmd_tx
        .send(BackendCommand::Analyze {
            url: current_url.clone(),
        })
        .await?;

    let mut queued = 0usize;
    let mut batch_requested = false;

    // Poll the event queue on a short fixed interval, like a GUI timer
    // draining a log queue.
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    loop {
        ticker.tick().await;
        while let Ok(event) = event_rx.try_recv() {
            match event {
                BackendEvent::AnalysisStarted => {
                    println!("Analyzing {current_url}...");
                }
                BackendEvent::AnalysisCompleted(Ok(info)) => {
                    println!("  {} ({})", info.title, info.id);
                    let selection = build_selection(&args, &info);
                    cmd_tx
                        .send(BackendCommand::AddToQueue {
                            url: current_url.clone(),
                            title: Some(info.title.clone()),
                            video_id: info.id.clone(),
                            selection,
                        })
                        .await?;
                    queued += 1;
                    advance(&cmd_tx, &mut remaining, &mut current_url, queued, &mut batch_requested)
                        .await?;
                }
                BackendEvent::AnalysisCompleted(Err(message)) => {
                    eprintln!("Skipping {current_url}: {message}");
                    advance(&cmd_tx, &mut remaining, &mut current_url, queued, &mut batch_requested)
                        .await?;
                }
                BackendEvent::QueueChanged { items, .. } => {
                    if !batch_requested {
                        println!("Queue: {} item(s)", items.len());
                    }
                }
                BackendEvent::Rejected(reason) => {
                    eprintln!("Rejected: {reason}");
                }
                BackendEvent::BatchStarted { total } => {
                    println!("Starting batch of {total} item(s)");
                }
                BackendEvent::Status(status) => {
                    println!("  {status}");
                }
                BackendEvent::Percent(_) => {}
                BackendEvent::Log { line, level, at } => {
                    let tag = match level {
                        LogLevel::Info => "info",
                        LogLevel::Success => "ok",
                        LogLevel::Action => "run",
                        LogLevel::Error => "err",
                    };
                    println!("[{}] [{tag}] {line}", at.format("%H:%M:%S"));
                }
                BackendEvent::ItemStarted { .. }
                | BackendEvent::ItemFinished { .. }
                | BackendEvent::ThumbnailLoaded { .. }
                | BackendEvent::ThumbnailFailed { .. } => {}
                BackendEvent::BatchFinished {
                    attempted,
                    verified,
                } => {
                    println!("Batch complete: {verified}/{attempted} item(s) verified");
                    let _ = cmd_tx.send(BackendCommand::Shutdown).await;
                    if verified == attempted {
                        return Ok(());
                    }
                    std::process::exit(1);
                }
                BackendEvent::Error(message) => {
                    eprintln!("Error: {message}");
                    if batch_requested && queued == 0 {
                        let _ = cmd_tx.send(BackendCommand::Shutdown).await;
                        std::process::exit(1);
                    }
                }
            }
        }
    }
}

/// Map the CLI flags (plus the analyzed format list) onto a selection.
fn build_selection(args: &Args, info: &tubequeue::VideoInfo) -> FormatSelection {
    if args.audio_only {
        // Prefer the analyzed codec for the requested extension
        let codec = info
            .audio_options()
            .into_iter()
            .find(|option| option.ext == args.audio_format)
            .map(|option| option.codec)
            .unwrap_or_else(|| args.audio_format.clone());
        FormatSelection::audio(&codec, &args.audio_format)
    } else {
        FormatSelection::video(args.resolution, &args.container)
    }
}

/// Move on to the next URL, or kick off the batch once all are analyzed.
async fn advance(
    cmd_tx: &mpsc::Sender<BackendCommand>,
    remaining: &mut std::vec::IntoIter<String>,
    current_url: &mut String,
    queued: usize,
    batch_requested: &mut bool,
) -> Result<()> {
    if let Some(next) = remaining.next() {
        *current_url = next.clone();
        cmd_tx.send(BackendCommand::Analyze { url: next }).await?;
        return Ok(());
    }
    if queued == 0 {
        anyhow::bail!("no URLs could be analyzed, nothing to download");
    }
    *batch_requested = true;
    cmd_tx.send(BackendCommand::StartBatch).await?;
    Ok(())
}
