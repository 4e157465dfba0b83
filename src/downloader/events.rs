//! Engine event stream
//!
//! The engine reports progress through an event sink rather than a return
//! value, so the same orchestrator logic works whether events arrive via a
//! channel, a queue, or a direct callback.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Events emitted by the engine during a single blocking download call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    Downloading {
        downloaded_bytes: u64,
        /// Exact total, or the engine's estimate when unavailable
        total_bytes: Option<u64>,
        eta: Option<String>,
    },
    /// FFmpeg transcode/merge/extract step started
    Postprocessing,
    /// The engine considers one output finished. `filename` is best effort
    /// and may be missing or stale after a postprocessing rename.
    Finished { filename: Option<PathBuf> },
    /// A non-fatal engine-reported error
    Error { message: String },
}

/// Consumer of engine events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

impl<F> EventSink for F
where
    F: Fn(EngineEvent) + Send + Sync,
{
    fn emit(&self, event: EngineEvent) {
        self(event)
    }
}

impl EventSink for std::sync::mpsc::Sender<EngineEvent> {
    fn emit(&self, event: EngineEvent) {
        let _ = self.send(event);
    }
}

impl EventSink for tokio::sync::mpsc::UnboundedSender<EngineEvent> {
    fn emit(&self, event: EngineEvent) {
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink_receives_events() {
        let seen = Mutex::new(Vec::new());
        let sink = |event: EngineEvent| seen.lock().unwrap().push(event);
        sink.emit(EngineEvent::Postprocessing);
        sink.emit(EngineEvent::Finished { filename: None });
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_channel_sink_forwards_events() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.emit(EngineEvent::Downloading {
            downloaded_bytes: 10,
            total_bytes: Some(100),
            eta: Some("00:30".to_string()),
        });
        let event = rx.recv().unwrap();
        assert!(matches!(
            event,
            EngineEvent::Downloading {
                downloaded_bytes: 10,
                ..
            }
        ));
    }
}
