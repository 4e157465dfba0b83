//! Ordered download queue with duplicate rejection and tri-state selection

use crate::queue::item::{candidate_keys, DownloadItem};
use crate::utils::error::TubequeueError;
use tracing::{debug, info};

/// Derived "select all" indicator over the per-item checked flags.
///
/// Recomputed on every mutation rather than stored, so it can never drift
/// out of sync with the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    All,
    Some,
    None,
}

/// Ordered collection of queued downloads, keyed by their identity string
#[derive(Debug, Default)]
pub struct JobQueue {
    items: Vec<DownloadItem>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the end. Fails with `DuplicateKey` when an item with the
    /// same queue key is already present; the queue is left unchanged.
    pub fn add(&mut self, item: DownloadItem) -> Result<(), TubequeueError> {
        if self.contains_key(&item.queue_key) {
            return Err(TubequeueError::DuplicateKey(item.queue_key));
        }
        info!("Queued {}", item.display_label());
        self.items.push(item);
        Ok(())
    }

    /// Remove the given items by identity. Items carrying their exact
    /// queue key are removed directly; items with partial metadata fall
    /// back to an ordered probe of plausible reconstructed keys. Returns
    /// the number of entries removed.
    pub fn remove(&mut self, to_remove: &[DownloadItem]) -> usize {
        let mut removed = 0;
        for item in to_remove {
            let key = if !item.queue_key.is_empty() && self.contains_key(&item.queue_key) {
                Some(item.queue_key.clone())
            } else {
                candidate_keys(item)
                    .into_iter()
                    .find(|candidate| self.contains_key(candidate))
            };

            if let Some(key) = key {
                debug!("Removing queue entry {}", key);
                self.items.retain(|existing| existing.queue_key != key);
                removed += 1;
            }
        }
        removed
    }

    /// Remove every checked item, returning how many were removed.
    pub fn remove_checked(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.checked);
        before - self.items.len()
    }

    /// Set one item's checked flag. Returns false when the key is unknown.
    pub fn set_checked(&mut self, queue_key: &str, checked: bool) -> bool {
        match self.items.iter_mut().find(|i| i.queue_key == queue_key) {
            Some(item) => {
                item.checked = checked;
                true
            }
            None => false,
        }
    }

    /// Set every item's checked flag at once ("select all" toggle).
    pub fn set_all_checked(&mut self, checked: bool) {
        for item in &mut self.items {
            item.checked = checked;
        }
    }

    /// Tri-state reduction over the checked flags.
    pub fn check_state(&self) -> CheckState {
        let checked = self.items.iter().filter(|i| i.checked).count();
        if checked == 0 {
            CheckState::None
        } else if checked == self.items.len() {
            CheckState::All
        } else {
            CheckState::Some
        }
    }

    /// Snapshot of the checked items for a batch run. Later checkbox
    /// toggles do not affect a batch already started from this snapshot.
    pub fn checked_snapshot(&self) -> Vec<DownloadItem> {
        self.items.iter().filter(|i| i.checked).cloned().collect()
    }

    pub fn items(&self) -> &[DownloadItem] {
        &self.items
    }

    pub fn contains_key(&self, queue_key: &str) -> bool {
        self.items.iter().any(|i| i.queue_key == queue_key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatSelection;

    fn item(video_id: &str, selection: FormatSelection) -> DownloadItem {
        DownloadItem::new(
            &format!("https://youtu.be/{video_id}"),
            Some("Title"),
            video_id,
            &selection,
        )
    }

    #[test]
    fn test_add_rejects_duplicate_key() {
        let mut queue = JobQueue::new();
        queue
            .add(item("abc123", FormatSelection::video(Some(720), "mp4")))
            .unwrap();

        let err = queue
            .add(item("abc123", FormatSelection::video(Some(720), "mp4")))
            .unwrap_err();
        assert!(matches!(err, TubequeueError::DuplicateKey(_)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_same_video_different_format_is_not_duplicate() {
        let mut queue = JobQueue::new();
        queue
            .add(item("abc123", FormatSelection::video(Some(720), "mp4")))
            .unwrap();
        queue
            .add(item("abc123", FormatSelection::audio("opus", "webm")))
            .unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_by_exact_key_frees_it_for_re_add() {
        let mut queue = JobQueue::new();
        let entry = item("abc123", FormatSelection::video(None, "mkv"));
        queue.add(entry.clone()).unwrap();

        assert_eq!(queue.remove(&[entry.clone()]), 1);
        assert!(queue.is_empty());
        queue.add(entry).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_reconstructs_key_from_url() {
        let mut queue = JobQueue::new();
        queue
            .add(item("dQw4w9WgXcQ", FormatSelection::video(Some(480), "mp4")))
            .unwrap();

        // Legacy entry: no stored key, no stored video id
        let legacy = DownloadItem {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            title: "legacy".to_string(),
            video_id: String::new(),
            is_audio_only: false,
            format_param: Some("480".to_string()),
            ext_param: "mp4".to_string(),
            queue_key: String::new(),
            checked: true,
        };
        assert_eq!(queue.remove(&[legacy]), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_unknown_item_is_noop() {
        let mut queue = JobQueue::new();
        queue
            .add(item("abc123", FormatSelection::video(Some(720), "mp4")))
            .unwrap();
        let other = item("zzz999", FormatSelection::video(Some(720), "mp4"));
        assert_eq!(queue.remove(&[other]), 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_tri_state_reduction() {
        let mut queue = JobQueue::new();
        assert_eq!(queue.check_state(), CheckState::None);

        queue
            .add(item("a", FormatSelection::video(Some(720), "mp4")))
            .unwrap();
        queue
            .add(item("b", FormatSelection::video(Some(720), "mp4")))
            .unwrap();
        assert_eq!(queue.check_state(), CheckState::All);

        assert!(queue.set_checked("a|720p|mp4", false));
        assert_eq!(queue.check_state(), CheckState::Some);

        queue.set_all_checked(false);
        assert_eq!(queue.check_state(), CheckState::None);
    }

    #[test]
    fn test_checked_snapshot_is_detached() {
        let mut queue = JobQueue::new();
        queue
            .add(item("a", FormatSelection::video(Some(720), "mp4")))
            .unwrap();
        queue
            .add(item("b", FormatSelection::video(Some(720), "mp4")))
            .unwrap();
        queue.set_checked("b|720p|mp4", false);

        let snapshot = queue.checked_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].queue_key, "a|720p|mp4");

        // Toggling after the snapshot does not change it
        queue.set_all_checked(true);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut queue = JobQueue::new();
        for id in ["c", "a", "b"] {
            queue
                .add(item(id, FormatSelection::video(None, "mp4")))
                .unwrap();
        }
        let ids: Vec<&str> = queue.items().iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
