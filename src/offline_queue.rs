//! Durable FIFO log of mutations made while disconnected.

use std::sync::Arc;

use log::{debug, warn};

use crate::app_response::AppResponse;
use crate::local_db_model::OfflineAction;
use crate::local_storage::LocalStorage;

pub const OFFLINE_QUEUE_KEY: &str = "offline-action-queue";

#[derive(Clone)]
pub struct OfflineQueue {
    storage: Arc<dyn LocalStorage>,
}

impl OfflineQueue {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        OfflineQueue { storage }
    }

    /// Appends `action` after dropping the queued actions it supersedes
    /// (see [`OfflineAction::supersedes`]).
    pub fn enqueue(&self, action: OfflineAction) -> Result<(), AppResponse> {
        self.enqueue_all(std::slice::from_ref(&action))
    }

    /// Appends every action in order, coalescing each one, and persists the
    /// result in a single write. Either all of `actions` are queued or none.
    pub fn enqueue_all(&self, actions: &[OfflineAction]) -> Result<(), AppResponse> {
        let mut queue = self.load()?;
        for action in actions {
            let before = queue.len();
            queue.retain(|queued| !action.supersedes(queued));
            if queue.len() != before {
                debug!("Coalesced {} queued {} action(s)", before - queue.len(), action.kind());
            }
            queue.push(action.clone());
        }

        let json = serde_json::to_string(&queue)?;
        self.storage.set_item(OFFLINE_QUEUE_KEY, &json)
    }

    /// Every queued action in insertion order. Nothing is removed.
    ///
    /// Unparsable queue data is discarded: the intents it held are lost. A
    /// failed read yields an empty list but leaves the stored queue alone.
    pub fn drain(&self) -> Vec<OfflineAction> {
        self.load().unwrap_or_else(|e| {
            warn!("Could not read offline queue: {e}");
            Vec::new()
        })
    }

    pub fn clear(&self) -> Result<(), AppResponse> {
        self.storage.remove_item(OFFLINE_QUEUE_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.drain().is_empty()
    }

    pub fn len(&self) -> usize {
        self.drain().len()
    }

    fn load(&self) -> Result<Vec<OfflineAction>, AppResponse> {
        let Some(raw) = self.storage.get_item(OFFLINE_QUEUE_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(queue) => Ok(queue),
            Err(e) => {
                warn!("Offline queue is corrupt, discarding queued actions: {e}");
                if let Err(e) = self.storage.remove_item(OFFLINE_QUEUE_KEY) {
                    warn!("Could not remove corrupt offline queue: {e}");
                }
                Ok(Vec::new())
            }
        }
    }
}
