//! Reconciliation of queued offline actions with the persistent store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::app_response::AppResponse;
use crate::document_store::DocumentStore;
use crate::local_db_model::{Document, OfflineAction};
use crate::notification::NotificationCenter;
use crate::offline_queue::OfflineQueue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was queued.
    Idle,
    /// Another reconciliation holds the in-flight flag.
    AlreadyRunning,
    Synced { applied: usize },
    /// The merged document was not committed; the queue is kept for the
    /// next attempt.
    Failed(AppResponse),
}

/// Holds an [`AtomicBool`] set for as long as the guard lives.
pub(crate) struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    /// Sets the flag, or returns `None` if it was already set.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FlagGuard(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Applies one queued action to `document`.
///
/// `add` and `replace` create their group on demand; `delete` on an unknown
/// group does nothing. Removing the active group moves the marker to the
/// first remaining group.
pub fn apply_action(document: &mut Document, action: &OfflineAction, default_group: &str) {
    match action {
        OfflineAction::Add { group, list_id, item } => {
            let list = document.group_mut(group).list_mut(*list_id);
            if !list.contains(item) {
                list.insert(0, item.clone());
            }
        }
        OfflineAction::Delete { group, list_id, item } => {
            if document.groups.contains_key(group) {
                document
                    .group_mut(group)
                    .list_mut(*list_id)
                    .retain(|existing| existing != item);
            }
        }
        OfflineAction::Replace { group, list_id, new_list } => {
            *document.group_mut(group).list_mut(*list_id) = new_list.clone();
        }
        OfflineAction::DeleteGroup { group } => {
            document.groups.remove(group);
            if document.active_group == *group {
                document.active_group = document.fallback_active(default_group);
            }
        }
        OfflineAction::SetActiveGroup { group } => {
            document.active_group = group.clone();
        }
    }
}

/// Replays `actions` in order on top of `document` and heals the result.
pub fn replay(mut document: Document, actions: &[OfflineAction], default_group: &str) -> Document {
    for action in actions {
        apply_action(&mut document, action, default_group);
    }
    document.heal(default_group);
    document
}

pub struct SyncEngine {
    store: DocumentStore,
    queue: OfflineQueue,
    notifications: Arc<NotificationCenter>,
    in_flight: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        store: DocumentStore,
        queue: OfflineQueue,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        SyncEngine {
            store,
            queue,
            notifications,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Replays the offline queue against the latest stored document and
    /// commits the result.
    ///
    /// The queue is cleared only after the merged document is saved. At most
    /// one reconciliation runs at a time; overlapping calls return
    /// [`SyncOutcome::AlreadyRunning`] without touching anything.
    pub async fn reconcile(&self) -> SyncOutcome {
        let Some(_guard) = FlagGuard::acquire(&self.in_flight) else {
            info!("[SYNC] Reconciliation already in flight, skipping");
            return SyncOutcome::AlreadyRunning;
        };

        let actions = self.queue.drain();
        if actions.is_empty() {
            return SyncOutcome::Idle;
        }

        info!("[SYNC] Starting sync for {} offline actions", actions.len());
        self.notifications
            .success("オンラインに復帰しました。変更を同期中...");

        let latest = self.store.fetch_document().await;
        let merged = replay(latest, &actions, self.store.default_group());

        if let Err(e) = self.store.save_document(&merged).await {
            warn!("[SYNC] Saving merged document failed, keeping queue: {e}");
            self.notifications.error(
                "同期中にエラーが発生しました。変更が同期されていない可能性があります。",
            );
            return SyncOutcome::Failed(AppResponse::SyncFailed(e.to_string()));
        }

        if let Err(e) = self.queue.clear() {
            warn!("[SYNC] Merged document saved but queue could not be cleared: {e}");
            self.notifications.error(
                "同期中にエラーが発生しました。変更が同期されていない可能性があります。",
            );
            return SyncOutcome::Failed(AppResponse::SyncFailed(e.to_string()));
        }

        info!("[SYNC] Applied {} offline actions", actions.len());
        self.notifications.success("同期が完了しました。");
        SyncOutcome::Synced {
            applied: actions.len(),
        }
    }
}
