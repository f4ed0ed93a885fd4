//! Persistent store for the option-list [`Document`].
//!
//! The store stands in for a remote API: it is backed by local storage but
//! every call waits a fixed latency first, so callers have to treat it as a
//! round trip.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::app_response::AppResponse;
use crate::local_db_model::{Document, ListId, DEFAULT_GROUP_NAME};
use crate::local_storage::LocalStorage;

pub const DATA_KEY: &str = "whiteboard-app-data";

/// Flat per-list keys written by releases that had no groups.
pub const LEGACY_KEYS: [(&str, ListId); 3] = [
    ("server-storage-field-1", ListId::Field1),
    ("server-storage-field-2", ListId::Field2),
    ("server-storage-field-3", ListId::Field3),
];

#[derive(Clone)]
pub struct DocumentStore {
    storage: Arc<dyn LocalStorage>,
    latency: Duration,
    default_group: String,
}

impl DocumentStore {
    pub fn new(storage: Arc<dyn LocalStorage>, latency: Duration) -> Self {
        Self::with_default_group(storage, latency, DEFAULT_GROUP_NAME)
    }

    pub fn with_default_group(
        storage: Arc<dyn LocalStorage>,
        latency: Duration,
        default_group: &str,
    ) -> Self {
        DocumentStore {
            storage,
            latency,
            default_group: default_group.to_string(),
        }
    }

    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    /// Returns the stored document, already healed.
    ///
    /// Never fails: missing, unreadable or unparsable data all yield a fresh
    /// document holding only the default group.
    pub async fn fetch_document(&self) -> Document {
        self.simulate_round_trip().await;

        let mut document = match self.storage.get_item(DATA_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Document>(&json) {
                Ok(document) => document,
                Err(e) => {
                    warn!("Stored document is corrupt, using default: {e}");
                    self.default_document()
                }
            },
            Ok(None) => self.default_document(),
            Err(e) => {
                warn!("Could not read stored document, using default: {e}");
                self.default_document()
            }
        };

        if document.heal(&self.default_group) {
            info!("Healed document, active group is now '{}'", document.active_group);
        }
        document
    }

    /// Persists the whole document in a single write.
    ///
    /// On failure the previously stored document is left as it was.
    pub async fn save_document(&self, document: &Document) -> Result<(), AppResponse> {
        self.simulate_round_trip().await;

        let json = serde_json::to_string(document)?;
        match self.storage.set_item(DATA_KEY, &json) {
            Ok(()) => Ok(()),
            Err(AppResponse::QuotaExceeded(msg)) => {
                warn!("Document save rejected, quota exceeded: {msg}");
                Err(AppResponse::QuotaExceeded(msg))
            }
            Err(e) => {
                warn!("Document save failed: {e}");
                Err(AppResponse::DatabaseError(e.to_string()))
            }
        }
    }

    /// Folds the legacy flat lists into the default group and removes them.
    ///
    /// Returns `Ok(true)` when a migration happened. Legacy lists that no
    /// longer parse are treated as empty.
    pub async fn migrate_legacy(&self) -> Result<bool, AppResponse> {
        let mut found = Vec::with_capacity(LEGACY_KEYS.len());
        for (key, list_id) in LEGACY_KEYS {
            if let Some(raw) = self.storage.get_item(key)? {
                found.push((list_id, raw));
            }
        }
        if found.is_empty() {
            return Ok(false);
        }

        info!("Migrating {} legacy option lists into groups", found.len());
        let mut document = Document::with_default_group(&self.default_group);
        let lists = document.group_mut(&self.default_group);
        for (list_id, raw) in found {
            let mut items: Vec<String> = serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Legacy list {} is corrupt, dropping it: {e}", list_id.as_str());
                Vec::new()
            });
            items.retain(|item| !list_id.is_system_default(item));
            *lists.list_mut(list_id) = items;
        }

        self.save_document(&document).await?;
        for (key, _) in LEGACY_KEYS {
            self.storage.remove_item(key)?;
        }
        info!("Legacy migration finished");
        Ok(true)
    }

    fn default_document(&self) -> Document {
        Document::with_default_group(&self.default_group)
    }

    async fn simulate_round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}
