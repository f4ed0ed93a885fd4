//! Storage for captured photos.
//!
//! Each record lives under its own key (`photo:<zero padded id>`), next to a
//! counter key holding the last id handed out. Ids are never reused.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use log::{info, warn};

use crate::app_response::AppResponse;
use crate::config::AppConfig;
use crate::local_db_model::PhotoRecord;
use crate::local_db_state::AppDbState;
use crate::local_storage::LocalStorage;

const PHOTO_KEY_PREFIX: &str = "photo:";
const NEXT_ID_KEY: &str = "meta:last_photo_id";

/// Clones share one id allocator, so concurrent [`add`](Self::add) calls
/// through any of them never hand out the same id.
#[derive(Clone)]
pub struct PhotoStore {
    storage: Arc<dyn LocalStorage>,
    id_lock: Arc<Mutex<()>>,
}

impl PhotoStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        PhotoStore {
            storage,
            id_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Opens the photo environment next to the option-list one, named per
    /// deployment (see [`AppConfig::photo_db_name`]).
    pub fn open(config: &AppConfig) -> Result<Self, AppResponse> {
        let name = format!("{}_{}", config.db_path, config.photo_db_name());
        let db = AppDbState::init_with_map_size(name, config.map_size_bytes)?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Stores a composed photo and returns it with its assigned id.
    pub fn add(&self, image_data: &str, filename: &str) -> Result<PhotoRecord, AppResponse> {
        let _allocating = self.id_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let id = self.last_id()? + 1;
        let record = PhotoRecord {
            id,
            image_data: image_data.to_string(),
            filename: filename.to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&record)?;
        self.storage.set_item(&photo_key(id), &json).map_err(|e| {
            warn!("Error adding photo {filename}: {e}");
            e
        })?;
        // A failed counter write cannot cause reuse: last_id() also scans keys.
        if let Err(e) = self.storage.set_item(NEXT_ID_KEY, &id.to_string()) {
            warn!("Could not persist photo id counter: {e}");
        }

        info!("Saved photo {id} as {filename}");
        Ok(record)
    }

    pub fn get(&self, id: u64) -> Result<Option<PhotoRecord>, AppResponse> {
        match self.storage.get_item(&photo_key(id))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All photos, newest first.
    pub fn list_all(&self) -> Result<Vec<PhotoRecord>, AppResponse> {
        let mut photos = Vec::new();
        for key in self.storage.keys_with_prefix(PHOTO_KEY_PREFIX)? {
            let Some(json) = self.storage.get_item(&key)? else {
                continue;
            };
            match serde_json::from_str::<PhotoRecord>(&json) {
                Ok(photo) => photos.push(photo),
                Err(e) => warn!("Skipping unreadable photo record {key}: {e}"),
            }
        }
        photos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(photos)
    }

    /// Deletes every id in `ids`. A failing id is logged and skipped; the
    /// rest are still deleted.
    pub fn delete_many(&self, ids: &[u64]) -> Result<(), AppResponse> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut failed = 0usize;
        for id in ids {
            if let Err(e) = self.storage.remove_item(&photo_key(*id)) {
                warn!("Error deleting photo with id {id}: {e}");
                failed += 1;
            }
        }
        info!("Deleted {} of {} photos", ids.len() - failed, ids.len());
        Ok(())
    }

    fn last_id(&self) -> Result<u64, AppResponse> {
        let counter = self
            .storage
            .get_item(NEXT_ID_KEY)?
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(0);
        let highest_key = self
            .storage
            .keys_with_prefix(PHOTO_KEY_PREFIX)?
            .iter()
            .filter_map(|key| key[PHOTO_KEY_PREFIX.len()..].parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Ok(counter.max(highest_key))
    }
}

fn photo_key(id: u64) -> String {
    format!("{PHOTO_KEY_PREFIX}{id:020}")
}
