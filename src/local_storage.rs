//! Key-value storage abstraction shared by the document store, the offline
//! queue and the photo store.
//!
//! Production code uses the LMDB-backed [`AppDbState`](crate::local_db_state::AppDbState);
//! [`MemoryStorage`] keeps everything in process and can simulate a full
//! quota or a backend whose reads or writes fail.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::debug;

use crate::app_response::AppResponse;

/// String key-value storage with whole-value writes.
///
/// A failed `set_item` must leave the previous value untouched.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse>;

    fn remove_item(&self, key: &str) -> Result<(), AppResponse>;

    /// All keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppResponse>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects any write pushing the total size of keys and
    /// values above `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        MemoryStorage {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Makes every following write and removal fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every following read and key scan fail with a database error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, AppResponse> {
        self.items
            .lock()
            .map_err(|_| AppResponse::DatabaseError("Memory storage lock poisoned".to_string()))
    }

    fn check_writable(&self) -> Result<(), AppResponse> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppResponse::DatabaseError(
                "Storage backend rejected the write".to_string(),
            ));
        }
        Ok(())
    }

    fn check_readable(&self) -> Result<(), AppResponse> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppResponse::DatabaseError(
                "Storage backend rejected the read".to_string(),
            ));
        }
        Ok(())
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse> {
        self.check_readable()?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        self.check_writable()?;
        let mut items = self.lock()?;

        if let Some(quota) = self.quota_bytes {
            let current: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = current + key.len() + value.len();
            if needed > quota {
                debug!("Rejecting write of {key}: {needed} bytes exceeds quota of {quota}");
                return Err(AppResponse::QuotaExceeded(format!(
                    "{needed} bytes requested, quota is {quota}"
                )));
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AppResponse> {
        self.check_writable()?;
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppResponse> {
        self.check_readable()?;
        Ok(self
            .lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
