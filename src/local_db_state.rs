use std::path::{Path, PathBuf};

use lmdb::{Cursor, Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};

use crate::app_response::AppResponse;
use crate::local_storage::LocalStorage;

/// Default LMDB map size. Writes beyond it fail with
/// [`AppResponse::QuotaExceeded`], which plays the role of the browser's
/// storage quota.
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024;

/// LMDB environment holding one named database of UTF-8 key-value pairs.
///
/// The environment lives in a directory named `{name}.lmdb`. Every write is
/// its own transaction, so a failed write never leaves a partial value behind.
pub struct AppDbState {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl AppDbState {
    pub fn init(name: String) -> Result<Self, AppResponse> {
        Self::init_with_map_size(name, DEFAULT_MAP_SIZE)
    }

    pub fn init_with_map_size(name: String, map_size: usize) -> Result<Self, AppResponse> {
        let path = PathBuf::from(format!("{name}.lmdb"));

        if let Err(e) = std::fs::create_dir_all(&path) {
            warn!("Could not create LMDB directory {}: {e}", path.display());
            return Err(AppResponse::DatabaseError(format!(
                "Cannot create database directory '{}': {e}",
                path.display()
            )));
        }

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(map_size)
            .open(Path::new(&path))?;
        let db = env.create_db(Some("local_storage"), DatabaseFlags::empty())?;

        info!("LMDB environment ready at {}", path.display());
        Ok(Self { env, db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalStorage for AppDbState {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.db, &key) {
            Ok(bytes) => Some(String::from_utf8(bytes.to_vec()).map_err(|e| {
                AppResponse::SerializationError(format!("Invalid UTF-8 under '{key}': {e}"))
            })?),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(AppResponse::from(e)),
        };
        txn.commit()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        if let Err(e) = txn.put(self.db, &key, &value, WriteFlags::empty()) {
            txn.abort();
            return Err(AppResponse::from(e));
        }
        txn.commit()?;
        debug!("Stored {} bytes under '{key}'", value.len());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.db, &key, None) {
            Ok(()) => {
                txn.commit()?;
                Ok(())
            }
            Err(lmdb::Error::NotFound) => {
                txn.abort();
                Ok(())
            }
            Err(e) => {
                txn.abort();
                Err(AppResponse::from(e))
            }
        }
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let mut keys = Vec::new();
        {
            let mut cursor = txn.open_ro_cursor(self.db)?;
            // Keys are sorted bytewise: skip up to the prefix, stop after it.
            let matching = cursor
                .iter_start()
                .skip_while(|(key, _)| *key < prefix.as_bytes())
                .take_while(|(key, _)| key.starts_with(prefix.as_bytes()));
            for (key, _) in matching {
                match std::str::from_utf8(key) {
                    Ok(k) => keys.push(k.to_string()),
                    Err(e) => warn!("Skipping non UTF-8 key: {e}"),
                }
            }
        }
        txn.commit()?;
        Ok(keys)
    }
}
