//! Runtime configuration.
//!
//! Every field has a default matching the deployed web app, so an empty JSON
//! object (or no file at all) yields a working setup.

use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::local_db_model::DEFAULT_GROUP_NAME;
use crate::local_db_state::DEFAULT_MAP_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base path of the option-list LMDB environment (`.lmdb` is appended).
    pub db_path: String,
    /// Deployment path used to name the photo database, e.g. `/repo-name/`.
    pub deployment_path: String,
    /// True for local development builds.
    pub development: bool,
    /// LMDB map size; writes beyond it are reported as quota exhaustion.
    pub map_size_bytes: usize,
    /// Simulated round trip of the mock API. Each store call waits half of it.
    pub api_latency_ms: u64,
    /// How long a notification stays visible.
    pub notification_ms: u64,
    pub default_group: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: "whiteboard".to_string(),
            deployment_path: "/".to_string(),
            development: false,
            map_size_bytes: DEFAULT_MAP_SIZE,
            api_latency_ms: 300,
            notification_ms: 3000,
            default_group: DEFAULT_GROUP_NAME.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads the configuration file, falling back to defaults when it does
    /// not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppResponse> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppResponse::DatabaseError(format!("Cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Latency applied to each individual store call.
    pub fn call_latency(&self) -> Duration {
        Duration::from_millis(self.api_latency_ms / 2)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }

    /// Name of the photo database, unique per deployment so several copies
    /// of the app on one origin do not share photos.
    pub fn photo_db_name(&self) -> String {
        photo_db_name(&self.deployment_path, self.development)
    }
}

/// `PhotoBoothDB_<first path segment>`, or `dev`/`default` when the path
/// has no segment.
pub fn photo_db_name(deployment_path: &str, development: bool) -> String {
    let identifier = deployment_path
        .split('/')
        .find(|part| !part.is_empty())
        .unwrap_or(if development { "dev" } else { "default" });
    format!("PhotoBoothDB_{identifier}")
}
