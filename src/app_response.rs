use std::fmt::{Display, Formatter};

use lmdb::Error as LmdbError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

/// Outcome of every storage, queue and service operation.
///
/// Failures are never allowed to escape as panics: each operation boundary
/// converts them into one of these variants, and the service layer turns the
/// variant into a user notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppResponse {
    DatabaseError(String),
    QuotaExceeded(String),
    SerializationError(String),
    NotFound(String),
    ValidationError(String),
    Duplicate(String),
    Busy(String),
    SyncFailed(String),
    Ok(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppResponse::QuotaExceeded(msg) => write!(f, "Storage quota exceeded: {}", msg),
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppResponse::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::Duplicate(msg) => write!(f, "Duplicate: {}", msg),
            AppResponse::Busy(msg) => write!(f, "Busy: {}", msg),
            AppResponse::SyncFailed(msg) => write!(f, "Sync failed: {}", msg),
            AppResponse::Ok(msg) => write!(f, "Ok: {}", msg),
        }
    }
}

impl std::error::Error for AppResponse {}

impl From<LmdbError> for AppResponse {
    fn from(err: LmdbError) -> Self {
        match err {
            LmdbError::MapFull => {
                AppResponse::QuotaExceeded("LMDB map is full".to_string())
            }
            LmdbError::NotFound => AppResponse::NotFound("Key not found".to_string()),
            LmdbError::Corrupted => {
                AppResponse::DatabaseError("Database is corrupted".to_string())
            }
            _ => AppResponse::DatabaseError(format!("LMDB error: {:?}", err)),
        }
    }
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }

    /// True for the capacity-exceeded failure, which callers report with a
    /// dedicated message.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, AppResponse::QuotaExceeded(_))
    }

    /// The message to show the user for this outcome.
    pub fn user_message(&self) -> String {
        match self {
            AppResponse::QuotaExceeded(_) => "サーバーの保存容量が一杯です。".to_string(),
            AppResponse::DatabaseError(_) | AppResponse::SerializationError(_) => {
                "サーバーへの保存に失敗しました。".to_string()
            }
            AppResponse::SyncFailed(_) => {
                "同期中にエラーが発生しました。変更が失われた可能性があります。".to_string()
            }
            AppResponse::NotFound(msg)
            | AppResponse::ValidationError(msg)
            | AppResponse::Duplicate(msg)
            | AppResponse::Busy(msg)
            | AppResponse::Ok(msg) => msg.clone(),
        }
    }
}
