//! # Whiteboard Sync Core
//!
//! Persistence and offline synchronization for a whiteboard camera app. The
//! app overlays an editable template on captured photos; this crate keeps the
//! option lists that autofill the template and the photos taken with it.
//!
//! ## Features
//!
//! - **Grouped option lists**: one [`Document`](local_db_model::Document) holding named groups
//!   of three ordered, duplicate-free lists
//! - **Offline tolerance**: mutations made while disconnected are applied optimistically and
//!   queued; the queue is replayed in order once connectivity returns
//! - **All-or-nothing saves**: a rejected write (including a full quota) leaves the stored
//!   document untouched
//! - **LMDB-backed storage**: both the option lists and the photo records live in LMDB
//!   environments behind the [`LocalStorage`](local_storage::LocalStorage) trait
//! - **Safe error handling**: every failure is reported as an [`AppResponse`]; no `unwrap()`
//!   calls in production code
//!
//! ## Quick Start
//!
//! ```no_run
//! use whiteboard_sync_core::config::AppConfig;
//! use whiteboard_sync_core::local_db_model::ListId;
//! use whiteboard_sync_core::option_service::OptionListService;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), whiteboard_sync_core::AppResponse> {
//!     let config = AppConfig::default();
//!     let service = OptionListService::open(&config, true)?;
//!
//!     service.load().await?;
//!     service.add_option(ListId::Field1, "ポンプ室").await?;
//!     assert!(service.options(ListId::Field1).contains(&"ポンプ室".to_string()));
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`option_service`] - Single entry point routing mutations online or offline
//! - [`document_store`] - Persistent store with simulated latency and legacy migration
//! - [`offline_queue`] - Durable, coalescing FIFO of offline actions
//! - [`sync_engine`] - Replay of queued actions against the latest stored document
//! - [`connectivity`] - Online/offline edge detection driving reconciliation
//! - [`photo_store`] - Captured photo records, newest first
//! - [`text_codec`] - Import decoding and export encoding of list files
//! - [`template`] - Text slots of the whiteboard overlay

pub mod app_response;
pub mod config;
pub mod connectivity;
pub mod document_store;
pub mod local_db_model;
pub mod local_db_state;
pub mod local_storage;
pub mod notification;
pub mod offline_queue;
pub mod option_service;
pub mod photo_store;
pub mod sync_engine;
pub mod template;
pub mod text_codec;

pub use crate::app_response::AppResponse;
pub use crate::config::AppConfig;
pub use crate::connectivity::{ConnectivityObserver, Transition};
pub use crate::document_store::DocumentStore;
pub use crate::local_db_model::{Document, GroupLists, ListId, OfflineAction, PhotoRecord};
pub use crate::local_db_state::AppDbState;
pub use crate::local_storage::{LocalStorage, MemoryStorage};
pub use crate::offline_queue::OfflineQueue;
pub use crate::option_service::OptionListService;
pub use crate::photo_store::PhotoStore;
pub use crate::sync_engine::{SyncEngine, SyncOutcome};
