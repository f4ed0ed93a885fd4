//! The single entry point for every option-list mutation.
//!
//! Each request is turned into one or more [`OfflineAction`]s. Online, the
//! actions are applied to a freshly fetched document and saved right away.
//! Offline, they are queued and applied optimistically to the cached view
//! until the [`SyncEngine`] replays them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::app_response::AppResponse;
use crate::config::AppConfig;
use crate::document_store::DocumentStore;
use crate::local_db_model::{Document, ListId, OfflineAction};
use crate::local_db_state::AppDbState;
use crate::local_storage::LocalStorage;
use crate::notification::NotificationCenter;
use crate::offline_queue::OfflineQueue;
use crate::sync_engine::{apply_action, FlagGuard, SyncEngine, SyncOutcome};
use crate::template::WhiteboardTemplate;
use crate::text_codec::{self, ExportFile};

pub struct OptionListService {
    store: DocumentStore,
    queue: OfflineQueue,
    engine: SyncEngine,
    notifications: Arc<NotificationCenter>,
    view: Mutex<Option<Document>>,
    online: AtomicBool,
    busy: AtomicBool,
    syncing: AtomicBool,
}

impl OptionListService {
    pub fn new(storage: Arc<dyn LocalStorage>, config: &AppConfig, online: bool) -> Self {
        let store = DocumentStore::with_default_group(
            Arc::clone(&storage),
            config.call_latency(),
            &config.default_group,
        );
        let queue = OfflineQueue::new(storage);
        let notifications = Arc::new(NotificationCenter::new(config.notification_duration()));
        let engine = SyncEngine::new(store.clone(), queue.clone(), Arc::clone(&notifications));

        OptionListService {
            store,
            queue,
            engine,
            notifications,
            view: Mutex::new(None),
            online: AtomicBool::new(online),
            busy: AtomicBool::new(false),
            syncing: AtomicBool::new(false),
        }
    }

    /// Opens the LMDB environment named by `config.db_path`.
    pub fn open(config: &AppConfig, online: bool) -> Result<Self, AppResponse> {
        let db = AppDbState::init_with_map_size(config.db_path.clone(), config.map_size_bytes)?;
        Ok(Self::new(Arc::new(db), config, online))
    }

    // ---------------------------------------------------------------
    // Read side
    // ---------------------------------------------------------------

    pub fn view(&self) -> Option<Document> {
        self.lock_view().clone()
    }

    pub fn active_group(&self) -> Option<String> {
        self.lock_view().as_ref().map(|doc| doc.active_group.clone())
    }

    pub fn group_names(&self) -> Vec<String> {
        self.lock_view()
            .as_ref()
            .map(Document::group_names)
            .unwrap_or_default()
    }

    /// Options offered for `list_id` in the active group.
    pub fn options(&self, list_id: ListId) -> Vec<String> {
        self.lock_view()
            .as_ref()
            .map(|doc| doc.effective_options(&doc.active_group, list_id))
            .unwrap_or_default()
    }

    pub fn options_for(&self, group: &str, list_id: ListId) -> Vec<String> {
        self.lock_view()
            .as_ref()
            .map(|doc| doc.effective_options(group, list_id))
            .unwrap_or_default()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Mutating controls are disabled while anything is outstanding or
    /// before the first load finished.
    pub fn is_ui_blocked(&self) -> bool {
        self.busy.load(Ordering::SeqCst) || self.is_syncing() || self.lock_view().is_none()
    }

    pub fn pending_actions(&self) -> Vec<OfflineAction> {
        self.queue.drain()
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Migrates legacy data if present and loads the document into the view.
    pub async fn load(&self) -> Result<Document, AppResponse> {
        let _busy = self.begin(false)?;
        match self.store.migrate_legacy().await {
            Ok(true) => self.notifications.success("データを新しい形式に更新しました。"),
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to fetch initial data: {e}");
                self.notifications.error("データの読み込みに失敗しました。");
                return Err(e);
            }
        }
        Ok(self.refresh().await)
    }

    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
    }

    /// Replays queued offline changes, then reloads the view from the store
    /// whatever the outcome.
    pub async fn sync_now(&self) -> SyncOutcome {
        if !self.is_online() {
            debug!("Skipping sync while offline");
            return SyncOutcome::Idle;
        }
        let Some(_syncing) = FlagGuard::acquire(&self.syncing) else {
            return SyncOutcome::AlreadyRunning;
        };

        let outcome = self.engine.reconcile().await;
        if matches!(outcome, SyncOutcome::Synced { .. } | SyncOutcome::Failed(_)) {
            self.refresh().await;
        }
        outcome
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Saves `text` at the front of `list_id` in the active group.
    pub async fn add_option(&self, list_id: ListId, text: &str) -> Result<(), AppResponse> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject(AppResponse::ValidationError(
                "保存するテキストを入力してください。".to_string(),
            )));
        }
        if list_id.is_system_default(text) {
            return Err(self.reject(AppResponse::ValidationError(
                "基本項目はリストに追加できません。".to_string(),
            )));
        }

        let view = self.current_view()?;
        let group = view.active_group.clone();
        if view.stored(&group, list_id).iter().any(|item| item == text) {
            return Err(self.reject(AppResponse::Duplicate("既に登録されています".to_string())));
        }

        let _busy = self.begin(true)?;
        let action = OfflineAction::Add {
            group,
            list_id,
            item: text.to_string(),
        };
        self.route(|_| vec![action]).await?;

        if self.is_online() {
            self.notifications.success("保存されました");
        } else {
            self.notifications.success("オフラインです。ローカルに保存しました。");
        }
        Ok(())
    }

    /// Saves the text of a whiteboard input slot to the list bound to it.
    pub async fn save_slot(
        &self,
        template: &WhiteboardTemplate,
        slot: usize,
    ) -> Result<(), AppResponse> {
        let Some(list_id) = ListId::from_slot(slot) else {
            return Err(AppResponse::ValidationError(format!(
                "Slot {slot} has no option list"
            )));
        };
        self.add_option(list_id, template.list_value(list_id)).await
    }

    pub async fn delete_option(
        &self,
        group: &str,
        list_id: ListId,
        item: &str,
    ) -> Result<(), AppResponse> {
        if list_id.is_system_default(item) {
            return Err(self.reject(AppResponse::ValidationError(
                "基本項目は削除できません。".to_string(),
            )));
        }

        let _busy = self.begin(true)?;
        let action = OfflineAction::Delete {
            group: group.to_string(),
            list_id,
            item: item.to_string(),
        };
        self.route(|_| vec![action]).await?;

        if self.is_online() {
            self.notifications.success("項目を削除しました。");
        } else {
            self.notifications.success("オフラインです。ローカルで削除しました。");
        }
        Ok(())
    }

    /// Empties `list_id` in the active group.
    pub async fn clear_list(&self, list_id: ListId) -> Result<(), AppResponse> {
        let group = self.current_view()?.active_group;
        let _busy = self.begin(true)?;
        let action = OfflineAction::Replace {
            group,
            list_id,
            new_list: Vec::new(),
        };
        self.route(|_| vec![action]).await?;

        let label = list_id.label();
        if self.is_online() {
            self.notifications
                .success(format!("「{label}」リストの全項目を削除しました。"));
        } else {
            self.notifications
                .success(format!("オフラインです。「{label}」リストをローカルで削除しました。"));
        }
        Ok(())
    }

    /// Makes `group` the active group.
    ///
    /// The view switches immediately; if the online save fails it is put
    /// back.
    pub async fn switch_group(&self, group: &str) -> Result<(), AppResponse> {
        let previous = self.current_view()?;
        if previous.active_group == group {
            return Ok(());
        }
        if !previous.groups.contains_key(group) {
            return Err(self.reject(AppResponse::NotFound(format!(
                "グループ「{group}」は存在しません。"
            ))));
        }

        let _busy = self.begin(true)?;
        let mut optimistic = previous.clone();
        optimistic.active_group = group.to_string();
        self.set_view(optimistic);

        let action = OfflineAction::SetActiveGroup {
            group: group.to_string(),
        };
        if let Err(e) = self.route(|_| vec![action]).await {
            if self.is_online() {
                self.set_view(previous);
            }
            return Err(e);
        }
        Ok(())
    }

    pub async fn delete_group(&self, group: &str) -> Result<(), AppResponse> {
        let view = self.current_view()?;
        if !view.groups.contains_key(group) {
            return Err(self.reject(AppResponse::NotFound(format!(
                "グループ「{group}」は存在しません。"
            ))));
        }

        let _busy = self.begin(true)?;
        let action = OfflineAction::DeleteGroup {
            group: group.to_string(),
        };
        self.route(|_| vec![action]).await?;
        self.notifications
            .success(format!("グループ「{group}」を削除しました。"));
        Ok(())
    }

    /// Imports a newline-delimited file into `list_id`. Only
    /// [`ListId::Field1`] and [`ListId::Field2`] accept imports.
    ///
    /// The target group is read from a `(group).txt` suffix of `file_name`,
    /// falling back to the active group, and becomes the active group. New
    /// lines are prepended in file order; lines already present are skipped.
    /// Returns the number of lines added.
    pub async fn import_file(
        &self,
        list_id: ListId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<usize, AppResponse> {
        if list_id == ListId::Field3 {
            return Err(self.reject(AppResponse::ValidationError(format!(
                "「{}」リストにはインポートできません。",
                list_id.label()
            ))));
        }
        let lines = text_codec::parse_lines(&text_codec::decode_text(bytes));
        if lines.is_empty() {
            return Err(self.reject(AppResponse::ValidationError(
                "ファイルが空か、有効な項目がありませんでした。".to_string(),
            )));
        }

        let view = self.current_view()?;
        let group = text_codec::group_from_filename(file_name).unwrap_or(view.active_group);

        let _busy = self.begin(true)?;
        let mut added = 0usize;
        self.route(|base| {
            let current = base.stored(&group, list_id);
            let new_items: Vec<String> = lines
                .iter()
                .filter(|line| !current.contains(*line))
                .cloned()
                .collect();
            added = new_items.len();

            let mut actions = Vec::with_capacity(2);
            if !new_items.is_empty() {
                let mut new_list = new_items;
                new_list.extend(current.iter().cloned());
                actions.push(OfflineAction::Replace {
                    group: group.clone(),
                    list_id,
                    new_list,
                });
            }
            actions.push(OfflineAction::SetActiveGroup {
                group: group.clone(),
            });
            actions
        })
        .await?;

        if added == 0 {
            self.notifications
                .success("追加する新しい項目がありませんでした。");
        } else if self.is_online() {
            self.notifications.success(format!(
                "グループ「{group}」の「{}」リストに{added}件追加しました。",
                list_id.label()
            ));
        } else {
            self.notifications
                .success(format!("オフラインのためローカルに{added}件追加しました。"));
        }
        Ok(added)
    }

    /// Builds the export file for `list_id` of the active group.
    pub fn export_list(&self, list_id: ListId) -> Result<ExportFile, AppResponse> {
        let view = self.current_view()?;
        let items = view.stored(&view.active_group, list_id);
        if items.is_empty() {
            return Err(self.reject(AppResponse::ValidationError(
                "リストにエクスポートする項目がありません。".to_string(),
            )));
        }
        Ok(ExportFile {
            filename: text_codec::export_filename(list_id, &view.active_group),
            bytes: text_codec::encode_export(items),
        })
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    /// Applies the actions produced by `build` through the online or the
    /// offline path. `build` receives the document the actions will apply
    /// to: the stored one when online, the cached view when offline.
    async fn route<F>(&self, build: F) -> Result<(), AppResponse>
    where
        F: FnOnce(&Document) -> Vec<OfflineAction>,
    {
        let default_group = self.store.default_group().to_string();

        if !self.is_online() {
            let mut view = self.current_view()?;
            let actions = build(&view);
            if let Err(e) = self.queue.enqueue_all(&actions) {
                warn!("Could not queue {} offline action(s): {e}", actions.len());
                return Err(self.reject(e));
            }
            for action in &actions {
                apply_action(&mut view, action, &default_group);
            }
            view.heal(&default_group);
            self.set_view(view);
            debug!("Queued {} offline action(s)", actions.len());
            return Ok(());
        }

        let mut document = self.store.fetch_document().await;
        for action in build(&document) {
            apply_action(&mut document, &action, &default_group);
        }
        document.heal(&default_group);

        if let Err(e) = self.store.save_document(&document).await {
            return Err(self.reject(e));
        }
        self.refresh().await;
        Ok(())
    }

    /// Reloads the view from the store.
    async fn refresh(&self) -> Document {
        let document = self.store.fetch_document().await;
        self.set_view(document.clone());
        document
    }

    /// Takes the busy flag. Fails while another operation or a sync is
    /// outstanding, and, for `needs_view`, before the first load.
    fn begin(&self, needs_view: bool) -> Result<FlagGuard<'_>, AppResponse> {
        if self.is_syncing() || (needs_view && self.lock_view().is_none()) {
            return Err(AppResponse::Busy("処理中です。".to_string()));
        }
        FlagGuard::acquire(&self.busy).ok_or_else(|| AppResponse::Busy("処理中です。".to_string()))
    }

    fn current_view(&self) -> Result<Document, AppResponse> {
        self.lock_view()
            .clone()
            .ok_or_else(|| AppResponse::Busy("データを読み込み中です。".to_string()))
    }

    fn set_view(&self, document: Document) {
        *self.lock_view() = Some(document);
    }

    fn lock_view(&self) -> MutexGuard<'_, Option<Document>> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shows the failure to the user and hands it back for propagation.
    fn reject(&self, response: AppResponse) -> AppResponse {
        self.notifications.error(response.user_message());
        response
    }
}
