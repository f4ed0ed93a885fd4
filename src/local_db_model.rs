//! Data model definitions for persisted state.
//!
//! This module defines the structures that are serialized into local storage:
//! the grouped option-list [`Document`], the [`OfflineAction`] entries recorded
//! while disconnected, and the [`PhotoRecord`] entries kept by the photo store.
//! Field names on the wire follow the layout already present in users'
//! storage (`activeGroup`, `field-1`, `listId`, ...), so existing data keeps
//! loading.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Group created when no document exists yet.
pub const DEFAULT_GROUP_NAME: &str = "共通";

/// Options that are always offered for [`ListId::Field3`].
///
/// They are merged in at read time and are never written to storage, so they
/// can be neither duplicated nor deleted.
pub const SYSTEM_DEFAULT_OPTIONS_FIELD_3: [&str; 4] = ["定期点検", "6ヶ月点検", "年次点検", "定期清掃"];

/// Identifies one of the three option lists held by every group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ListId {
    #[serde(rename = "field-1")]
    Field1,
    #[serde(rename = "field-2")]
    Field2,
    #[serde(rename = "field-3")]
    Field3,
}

impl ListId {
    pub const ALL: [ListId; 3] = [ListId::Field1, ListId::Field2, ListId::Field3];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListId::Field1 => "field-1",
            ListId::Field2 => "field-2",
            ListId::Field3 => "field-3",
        }
    }

    /// Human label of the list, also used in export file names.
    pub fn label(&self) -> &'static str {
        match self {
            ListId::Field1 => "設備",
            ListId::Field2 => "対象",
            ListId::Field3 => "種類",
        }
    }

    /// Maps a whiteboard input slot to the list that autofills it.
    pub fn from_slot(index: usize) -> Option<ListId> {
        match index {
            1 => Some(ListId::Field1),
            3 => Some(ListId::Field2),
            5 => Some(ListId::Field3),
            _ => None,
        }
    }

    /// True when `item` is one of the built-in options of this list.
    pub fn is_system_default(&self, item: &str) -> bool {
        *self == ListId::Field3 && SYSTEM_DEFAULT_OPTIONS_FIELD_3.contains(&item)
    }
}

/// The three option lists of a single group. Newest entries come first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLists {
    #[serde(rename = "field-1", default)]
    pub field_1: Vec<String>,
    #[serde(rename = "field-2", default)]
    pub field_2: Vec<String>,
    #[serde(rename = "field-3", default)]
    pub field_3: Vec<String>,
}

impl GroupLists {
    pub fn list(&self, id: ListId) -> &Vec<String> {
        match id {
            ListId::Field1 => &self.field_1,
            ListId::Field2 => &self.field_2,
            ListId::Field3 => &self.field_3,
        }
    }

    pub fn list_mut(&mut self, id: ListId) -> &mut Vec<String> {
        match id {
            ListId::Field1 => &mut self.field_1,
            ListId::Field2 => &mut self.field_2,
            ListId::Field3 => &mut self.field_3,
        }
    }
}

/// The single structured record behind the option lists.
///
/// Groups are held behind [`Arc`] so cloning a document is cheap and an edit
/// only copies the group it touches (see [`Document::group_mut`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "activeGroup")]
    pub active_group: String,
    #[serde(default)]
    pub groups: BTreeMap<String, Arc<GroupLists>>,
}

impl Document {
    /// A document holding one empty group, which is also the active one.
    pub fn with_default_group(name: &str) -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(name.to_string(), Arc::new(GroupLists::default()));
        Document {
            active_group: name.to_string(),
            groups,
        }
    }

    /// Restores the document invariants: at least one group, and an active
    /// group that exists. Returns true if anything had to change.
    pub fn heal(&mut self, default_group: &str) -> bool {
        let mut changed = false;
        if self.groups.is_empty() {
            self.groups
                .insert(default_group.to_string(), Arc::new(GroupLists::default()));
            self.active_group = default_group.to_string();
            changed = true;
        }
        if !self.groups.contains_key(&self.active_group) {
            self.active_group = self
                .groups
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| default_group.to_string());
            changed = true;
        }
        changed
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    /// Stored entries of a list, or an empty slice when the group is unknown.
    pub fn stored(&self, group: &str, id: ListId) -> &[String] {
        self.groups
            .get(group)
            .map(|lists| lists.list(id).as_slice())
            .unwrap_or(&[])
    }

    /// Options the user can pick from: the stored entries, with the system
    /// defaults merged in front for [`ListId::Field3`].
    pub fn effective_options(&self, group: &str, id: ListId) -> Vec<String> {
        let stored = self.stored(group, id);
        if id != ListId::Field3 {
            return stored.to_vec();
        }
        let mut options: Vec<String> = Vec::with_capacity(stored.len() + 4);
        for item in SYSTEM_DEFAULT_OPTIONS_FIELD_3
            .iter()
            .map(|s| s.to_string())
            .chain(stored.iter().cloned())
        {
            if !options.contains(&item) {
                options.push(item);
            }
        }
        options
    }

    /// Mutable access to a group's lists, creating the group when absent.
    /// Other documents sharing the same group are left untouched.
    pub fn group_mut(&mut self, group: &str) -> &mut GroupLists {
        let entry = self
            .groups
            .entry(group.to_string())
            .or_insert_with(|| Arc::new(GroupLists::default()));
        Arc::make_mut(entry)
    }

    /// Replacement active group once the current one has been removed.
    pub(crate) fn fallback_active(&self, default_group: &str) -> String {
        self.groups
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| default_group.to_string())
    }
}

/// A mutation recorded while offline, replayed later against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OfflineAction {
    Add {
        group: String,
        #[serde(rename = "listId")]
        list_id: ListId,
        item: String,
    },
    Delete {
        group: String,
        #[serde(rename = "listId")]
        list_id: ListId,
        item: String,
    },
    Replace {
        group: String,
        #[serde(rename = "listId")]
        list_id: ListId,
        #[serde(rename = "newList")]
        new_list: Vec<String>,
    },
    DeleteGroup {
        group: String,
    },
    SetActiveGroup {
        group: String,
    },
}

impl OfflineAction {
    /// Whether a queued `earlier` action is made redundant by this one.
    ///
    /// Only `replace` (per group and list) and `setActiveGroup` coalesce;
    /// `add` and `delete` always replay individually.
    pub fn supersedes(&self, earlier: &OfflineAction) -> bool {
        match (self, earlier) {
            (
                OfflineAction::Replace { group, list_id, .. },
                OfflineAction::Replace {
                    group: earlier_group,
                    list_id: earlier_list,
                    ..
                },
            ) => group == earlier_group && list_id == earlier_list,
            (OfflineAction::SetActiveGroup { .. }, OfflineAction::SetActiveGroup { .. }) => true,
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OfflineAction::Add { .. } => "add",
            OfflineAction::Delete { .. } => "delete",
            OfflineAction::Replace { .. } => "replace",
            OfflineAction::DeleteGroup { .. } => "deleteGroup",
            OfflineAction::SetActiveGroup { .. } => "setActiveGroup",
        }
    }
}

/// A captured, composed photo kept for later review.
///
/// Records are immutable once stored; `id` is assigned by the photo store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: u64,
    /// Encoded image, usually a `data:image/jpeg;base64,...` URL.
    #[serde(rename = "imageData")]
    pub image_data: String,
    pub filename: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
