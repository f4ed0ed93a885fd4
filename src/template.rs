//! Text content of the whiteboard overlay.
//!
//! The board is a grid of five rows with two cells each: a fixed label on
//! the left (even slot) and the user's value on the right (odd slot). The
//! renderer draws whatever [`WhiteboardTemplate::texts`] holds.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::local_db_model::ListId;

pub const SLOT_COUNT: usize = 10;
pub const DATE_SLOT: usize = 7;
pub const COMPANY_SLOT: usize = 9;

const LABELS: [(usize, &str); 5] = [(0, "設備"), (2, "対象"), (4, "種類"), (6, "日付"), (8, "会社名")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhiteboardTemplate {
    texts: [String; SLOT_COUNT],
}

impl WhiteboardTemplate {
    /// Labels filled in, the date slot set to `today`, and the company slot
    /// set to `company`.
    pub fn new(today: NaiveDate, company: &str) -> Self {
        let mut texts: [String; SLOT_COUNT] = Default::default();
        for (slot, label) in LABELS {
            texts[slot] = label.to_string();
        }
        texts[DATE_SLOT] = today.format("%Y-%m-%d").to_string();
        texts[COMPANY_SLOT] = company.to_string();
        WhiteboardTemplate { texts }
    }

    pub fn texts(&self) -> &[String; SLOT_COUNT] {
        &self.texts
    }

    pub fn text(&self, slot: usize) -> Option<&str> {
        self.texts.get(slot).map(String::as_str)
    }

    /// Sets an input slot. Label slots and out-of-range slots are read-only
    /// and return false.
    pub fn set_text(&mut self, slot: usize, value: &str) -> bool {
        if slot >= SLOT_COUNT || slot % 2 == 0 {
            return false;
        }
        self.texts[slot] = value.to_string();
        true
    }

    /// The text of the slot bound to `list_id`, as typed by the user.
    pub fn list_value(&self, list_id: ListId) -> &str {
        &self.texts[list_slot(list_id)]
    }

    /// Writes an option picked from the saved list into its slot.
    pub fn select_option(&mut self, list_id: ListId, value: &str) {
        self.texts[list_slot(list_id)] = value.to_string();
    }

    /// Clears the list-backed slots whose options depend on the group.
    /// Used when the active group changes.
    pub fn clear_group_values(&mut self) {
        self.texts[1].clear();
        self.texts[3].clear();
    }
}

fn list_slot(list_id: ListId) -> usize {
    match list_id {
        ListId::Field1 => 1,
        ListId::Field2 => 3,
        ListId::Field3 => 5,
    }
}

/// Name under which a composed photo is saved, e.g.
/// `whiteboard_20240115_103000.jpg`.
pub fn photo_filename<Tz: TimeZone>(taken_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("whiteboard_{}.jpg", taken_at.format("%Y%m%d_%H%M%S"))
}

/// Template for today in the local time zone.
pub fn today_template(company: &str) -> WhiteboardTemplate {
    WhiteboardTemplate::new(Local::now().date_naive(), company)
}
