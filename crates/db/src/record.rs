//! Flat row projection of an [`Entry`].
//!
//! Column order is fixed: `[id, title, artist, album, duration, addedBy,
//! addedAt]`. The contributor id is not stored, so entries loaded back
//! from the durable store have none.

use chrono::{DateTime, Utc};
use jamlist_core::playlist::Entry;
use jamlist_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Header row written above the data rows.
pub const HEADER: [&str; 7] = [
    "ID",
    "Title",
    "Artist",
    "Album",
    "Duration",
    "Added By",
    "Added At",
];

/// Number of columns in a row.
pub const COLUMN_COUNT: usize = HEADER.len();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceRecord {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
    pub added_by: String,
    /// RFC 3339 timestamp.
    pub added_at: String,
}

impl PersistenceRecord {
    /// Cells in column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.artist.clone(),
            self.album.clone(),
            self.duration.clone(),
            self.added_by.clone(),
            self.added_at.clone(),
        ]
    }

    /// Build a record from a row; missing trailing cells read as empty.
    pub fn from_row(row: &[String]) -> Self {
        let cell = |i: usize| row.get(i).cloned().unwrap_or_default();
        Self {
            id: cell(0),
            title: cell(1),
            artist: cell(2),
            album: cell(3),
            duration: cell(4),
            added_by: cell(5),
            added_at: cell(6),
        }
    }

    /// Convert back into an [`Entry`].
    ///
    /// An empty or unparseable `added_at` (e.g. a row typed in by hand)
    /// falls back to `now`.
    pub fn into_entry(self, now: Timestamp) -> Entry {
        let added_at = DateTime::parse_from_rfc3339(self.added_at.trim())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(now);

        Entry {
            id: self.id,
            title: self.title,
            artist: self.artist,
            album: non_empty(self.album),
            duration: non_empty(self.duration),
            added_by: self.added_by,
            contributor_id: None,
            added_at,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<&Entry> for PersistenceRecord {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            album: entry.album.clone().unwrap_or_default(),
            duration: entry.duration.clone().unwrap_or_default(),
            added_by: entry.added_by.clone(),
            added_at: entry.added_at.to_rfc3339(),
        }
    }
}
