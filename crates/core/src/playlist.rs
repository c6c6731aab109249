//! Playlist entries and the authoritative in-memory playlist.
//!
//! [`PlaylistStore`] is a plain ordered collection; it does no locking of
//! its own. The sync engine owns it behind a single mutex so every
//! mutation is serialized.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ConnectionId, EntryId, Timestamp};

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One song in the shared playlist. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Display name of whoever added the entry.
    pub added_by: String,
    /// Connection that added the entry, if it came over the push channel
    /// (or the REST caller supplied one).
    pub contributor_id: Option<ConnectionId>,
    pub added_at: Timestamp,
}

impl Entry {
    /// `id`, `title`, `artist` and `addedBy` are all non-blank.
    pub fn has_required_fields(&self) -> bool {
        [&self.id, &self.title, &self.artist, &self.added_by]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// Client-supplied fields for a new entry, before validation.
///
/// Every field is optional on the wire so that missing and empty values
/// are reported uniformly by [`NewEntry::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub added_by: Option<String>,
    #[serde(default)]
    pub contributor_id: Option<ConnectionId>,
}

/// A [`NewEntry`] whose required fields have been checked and trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntry {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration: Option<String>,
    pub added_by: String,
}

impl NewEntry {
    /// Check that `title`, `artist` and `addedBy` are present and not blank.
    ///
    /// Optional fields that are blank are normalized to `None`.
    pub fn validate(&self) -> Result<ValidatedEntry, CoreError> {
        let mut missing = Vec::new();
        let title = required(&self.title, "title", &mut missing);
        let artist = required(&self.artist, "artist", &mut missing);
        let added_by = required(&self.added_by, "addedBy", &mut missing);

        if !missing.is_empty() {
            return Err(CoreError::Validation(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )));
        }

        Ok(ValidatedEntry {
            title,
            artist,
            album: optional(&self.album),
            duration: optional(&self.duration),
            added_by,
        })
    }
}

fn required(value: &Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ValidatedEntry {
    /// Build the final [`Entry`] with server-assigned identity and time.
    pub fn into_entry(
        self,
        id: EntryId,
        contributor_id: Option<ConnectionId>,
        added_at: Timestamp,
    ) -> Entry {
        Entry {
            id,
            title: self.title,
            artist: self.artist,
            album: self.album,
            duration: self.duration,
            added_by: self.added_by,
            contributor_id,
            added_at,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaylistStore
// ---------------------------------------------------------------------------

/// Ordered, in-memory playlist. Insertion order is preserved.
#[derive(Debug, Default)]
pub struct PlaylistStore {
    entries: Vec<Entry>,
    /// Latest `added_at` handed out; keeps timestamps non-decreasing even
    /// if the wall clock steps backwards.
    last_added_at: Option<Timestamp>,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current playlist, in insertion order.
    pub fn list_all(&self) -> Vec<Entry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Add an entry at the end.
    ///
    /// The caller must supply a fresh id; a duplicate is a programming
    /// error and trips a debug assertion.
    pub fn append(&mut self, entry: Entry) {
        debug_assert!(
            !self.contains(&entry.id),
            "duplicate entry id {} appended",
            entry.id
        );
        self.observe(entry.added_at);
        self.entries.push(entry);
    }

    /// Remove and return the entry with the given id.
    pub fn remove_by_id(&mut self, id: &str) -> Result<Entry, CoreError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "Song",
                id: id.to_string(),
            })?;
        Ok(self.entries.remove(index))
    }

    /// Empty the playlist, returning what it held.
    pub fn clear(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.entries)
    }

    /// Substitute the whole playlist (reconciliation from durable storage).
    ///
    /// Entries missing a required field, and later copies of an id already
    /// seen, are left out and returned so the caller can report them.
    pub fn replace_all(&mut self, entries: Vec<Entry>) -> Vec<Entry> {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();

        for entry in entries {
            if !entry.has_required_fields() || !seen.insert(entry.id.clone()) {
                rejected.push(entry);
                continue;
            }
            self.observe(entry.added_at);
            kept.push(entry);
        }
        self.entries = kept;
        rejected
    }

    /// Timestamp for a new entry: `now`, clamped so it never precedes any
    /// timestamp this store has already seen.
    pub fn next_added_at(&self, now: Timestamp) -> Timestamp {
        match self.last_added_at {
            Some(last) if last > now => last,
            _ => now,
        }
    }

    fn observe(&mut self, ts: Timestamp) {
        match self.last_added_at {
            Some(last) if last >= ts => {}
            _ => self.last_added_at = Some(ts),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
