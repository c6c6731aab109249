/// Opaque, server-generated identifier of a playlist entry.
pub type EntryId = String;

/// Opaque identifier of a live push-channel connection.
pub type ConnectionId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh entry identifier (UUID v4, hyphenated).
pub fn new_entry_id() -> EntryId {
    uuid::Uuid::new_v4().to_string()
}
