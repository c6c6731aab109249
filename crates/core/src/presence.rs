//! Connected participants and their display names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ConnectionId;

/// One live connection that has announced itself with a display name.
///
/// Display names are not unique; the connection id is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

/// Registry of joined participants, at most one per connection.
///
/// Backed by a `BTreeMap` so snapshots come out in a stable order.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    participants: BTreeMap<ConnectionId, String>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) the participant for `connection_id`.
    pub fn join(&mut self, connection_id: ConnectionId, display_name: String) {
        self.participants.insert(connection_id, display_name);
    }

    /// Forget `connection_id`. Returns the display name it had, if any.
    pub fn leave(&mut self, connection_id: &str) -> Option<String> {
        self.participants.remove(connection_id)
    }

    pub fn display_name(&self, connection_id: &str) -> Option<&str> {
        self.participants.get(connection_id).map(String::as_str)
    }

    pub fn list_all(&self) -> Vec<Participant> {
        self.participants
            .iter()
            .map(|(connection_id, display_name)| Participant {
                connection_id: connection_id.clone(),
                display_name: display_name.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
