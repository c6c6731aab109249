//! Push-channel message protocol.
//!
//! Messages are JSON objects with an internally-tagged `"type"`
//! discriminator so clients can route them by type string.

use serde::{Deserialize, Serialize};

use crate::playlist::{Entry, NewEntry};
use crate::presence::Participant;
use crate::types::EntryId;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Messages a client sends to the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Announce presence under a display name.
    #[serde(rename = "join", rename_all = "camelCase")]
    Join { display_name: String },

    /// Add an entry. The contributor id is always the sending connection.
    #[serde(rename = "add")]
    Add {
        #[serde(flatten)]
        fields: NewEntry,
    },

    /// Remove an entry by id.
    #[serde(rename = "remove")]
    Remove { id: EntryId },
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// What kind of mutation a [`ServerMessage::StateChanged`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateAction {
    Add,
    Remove,
    Clear,
}

/// Messages the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full playlist, sent only to a connection that just joined.
    #[serde(rename = "initialState")]
    InitialState { playlist: Vec<Entry> },

    /// A mutation was applied; carries the affected entry and the full
    /// resulting playlist. Broadcast to everyone, the originator included.
    #[serde(rename = "stateChanged")]
    StateChanged {
        action: StateAction,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        entry: Option<Entry>,
        playlist: Vec<Entry>,
    },

    /// The set of joined participants changed.
    #[serde(rename = "participantsChanged")]
    ParticipantsChanged {
        participants: Vec<Participant>,
        total: usize,
    },

    /// A request from this connection was rejected. Sent only to it.
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn participants_changed(participants: Vec<Participant>) -> Self {
        let total = participants.len();
        Self::ParticipantsChanged {
            participants,
            total,
        }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
