//! Shared domain types for the collaborative playlist.
//!
//! Everything here is plain data plus the in-memory stores; no I/O, no
//! async. The sync engine, persistence adapters and transport all build on
//! these definitions.

pub mod error;
pub mod playlist;
pub mod presence;
pub mod protocol;
pub mod types;
