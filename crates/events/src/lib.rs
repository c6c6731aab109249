//! Fan-out delivery of state-change notifications.
//!
//! [`BroadcastBus`] keeps one unbounded channel per subscriber. Every
//! message published is delivered to each current subscriber in publish
//! order; a subscriber that has gone away simply stops receiving, nothing
//! is buffered or retried for it.
//!
//! The bus is transport-agnostic: the WebSocket layer turns each
//! [`Delivery`] into a frame.

pub mod bus;

pub use bus::{BroadcastBus, Delivery, SubscriberId, Subscription};
