use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

/// Identifier of one subscriber; doubles as the connection id.
pub type SubscriberId = String;

/// One item delivered to a subscriber.
pub enum Delivery<M> {
    /// An application message. Shared between all recipients.
    Message(Arc<M>),
    /// Keep-alive probe; the transport should answer with a ping frame.
    Ping,
    /// The bus is shutting down; the transport should close the connection.
    Close,
}

impl<M> Clone for Delivery<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Message(m) => Self::Message(Arc::clone(m)),
            Self::Ping => Self::Ping,
            Self::Close => Self::Close,
        }
    }
}

impl<M: fmt::Debug> fmt::Debug for Delivery<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(m) => f.debug_tuple("Message").field(m).finish(),
            Self::Ping => f.write_str("Ping"),
            Self::Close => f.write_str("Close"),
        }
    }
}

/// Receiving side handed out by [`BroadcastBus::subscribe`].
///
/// Dropping it (or its receiver) detaches the subscriber: the bus prunes
/// closed channels on the next publish.
pub struct Subscription<M> {
    pub id: SubscriberId,
    pub receiver: mpsc::UnboundedReceiver<Delivery<M>>,
}

/// Publish/subscribe hub with per-subscriber FIFO delivery.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct BroadcastBus<M> {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<Delivery<M>>>>,
}

impl<M: Send + Sync + 'static> BroadcastBus<M> {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new subscriber under a freshly generated id.
    pub async fn subscribe(&self) -> Subscription<M> {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.insert(id.clone(), tx);
        tracing::debug!(subscriber = %id, "Subscriber registered");
        Subscription { id, receiver: rx }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub async fn unsubscribe(&self, id: &str) {
        if self.subscribers.write().await.remove(id).is_some() {
            tracing::debug!(subscriber = %id, "Subscriber removed");
        }
    }

    /// Deliver `message` to exactly one subscriber.
    ///
    /// Returns `false` if the subscriber is unknown or already gone.
    pub async fn send_to(&self, id: &str, message: M) -> bool {
        let subscribers = self.subscribers.read().await;
        match subscribers.get(id) {
            Some(tx) => tx.send(Delivery::Message(Arc::new(message))).is_ok(),
            None => false,
        }
    }

    /// Deliver `message` to every current subscriber.
    ///
    /// Returns the number of subscribers it reached. Subscribers whose
    /// receivers were dropped are pruned.
    pub async fn publish(&self, message: M) -> usize {
        let delivery = Delivery::Message(Arc::new(message));
        self.fan_out(delivery).await
    }

    /// Number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Send a keep-alive [`Delivery::Ping`] to every subscriber.
    pub async fn ping_all(&self) {
        self.fan_out(Delivery::Ping).await;
    }

    /// Send [`Delivery::Close`] to every subscriber, then forget them all.
    pub async fn shutdown_all(&self) {
        let mut subscribers = self.subscribers.write().await;
        let count = subscribers.len();
        for tx in subscribers.values() {
            let _ = tx.send(Delivery::Close);
        }
        subscribers.clear();
        tracing::info!(count, "Closed all subscribers");
    }

    async fn fan_out(&self, delivery: Delivery<M>) -> usize {
        let mut closed = Vec::new();
        let mut reached = 0;
        {
            let subscribers = self.subscribers.read().await;
            for (id, tx) in subscribers.iter() {
                if tx.send(delivery.clone()).is_ok() {
                    reached += 1;
                } else {
                    closed.push(id.clone());
                }
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &closed {
                subscribers.remove(id);
            }
            tracing::debug!(pruned = closed.len(), "Pruned closed subscribers");
        }
        reached
    }
}

impl<M: Send + Sync + 'static> Default for BroadcastBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
