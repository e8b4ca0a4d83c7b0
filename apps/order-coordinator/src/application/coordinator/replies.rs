//! Broker reply routing.
//!
//! Every broker acknowledgement is published once, tagged with the
//! envelope's client order id. Two routings exist:
//!
//! - **Registry**: the dispatcher registers a reply slot before calling the
//!   broker. A router task reads the raw reply stream and forwards each
//!   reply to its slot.
//! - **Shared queue**: all watchers read the same queue and put back replies
//!   that are not theirs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, sleep_until, timeout_at};

use crate::domain::{ClientOrderId, ExecutionReport};

/// A broker acknowledgement tagged with the envelope that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BrokerReply {
    /// Client order id of the envelope.
    pub client_order_id: ClientOrderId,
    /// The acknowledgement.
    pub report: ExecutionReport,
}

/// Replies seen by a watcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ReplyWait {
    /// The reply for the watched envelope.
    pub matched: Option<ExecutionReport>,
    /// The last reply read, matching or not.
    pub last_seen: Option<ExecutionReport>,
}

impl ReplyWait {
    fn matched(report: ExecutionReport) -> Self {
        Self {
            matched: Some(report.clone()),
            last_seen: Some(report),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Client order id to dedicated reply channel.
#[derive(Debug, Default)]
pub(crate) struct ReplyRegistry {
    slots: DashMap<ClientOrderId, (u64, mpsc::UnboundedSender<BrokerReply>)>,
    generation: AtomicU64,
}

impl ReplyRegistry {
    /// Open a slot for `client_order_id`. A slot already open for the same
    /// id is replaced.
    pub fn register(self: &Arc<Self>, client_order_id: &ClientOrderId) -> ReplySlot {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        if self
            .slots
            .insert(client_order_id.clone(), (generation, tx))
            .is_some()
        {
            tracing::warn!(
                client_order_id = %client_order_id,
                "Reply slot already open for this id, replacing it"
            );
        }
        ReplySlot {
            registry: Arc::clone(self),
            client_order_id: client_order_id.clone(),
            generation,
            rx,
        }
    }

    /// Forward a reply to its slot. Returns false when no slot is open.
    pub fn route(&self, reply: BrokerReply) -> bool {
        let Some(slot) = self.slots.get(&reply.client_order_id) else {
            return false;
        };
        slot.1.send(reply).is_ok()
    }

    /// Number of open slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    fn release(&self, client_order_id: &ClientOrderId, generation: u64) {
        self.slots
            .remove_if(client_order_id, |_, (slot_generation, _)| {
                *slot_generation == generation
            });
    }
}

/// Receiving end of a registered slot. Closes the slot on drop.
#[derive(Debug)]
pub(crate) struct ReplySlot {
    registry: Arc<ReplyRegistry>,
    client_order_id: ClientOrderId,
    generation: u64,
    rx: mpsc::UnboundedReceiver<BrokerReply>,
}

impl Drop for ReplySlot {
    fn drop(&mut self) {
        self.registry
            .release(&self.client_order_id, self.generation);
    }
}

/// Route raw replies to their slots until the raw stream closes.
pub(crate) async fn route_replies(
    registry: Arc<ReplyRegistry>,
    mut raw: mpsc::UnboundedReceiver<BrokerReply>,
) {
    while let Some(reply) = raw.recv().await {
        let client_order_id = reply.client_order_id.clone();
        if !registry.route(reply) {
            tracing::warn!(
                client_order_id = %client_order_id,
                "Dropping broker reply with no open slot"
            );
        }
    }
    tracing::debug!("Reply router stopped");
}

// =============================================================================
// Shared queue
// =============================================================================

/// One queue shared by every watcher.
#[derive(Debug, Clone)]
pub(crate) struct SharedReplyQueue {
    tx: mpsc::UnboundedSender<BrokerReply>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<BrokerReply>>>,
}

impl Default for SharedReplyQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedReplyQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Append a reply.
    pub fn push(&self, reply: BrokerReply) {
        // The queue owns a receiver, so sending cannot fail.
        let _ = self.tx.send(reply);
    }

    /// Next reply, waiting until `deadline`.
    async fn recv_until(&self, deadline: Instant) -> Option<BrokerReply> {
        timeout_at(deadline, async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        })
        .await
        .ok()
        .flatten()
    }

    /// Read until the reply for `client_order_id` shows up or `deadline`
    /// passes. Other replies go back to the tail of the queue unchanged.
    async fn wait_for(
        &self,
        client_order_id: &ClientOrderId,
        deadline: Instant,
        backoff: Duration,
    ) -> ReplyWait {
        let mut wait = ReplyWait::default();
        while let Some(reply) = self.recv_until(deadline).await {
            if reply.client_order_id == *client_order_id {
                return ReplyWait::matched(reply.report);
            }
            wait.last_seen = Some(reply.report.clone());
            self.push(reply);

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep_until((now + backoff).min(deadline)).await;
        }
        wait
    }

    /// Non-blocking scan of the replies queued right now.
    ///
    /// Replies for other orders go back to the tail in the order they were
    /// read. Without a match, `last_seen` is the last of them.
    fn try_take(&self, client_order_id: &ClientOrderId) -> ReplyWait {
        let Ok(mut rx) = self.rx.try_lock() else {
            return ReplyWait::default();
        };

        let mut wait = ReplyWait::default();
        let mut skipped = Vec::new();
        for _ in 0..rx.len() {
            let Ok(reply) = rx.try_recv() else {
                break;
            };
            if reply.client_order_id == *client_order_id {
                wait = ReplyWait::matched(reply.report);
                break;
            }
            skipped.push(reply);
        }
        drop(rx);

        if wait.matched.is_none() {
            wait.last_seen = skipped.last().map(|reply| reply.report.clone());
        }
        for reply in skipped {
            self.push(reply);
        }
        wait
    }
}

// =============================================================================
// Dispatcher and watcher ends
// =============================================================================

/// Publishing end, owned by the dispatcher.
#[derive(Debug)]
pub(crate) enum ReplyChannel {
    /// Raw stream read by the router, plus the registry it feeds.
    Registry {
        /// Slot registry.
        registry: Arc<ReplyRegistry>,
        /// Raw reply stream.
        raw: mpsc::UnboundedSender<BrokerReply>,
    },
    /// Shared queue.
    Shared(SharedReplyQueue),
}

impl ReplyChannel {
    /// Prepare to receive the reply for `client_order_id`. Call before the
    /// broker call so the reply cannot arrive first.
    pub fn open(&self, client_order_id: &ClientOrderId) -> ReplyInbox {
        match self {
            Self::Registry { registry, .. } => {
                ReplyInbox::Dedicated(registry.register(client_order_id))
            }
            Self::Shared(queue) => ReplyInbox::Shared(queue.clone()),
        }
    }

    /// Publish a broker reply.
    pub fn publish(&self, reply: BrokerReply) {
        match self {
            Self::Registry { raw, .. } => {
                if raw.send(reply).is_err() {
                    tracing::warn!("Reply router has stopped, dropping broker reply");
                }
            }
            Self::Shared(queue) => queue.push(reply),
        }
    }
}

/// Receiving end, owned by one watcher.
#[derive(Debug)]
pub(crate) enum ReplyInbox {
    /// Registered slot.
    Dedicated(ReplySlot),
    /// Shared queue.
    Shared(SharedReplyQueue),
}

impl ReplyInbox {
    /// Wait for the reply of `client_order_id` until `deadline`. A reply
    /// already available is returned even when the deadline has passed.
    pub async fn wait_for(
        &mut self,
        client_order_id: &ClientOrderId,
        deadline: Instant,
        backoff: Duration,
    ) -> ReplyWait {
        match self {
            Self::Dedicated(slot) => match timeout_at(deadline, slot.rx.recv()).await {
                Ok(Some(reply)) => ReplyWait::matched(reply.report),
                Ok(None) | Err(_) => ReplyWait::default(),
            },
            Self::Shared(queue) => queue.wait_for(client_order_id, deadline, backoff).await,
        }
    }

    /// Take the reply only if it is already available.
    pub fn try_take(&mut self, client_order_id: &ClientOrderId) -> ReplyWait {
        match self {
            Self::Dedicated(slot) => slot
                .rx
                .try_recv()
                .map_or_else(|_| ReplyWait::default(), |reply| ReplyWait::matched(reply.report)),
            Self::Shared(queue) => queue.try_take(client_order_id),
        }
    }
}
