use serde::Serialize;
use uuid::Uuid;

use crate::error::{AckError, EnqueueError, NackError};
use crate::message::{Message, Payload};

/// A leased message handed to a dispatch worker. `attempt` is the attempt
/// number this lease starts (1 for the first delivery).
#[derive(Debug, Clone)]
pub struct LeasedMessage {
    pub msg_id: Uuid,
    pub payload: Payload,
    pub attempt: u32,
}

/// Counters reported by the queue core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Messages waiting for delivery, including those in a retry delay.
    pub pending: usize,
    /// Messages currently leased to a worker.
    pub in_flight: usize,
    /// Total messages delivered since startup.
    pub delivered: u64,
    /// Total messages terminally failed since startup.
    pub failed: u64,
}

/// Commands sent from IO tasks to the single-threaded queue core.
///
/// Each variant that expects a response includes a `tokio::sync::oneshot::Sender`
/// for the reply. Fire-and-forget commands omit the reply channel.
pub enum QueueCommand {
    Enqueue {
        message: Message,
        reply: tokio::sync::oneshot::Sender<Result<Uuid, EnqueueError>>,
    },
    Ack {
        msg_id: Uuid,
        reply: tokio::sync::oneshot::Sender<Result<(), AckError>>,
    },
    Nack {
        msg_id: Uuid,
        /// How long the message stays in the delay area before it may be
        /// leased again.
        retry_after_ms: u64,
        error: String,
        reply: tokio::sync::oneshot::Sender<Result<(), NackError>>,
    },
    RegisterWorker {
        worker_id: String,
        tx: tokio::sync::mpsc::Sender<LeasedMessage>,
    },
    UnregisterWorker {
        worker_id: String,
    },
    Stats {
        reply: tokio::sync::oneshot::Sender<QueueStats>,
    },
    /// Retained terminally-failed messages, newest last.
    ListFailed {
        reply: tokio::sync::oneshot::Sender<Vec<Message>>,
    },
    Shutdown,
}
