use crossbeam_channel::Sender;
use uuid::Uuid;

use crate::error::{AckError, EnqueueError, NackError};
use crate::message::{Message, Payload};
use crate::relay::command::{LeasedMessage, QueueCommand, QueueStats};
use crate::relay::config::QueueConfig;
use crate::relay::queue::DeliveryQueue;

pub(super) fn test_config() -> QueueConfig {
    QueueConfig {
        capacity: 64,
        lease_timeout_ms: 60_000,
        max_attempts: 3,
        retention: 16,
        command_channel_capacity: 256,
        idle_timeout_ms: 10,
        shutdown_grace_ms: 0,
    }
}

pub(super) fn test_queue() -> (Sender<QueueCommand>, DeliveryQueue) {
    test_queue_with(test_config())
}

pub(super) fn test_queue_with(config: QueueConfig) -> (Sender<QueueCommand>, DeliveryQueue) {
    let (tx, rx) = crossbeam_channel::bounded(config.command_channel_capacity);
    let queue = DeliveryQueue::new(rx, &config);
    (tx, queue)
}

pub(super) fn test_message(text: &str, enqueued_at: u64) -> Message {
    Message::new(
        Payload {
            message: text.to_string(),
            is_valid: true,
        },
        enqueued_at,
    )
}

pub(super) fn send_enqueue(
    tx: &Sender<QueueCommand>,
    message: Message,
) -> tokio::sync::oneshot::Receiver<Result<Uuid, EnqueueError>> {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    tx.send(QueueCommand::Enqueue {
        message,
        reply: reply_tx,
    })
    .unwrap();
    reply_rx
}

pub(super) fn send_ack(
    tx: &Sender<QueueCommand>,
    msg_id: Uuid,
) -> tokio::sync::oneshot::Receiver<Result<(), AckError>> {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    tx.send(QueueCommand::Ack {
        msg_id,
        reply: reply_tx,
    })
    .unwrap();
    reply_rx
}

pub(super) fn send_nack(
    tx: &Sender<QueueCommand>,
    msg_id: Uuid,
    retry_after_ms: u64,
    error: &str,
) -> tokio::sync::oneshot::Receiver<Result<(), NackError>> {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    tx.send(QueueCommand::Nack {
        msg_id,
        retry_after_ms,
        error: error.to_string(),
        reply: reply_tx,
    })
    .unwrap();
    reply_rx
}

pub(super) fn request_stats(
    tx: &Sender<QueueCommand>,
) -> tokio::sync::oneshot::Receiver<QueueStats> {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    tx.send(QueueCommand::Stats { reply: reply_tx }).unwrap();
    reply_rx
}

/// Register a worker channel with the given capacity and return its receiver.
pub(super) fn register_worker(
    tx: &Sender<QueueCommand>,
    worker_id: &str,
    capacity: usize,
) -> tokio::sync::mpsc::Receiver<LeasedMessage> {
    let (worker_tx, worker_rx) = tokio::sync::mpsc::channel(capacity);
    tx.send(QueueCommand::RegisterWorker {
        worker_id: worker_id.to_string(),
        tx: worker_tx,
    })
    .unwrap();
    worker_rx
}
