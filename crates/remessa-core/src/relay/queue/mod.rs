use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{debug, info};
use uuid::Uuid;

use crate::message::Message;
use crate::relay::command::{LeasedMessage, QueueCommand};
use crate::relay::config::QueueConfig;

mod delivery;
mod handlers;
mod recovery;

/// A registered dispatch worker waiting for leased messages.
pub(super) struct WorkerEntry {
    pub(super) tx: tokio::sync::mpsc::Sender<LeasedMessage>,
}

/// Single-threaded delivery queue core. Owns all mutable queue state and
/// processes commands from IO tasks via a crossbeam channel, which makes
/// every lease/ack/nack atomic with respect to concurrent workers.
pub(super) struct DeliveryQueue {
    inbound: Receiver<QueueCommand>,
    idle_timeout: Duration,
    lease_timeout_ns: u64,
    max_attempts: u32,
    capacity: usize,
    retention: usize,
    shutdown_grace: Duration,
    running: bool,
    workers: HashMap<String, WorkerEntry>,
    /// Round-robin cursor for distributing leases across workers.
    worker_rr_idx: usize,
    /// All non-terminal messages by id.
    pub(super) messages: HashMap<Uuid, Message>,
    /// Messages eligible for leasing, in `(enqueued_at, id)` order — FIFO
    /// among everything past its retry delay.
    pub(super) ready: BTreeSet<(u64, Uuid)>,
    /// Messages waiting out a retry delay, keyed `(eligible_at, id)`.
    pub(super) delayed: BTreeSet<(u64, Uuid)>,
    /// Active leases: message id → expiry (unix nanos).
    pub(super) leases: HashMap<Uuid, u64>,
    /// Expiry-ordered lease index, keyed `(expires_at, id)`.
    pub(super) lease_expiry: BTreeSet<(u64, Uuid)>,
    /// Recently delivered ids, for idempotent ack. Bounded by `retention`.
    delivered_ids: HashSet<Uuid>,
    delivered_order: VecDeque<Uuid>,
    /// Recently failed messages retained for audit. Bounded by `retention`.
    pub(super) failed: VecDeque<Message>,
    delivered_total: u64,
    failed_total: u64,
}

/// Current wall clock as unix nanos.
pub(super) fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

impl DeliveryQueue {
    pub(super) fn new(inbound: Receiver<QueueCommand>, config: &QueueConfig) -> Self {
        Self {
            inbound,
            idle_timeout: Duration::from_millis(config.idle_timeout_ms),
            lease_timeout_ns: config.lease_timeout_ms * 1_000_000,
            max_attempts: config.max_attempts,
            capacity: config.capacity,
            retention: config.retention,
            shutdown_grace: Duration::from_millis(config.shutdown_grace_ms),
            running: true,
            workers: HashMap::new(),
            worker_rr_idx: 0,
            messages: HashMap::new(),
            ready: BTreeSet::new(),
            delayed: BTreeSet::new(),
            leases: HashMap::new(),
            lease_expiry: BTreeSet::new(),
            delivered_ids: HashSet::new(),
            delivered_order: VecDeque::new(),
            failed: VecDeque::new(),
            delivered_total: 0,
            failed_total: 0,
        }
    }

    /// Run the queue event loop. This blocks the current thread until a
    /// `Shutdown` command is received or the inbound channel is disconnected.
    pub(super) fn run(&mut self) {
        info!("delivery queue started");

        while self.running {
            // Phase 1: Drain all buffered commands (non-blocking)
            let mut drained = 0;
            while let Ok(cmd) = self.inbound.try_recv() {
                self.handle_command(cmd);
                drained += 1;
                if !self.running {
                    break;
                }
            }

            // Phase 2: Periodic work — promote messages past their retry
            // delay, reclaim expired leases, hand ready messages to workers.
            let now = now_ns();
            self.promote_delayed(now);
            self.reclaim_expired(now);
            self.deliver_ready();

            if !self.running {
                break;
            }

            // Phase 3: Park until next command or timeout
            if drained == 0 {
                match self.inbound.recv_timeout(self.idle_timeout) {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        // Normal idle wakeup — Phase 2 runs again next loop
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                        info!("inbound channel disconnected, shutting down");
                        self.running = false;
                    }
                }
            }
        }

        self.drain_in_flight();
        self.release_leases();

        info!("delivery queue stopped");
    }

    fn handle_command(&mut self, cmd: QueueCommand) {
        match cmd {
            QueueCommand::Enqueue { message, reply } => {
                debug!(msg_id = %message.id, "enqueue command received");
                let result = self.handle_enqueue(message);
                let _ = reply.send(result);
                // Hand the new message to a worker right away if one is idle
                self.deliver_ready();
            }
            QueueCommand::Ack { msg_id, reply } => {
                debug!(%msg_id, "ack command received");
                let result = self.handle_ack(&msg_id);
                let _ = reply.send(result);
            }
            QueueCommand::Nack {
                msg_id,
                retry_after_ms,
                error,
                reply,
            } => {
                debug!(%msg_id, retry_after_ms, %error, "nack command received");
                let result = self.handle_nack(&msg_id, retry_after_ms, &error);
                let ok = result.is_ok();
                let _ = reply.send(result);
                if ok {
                    // A zero-delay nack is immediately eligible again
                    self.promote_delayed(now_ns());
                    self.deliver_ready();
                }
            }
            QueueCommand::RegisterWorker { worker_id, tx } => {
                info!(%worker_id, "dispatch worker registered");
                self.workers.insert(worker_id, WorkerEntry { tx });
                self.deliver_ready();
            }
            QueueCommand::UnregisterWorker { worker_id } => {
                info!(%worker_id, "dispatch worker unregistered");
                self.workers.remove(&worker_id);
            }
            QueueCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            QueueCommand::ListFailed { reply } => {
                let _ = reply.send(self.failed.iter().cloned().collect());
            }
            QueueCommand::Shutdown => {
                info!("shutdown command received, draining remaining commands");
                self.running = false;
            }
        }
    }
}

#[cfg(test)]
mod tests;
