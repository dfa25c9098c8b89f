use tracing::{debug, warn};

use super::{now_ns, DeliveryQueue};
use crate::message::MessageState;
use crate::relay::command::LeasedMessage;

impl DeliveryQueue {
    /// Hand ready messages to workers in FIFO order until the ready set is
    /// empty or no worker can accept. Skipped entirely once shutdown has
    /// begun — no new leases are written while draining.
    pub(super) fn deliver_ready(&mut self) {
        if !self.running || self.workers.is_empty() {
            return;
        }

        while let Some(entry) = self.ready.pop_first() {
            let (_, msg_id) = entry;
            let Some(msg) = self.messages.get(&msg_id) else {
                warn!(%msg_id, "ready entry without message, dropping");
                continue;
            };

            let attempt = msg.attempt_count + 1;
            let now = now_ns();
            let expires_at = now + self.lease_timeout_ns;
            let leased = LeasedMessage {
                msg_id,
                payload: msg.payload.clone(),
                attempt,
            };

            // Lease BEFORE handing off. If no worker accepts, the lease is
            // rolled back; the reverse order risks a delivery without a
            // lease, which means duplicates.
            self.leases.insert(msg_id, expires_at);
            self.lease_expiry.insert((expires_at, msg_id));

            if self.send_to_worker(leased) {
                if let Some(msg) = self.messages.get_mut(&msg_id) {
                    msg.state = MessageState::InFlight;
                    msg.attempt_count = attempt;
                    msg.last_attempt_at = Some(now);
                }
            } else {
                self.leases.remove(&msg_id);
                self.lease_expiry.remove(&(expires_at, msg_id));
                self.ready.insert(entry);
                break;
            }
        }
    }

    /// Try workers in round-robin until one accepts. Returns true on a
    /// successful hand-off.
    fn send_to_worker(&mut self, leased: LeasedMessage) -> bool {
        let worker_ids: Vec<String> = self.workers.keys().cloned().collect();
        let mut attempts = 0;

        while attempts < worker_ids.len() {
            let wid = &worker_ids[self.worker_rr_idx % worker_ids.len()];
            self.worker_rr_idx = self.worker_rr_idx.wrapping_add(1);
            attempts += 1;

            let Some(entry) = self.workers.get(wid) else {
                continue;
            };

            match entry.tx.try_send(leased.clone()) {
                Ok(()) => return true,
                Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                    debug!(worker = %wid, msg_id = %leased.msg_id, "worker busy, trying next");
                }
                Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                    warn!(worker = %wid, msg_id = %leased.msg_id, "worker channel closed, trying next");
                }
            }
        }

        false
    }
}
