use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::DeliveryQueue;
use crate::message::MessageState;

impl DeliveryQueue {
    /// Move delayed messages whose retry delay has elapsed back into the
    /// ready set, keyed by their original enqueue time so FIFO order is
    /// preserved across retries.
    pub(super) fn promote_delayed(&mut self, now_ns: u64) {
        while let Some(&(eligible_at, msg_id)) = self.delayed.iter().next() {
            if eligible_at > now_ns {
                break;
            }
            self.delayed.remove(&(eligible_at, msg_id));

            let Some(msg) = self.messages.get(&msg_id) else {
                warn!(%msg_id, "delayed entry without message, dropping");
                continue;
            };
            self.ready.insert((msg.enqueued_at, msg_id));
        }
    }

    /// Reclaim leases whose expiry has passed: the worker crashed, hung, or
    /// lost its ack. The message reverts to pending — or goes terminal if
    /// its attempts are already exhausted, so it is never leased again.
    /// Returns the number of leases reclaimed.
    pub(super) fn reclaim_expired(&mut self, now_ns: u64) -> u64 {
        let mut reclaimed = 0u64;

        while let Some(&(expires_at, msg_id)) = self.lease_expiry.iter().next() {
            if expires_at > now_ns {
                break;
            }
            self.lease_expiry.remove(&(expires_at, msg_id));

            if self.leases.remove(&msg_id).is_none() {
                // Stale index entry — the lease was already settled
                continue;
            }

            let exhausted = match self.messages.get(&msg_id) {
                Some(msg) => msg.attempt_count >= self.max_attempts,
                None => {
                    warn!(%msg_id, "expired lease without message, dropping");
                    continue;
                }
            };

            if exhausted {
                if let Some(mut msg) = self.messages.remove(&msg_id) {
                    msg.state = MessageState::Failed;
                    msg.last_error
                        .get_or_insert_with(|| "lease expired".to_string());
                    error!(
                        %msg_id,
                        attempts = msg.attempt_count,
                        "lease expired after final attempt, message failed"
                    );
                    self.remember_failed(msg);
                    self.failed_total += 1;
                }
            } else if let Some(msg) = self.messages.get_mut(&msg_id) {
                msg.state = MessageState::Pending;
                self.ready.insert((msg.enqueued_at, msg_id));
                debug!(%msg_id, attempts = msg.attempt_count, "reclaimed expired lease");
            }
            reclaimed += 1;
        }

        if reclaimed > 0 {
            info!(reclaimed, "reclaimed expired leases");
        }
        reclaimed
    }

    /// After a shutdown command: keep processing ack/nack traffic for the
    /// grace window so in-flight deliveries can settle. New leases are not
    /// written during this phase.
    pub(super) fn drain_in_flight(&mut self) {
        if self.leases.is_empty() || self.shutdown_grace.is_zero() {
            return;
        }
        info!(
            in_flight = self.leases.len(),
            "waiting for in-flight deliveries to settle"
        );

        let deadline = Instant::now() + self.shutdown_grace;
        while !self.leases.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now).min(self.idle_timeout);
            match self.inbound.recv_timeout(wait) {
                Ok(cmd) => self.handle_command(cmd),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Force-release any leases still outstanding at shutdown. The messages
    /// revert to pending so a durable deployment can recover them on
    /// restart.
    pub(super) fn release_leases(&mut self) {
        if self.leases.is_empty() {
            return;
        }

        let released = self.leases.len();
        let ids: Vec<uuid::Uuid> = self.leases.keys().copied().collect();
        for msg_id in ids {
            if let Some(msg) = self.messages.get_mut(&msg_id) {
                msg.state = MessageState::Pending;
                self.ready.insert((msg.enqueued_at, msg_id));
            }
        }
        self.leases.clear();
        self.lease_expiry.clear();

        warn!(released, "released in-flight leases back to pending at shutdown");
    }
}
