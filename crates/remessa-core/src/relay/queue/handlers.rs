use tracing::{debug, error};
use uuid::Uuid;

use super::{now_ns, DeliveryQueue};
use crate::error::{AckError, EnqueueError, NackError};
use crate::message::{Message, MessageState};
use crate::relay::command::QueueStats;

impl DeliveryQueue {
    pub(super) fn handle_enqueue(&mut self, message: Message) -> Result<Uuid, EnqueueError> {
        let active = self.ready.len() + self.delayed.len() + self.leases.len();
        if active >= self.capacity {
            return Err(EnqueueError::QueueFull(self.capacity));
        }

        let msg_id = message.id;
        self.ready.insert((message.enqueued_at, msg_id));
        self.messages.insert(msg_id, message);
        Ok(msg_id)
    }

    pub(super) fn handle_ack(&mut self, msg_id: &Uuid) -> Result<(), AckError> {
        // Repeated ack of an already-delivered message is a no-op.
        if self.delivered_ids.contains(msg_id) {
            debug!(%msg_id, "ack for already-delivered message, ignoring");
            return Ok(());
        }

        let Some(expires_at) = self.leases.remove(msg_id) else {
            return Err(AckError::MessageNotFound(format!(
                "no lease for message {msg_id}"
            )));
        };
        self.lease_expiry.remove(&(expires_at, *msg_id));

        self.messages.remove(msg_id);
        self.remember_delivered(*msg_id);
        self.delivered_total += 1;
        Ok(())
    }

    pub(super) fn handle_nack(
        &mut self,
        msg_id: &Uuid,
        retry_after_ms: u64,
        error: &str,
    ) -> Result<(), NackError> {
        let Some(expires_at) = self.leases.remove(msg_id) else {
            return Err(NackError::MessageNotFound(format!(
                "no lease for message {msg_id}"
            )));
        };
        self.lease_expiry.remove(&(expires_at, *msg_id));

        let exhausted = match self.messages.get_mut(msg_id) {
            Some(msg) => {
                msg.last_error = Some(error.to_string());
                msg.attempt_count >= self.max_attempts
            }
            None => {
                return Err(NackError::MessageNotFound(format!(
                    "message {msg_id} not found"
                )))
            }
        };

        if exhausted {
            if let Some(mut msg) = self.messages.remove(msg_id) {
                msg.state = MessageState::Failed;
                error!(
                    %msg_id,
                    attempts = msg.attempt_count,
                    %error,
                    "delivery attempts exhausted, message failed"
                );
                self.remember_failed(msg);
                self.failed_total += 1;
            }
            return Ok(());
        }

        if let Some(msg) = self.messages.get_mut(msg_id) {
            msg.state = MessageState::Pending;
            let eligible_at = now_ns() + retry_after_ms * 1_000_000;
            self.delayed.insert((eligible_at, *msg_id));
            debug!(
                %msg_id,
                retry_after_ms,
                attempts = msg.attempt_count,
                "nack processed, retry scheduled"
            );
        }
        Ok(())
    }

    pub(super) fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.ready.len() + self.delayed.len(),
            in_flight: self.leases.len(),
            delivered: self.delivered_total,
            failed: self.failed_total,
        }
    }

    fn remember_delivered(&mut self, msg_id: Uuid) {
        self.delivered_ids.insert(msg_id);
        self.delivered_order.push_back(msg_id);
        while self.delivered_order.len() > self.retention {
            if let Some(old) = self.delivered_order.pop_front() {
                self.delivered_ids.remove(&old);
            }
        }
    }

    pub(super) fn remember_failed(&mut self, msg: Message) {
        self.failed.push_back(msg);
        while self.failed.len() > self.retention {
            self.failed.pop_front();
        }
    }
}
