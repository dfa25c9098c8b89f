use std::sync::Arc;

use tracing::{debug, warn};

use crate::relay::{DispatchConfig, LeasedMessage, QueueCommand, Relay};
use crate::sink::Sink;

/// Exponential backoff schedule for failed deliveries.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BackoffPolicy {
    base_ms: u64,
    cap_ms: u64,
}

impl BackoffPolicy {
    pub(crate) fn new(base_ms: u64, cap_ms: u64) -> Self {
        Self { base_ms, cap_ms }
    }

    /// Retry delay after a failed attempt: the base delay doubled per
    /// attempt, capped.
    pub(crate) fn delay_for(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(32);
        self.base_ms.saturating_mul(1u64 << exp).min(self.cap_ms)
    }
}

/// Pool of dispatch workers draining the delivery queue into the sink.
///
/// Each worker registers a capacity-1 channel with the queue core, so leases
/// are only handed to idle workers, and loops: receive a leased message,
/// deliver to the sink, ack on success or nack with a backoff delay on
/// failure. Workers stop when the queue core drops their channel.
pub struct DispatchPool {
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl DispatchPool {
    /// Spawn the configured number of workers and register them with the
    /// queue core.
    pub fn spawn(relay: Arc<Relay>, sink: Arc<dyn Sink>, config: &DispatchConfig) -> Self {
        let backoff = BackoffPolicy::new(config.backoff_base_ms, config.backoff_cap_ms);
        let mut handles = Vec::with_capacity(config.workers);

        for i in 0..config.workers {
            let worker_id = format!("worker-{i}");
            let (tx, rx) = tokio::sync::mpsc::channel::<LeasedMessage>(1);

            if let Err(e) = relay.send_command(QueueCommand::RegisterWorker {
                worker_id: worker_id.clone(),
                tx,
            }) {
                warn!(%worker_id, error = %e, "failed to register dispatch worker");
                continue;
            }

            let relay = Arc::clone(&relay);
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(run_worker(worker_id, rx, relay, sink, backoff)));
        }

        Self { handles }
    }

    /// Wait for all workers to finish. Their channels close when the queue
    /// core exits, so this completes once the relay has shut down.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn run_worker(
    worker_id: String,
    mut rx: tokio::sync::mpsc::Receiver<LeasedMessage>,
    relay: Arc<Relay>,
    sink: Arc<dyn Sink>,
    backoff: BackoffPolicy,
) {
    while let Some(leased) = rx.recv().await {
        match sink.deliver(&leased.payload).await {
            Ok(()) => {
                debug!(worker = %worker_id, msg_id = %leased.msg_id, attempt = leased.attempt, "delivered");
                let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
                if relay
                    .send_command(QueueCommand::Ack {
                        msg_id: leased.msg_id,
                        reply: reply_tx,
                    })
                    .is_err()
                {
                    continue;
                }
                match reply_rx.await {
                    Ok(Err(e)) => warn!(worker = %worker_id, msg_id = %leased.msg_id, error = %e, "ack rejected"),
                    Ok(Ok(())) | Err(_) => {}
                }
            }
            Err(e) => {
                let retry_after_ms = backoff.delay_for(leased.attempt);
                warn!(
                    worker = %worker_id,
                    msg_id = %leased.msg_id,
                    attempt = leased.attempt,
                    retry_after_ms,
                    error = %e,
                    "delivery failed"
                );
                let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
                if relay
                    .send_command(QueueCommand::Nack {
                        msg_id: leased.msg_id,
                        retry_after_ms,
                        error: e.to_string(),
                        reply: reply_tx,
                    })
                    .is_err()
                {
                    continue;
                }
                match reply_rx.await {
                    Ok(Err(e)) => warn!(worker = %worker_id, msg_id = %leased.msg_id, error = %e, "nack rejected"),
                    Ok(Ok(())) | Err(_) => {}
                }
            }
        }
    }

    // Channel closed: queue core is gone or we were unregistered
    let _ = relay.send_command(QueueCommand::UnregisterWorker {
        worker_id: worker_id.clone(),
    });
    debug!(worker = %worker_id, "dispatch worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_starts_at_base_and_doubles() {
        let policy = BackoffPolicy::new(100, 30_000);
        assert_eq!(policy.delay_for(1), 100);
        assert_eq!(policy.delay_for(2), 200);
        assert_eq!(policy.delay_for(3), 400);
        assert_eq!(policy.delay_for(4), 800);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = BackoffPolicy::new(100, 1_000);
        assert_eq!(policy.delay_for(5), 1_000);
        assert_eq!(policy.delay_for(20), 1_000);
    }

    #[test]
    fn backoff_survives_extreme_attempt_counts() {
        let policy = BackoffPolicy::new(u64::MAX / 2, u64::MAX);
        // Saturates instead of overflowing
        assert_eq!(policy.delay_for(64), u64::MAX);
    }
}
