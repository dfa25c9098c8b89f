/// Errors returned to the ingress caller when a message cannot be accepted.
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("queue full: capacity of {0} messages reached")]
    QueueFull(usize),
}

/// Errors for acknowledging a delivered message.
#[derive(Debug, thiserror::Error)]
pub enum AckError {
    #[error("message not found: {0}")]
    MessageNotFound(String),
}

/// Errors for negatively acknowledging a failed delivery.
#[derive(Debug, thiserror::Error)]
pub enum NackError {
    #[error("message not found: {0}")]
    MessageNotFound(String),
}

/// Errors from the relay handle itself (queue thread lifecycle and the
/// command channel into it).
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to spawn queue thread: {0}")]
    QueueSpawn(String),

    #[error("command channel full")]
    ChannelFull,

    #[error("command channel disconnected")]
    ChannelDisconnected,

    #[error("queue thread panicked")]
    QueuePanicked,
}

/// Errors from a sink delivery attempt. The dispatcher treats every variant
/// uniformly as a retriable failure.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    #[error("sink rejected payload: {0}")]
    Rejected(String),
}
