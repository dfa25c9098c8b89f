use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The validated field set accepted at ingress and handed to the sink.
///
/// Serialized camelCase to match the wire shape downstream consumers expect
/// (`{"message": ..., "isValid": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub message: String,
    pub is_valid: bool,
}

/// Lifecycle state of a message. `Delivered` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageState {
    Pending,
    InFlight,
    Delivered,
    Failed,
}

/// Core message domain type — one unit of work accepted at ingress and
/// tracked by the delivery queue until it reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub payload: Payload,
    pub state: MessageState,
    /// Delivery attempts started so far. Incremented once per lease.
    pub attempt_count: u32,
    /// Unix nanos at enqueue; also the FIFO ordering key.
    pub enqueued_at: u64,
    pub last_attempt_at: Option<u64>,
    /// Most recent delivery error, kept for the failed audit view.
    pub last_error: Option<String>,
}

impl Message {
    /// Build a fresh Pending message with a UUIDv7 id.
    pub fn new(payload: Payload, enqueued_at: u64) -> Self {
        Self {
            id: Uuid::now_v7(),
            payload,
            state: MessageState::Pending,
            attempt_count: 0,
            enqueued_at,
            last_attempt_at: None,
            last_error: None,
        }
    }
}
