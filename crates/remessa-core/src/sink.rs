use tracing::info;

use crate::error::SinkError;
use crate::message::Payload;

/// The downstream destination for delivered messages.
///
/// Implementations must be thread-safe; the dispatch workers share one sink.
/// Any error — timeout, rejection, connection failure — is reported through
/// [`SinkError`] and retried by the dispatcher under the same policy.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn deliver(&self, payload: &Payload) -> Result<(), SinkError>;
}

/// Sink that emits each payload as a JSON line under a named output binding.
///
/// Stands in for a platform output channel: downstream tooling picks the
/// lines up by binding name from the structured log stream.
pub struct LogSink {
    binding: String,
}

impl LogSink {
    pub fn new(binding: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
        }
    }
}

#[async_trait::async_trait]
impl Sink for LogSink {
    async fn deliver(&self, payload: &Payload) -> Result<(), SinkError> {
        let body = serde_json::to_string(payload).map_err(|e| SinkError::Rejected(e.to_string()))?;
        info!(binding = %self.binding, payload = %body, "payload delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sink_accepts_payload() {
        let sink = LogSink::new("outgoing");
        let payload = Payload {
            message: "hello".to_string(),
            is_valid: true,
        };
        sink.deliver(&payload).await.unwrap();
    }
}
