pub mod dispatch;
pub mod error;
pub mod message;
pub mod relay;
pub mod sink;
pub mod telemetry;

pub use dispatch::DispatchPool;
pub use error::{AckError, EnqueueError, NackError, RelayError, SinkError};
pub use message::{Message, MessageState, Payload};
pub use relay::{
    DispatchConfig, LeasedMessage, QueueCommand, QueueConfig, QueueStats, Relay, RelayConfig,
    ServerConfig, SinkConfig,
};
pub use sink::{LogSink, Sink};
