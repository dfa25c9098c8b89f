pub mod command;
pub mod config;
mod queue;

use std::sync::Mutex;
use std::thread;

use tracing::info;

use crate::error::RelayError;

pub use command::{LeasedMessage, QueueCommand, QueueStats};
pub use config::{DispatchConfig, QueueConfig, RelayConfig, ServerConfig, SinkConfig};

use queue::DeliveryQueue;

/// The relay owns the delivery queue thread and the inbound command channel.
/// IO tasks (HTTP handlers, dispatch workers) send commands through
/// `send_command()`, and the single-threaded queue core processes them
/// sequentially.
pub struct Relay {
    command_tx: crossbeam_channel::Sender<QueueCommand>,
    queue_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Relay {
    /// Create a new relay, spawning the queue core on a dedicated OS thread.
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let (tx, rx) =
            crossbeam_channel::bounded::<QueueCommand>(config.queue.command_channel_capacity);

        let queue_config = config.queue.clone();
        let handle = thread::Builder::new()
            .name("remessa-queue".to_string())
            .spawn(move || {
                let mut queue = DeliveryQueue::new(rx, &queue_config);
                queue.run();
            })
            .map_err(|e| RelayError::QueueSpawn(e.to_string()))?;

        info!("relay started");

        Ok(Self {
            command_tx: tx,
            queue_thread: Mutex::new(Some(handle)),
        })
    }

    /// Send a command to the queue core. Returns an error if the channel is
    /// full or disconnected.
    pub fn send_command(&self, cmd: QueueCommand) -> Result<(), RelayError> {
        self.command_tx.try_send(cmd).map_err(|e| match e {
            crossbeam_channel::TrySendError::Full(_) => RelayError::ChannelFull,
            crossbeam_channel::TrySendError::Disconnected(_) => RelayError::ChannelDisconnected,
        })
    }

    /// Initiate graceful shutdown: send the shutdown command and wait for
    /// the queue thread to finish. Safe to call through a shared reference;
    /// later calls are no-ops.
    pub fn shutdown(&self) -> Result<(), RelayError> {
        info!("initiating relay shutdown");

        // Send shutdown command (ignore error if channel already closed)
        let _ = self.command_tx.send(QueueCommand::Shutdown);

        let handle = match self.queue_thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.join().map_err(|_| RelayError::QueuePanicked)?;
        }

        info!("relay shutdown complete");
        Ok(())
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        // If shutdown wasn't called explicitly, attempt to stop the queue core
        let Ok(mut guard) = self.queue_thread.lock() else {
            return;
        };
        if let Some(handle) = guard.take() {
            let _ = self.command_tx.send(QueueCommand::Shutdown);
            let _ = handle.join();
        }
    }
}
