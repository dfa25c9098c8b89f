use serde::Deserialize;

/// Top-level relay configuration, deserializable from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub dispatch: DispatchConfig,
    pub sink: SinkConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Route that accepts inbound messages.
    pub ingress_path: String,
}

/// Delivery queue configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of active (pending + delayed + in-flight) messages.
    pub capacity: usize,
    /// A leased message not acked or nacked within this window reverts to
    /// pending.
    pub lease_timeout_ms: u64,
    /// Delivery attempts before a message becomes terminally failed.
    pub max_attempts: u32,
    /// How many terminal messages are retained for audit (delivered ids and
    /// failed messages each).
    pub retention: usize,
    pub command_channel_capacity: usize,
    pub idle_timeout_ms: u64,
    /// Grace window at shutdown for in-flight deliveries to ack or nack
    /// before their leases are force-released.
    pub shutdown_grace_ms: u64,
}

/// Dispatch worker pool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub workers: usize,
    /// Delay before the first retry; doubles per attempt.
    pub backoff_base_ms: u64,
    /// Upper bound on the retry delay.
    pub backoff_cap_ms: u64,
}

/// Sink configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Output binding name deliveries are emitted under.
    pub binding: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            ingress_path: "/incoming".to_string(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            lease_timeout_ms: 30_000,
            max_attempts: 5,
            retention: 256,
            command_channel_capacity: 10_000,
            idle_timeout_ms: 100,
            shutdown_grace_ms: 5_000,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            backoff_base_ms: 100,
            backoff_cap_ms: 30_000,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            binding: "outgoing".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = RelayConfig::default();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.server.ingress_path, "/incoming");
        assert_eq!(config.queue.capacity, 1024);
        assert_eq!(config.queue.lease_timeout_ms, 30_000);
        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.dispatch.workers, 4);
        assert_eq!(config.dispatch.backoff_base_ms, 100);
        assert_eq!(config.sink.binding, "outgoing");
    }

    #[test]
    fn toml_parsing_with_overrides() {
        let toml_str = r#"
            [server]
            listen_addr = "127.0.0.1:9999"
            ingress_path = "/relay"

            [queue]
            capacity = 16
            max_attempts = 2

            [dispatch]
            workers = 1
            backoff_base_ms = 50
        "#;
        let config: RelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.server.ingress_path, "/relay");
        assert_eq!(config.queue.capacity, 16);
        assert_eq!(config.queue.max_attempts, 2);
        assert_eq!(config.dispatch.workers, 1);
        assert_eq!(config.dispatch.backoff_base_ms, 50);
        // Untouched sections keep defaults
        assert_eq!(config.queue.lease_timeout_ms, 30_000);
        assert_eq!(config.sink.binding, "outgoing");
    }

    #[test]
    fn toml_parsing_empty_uses_defaults() {
        let config: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.queue.capacity, 1024);
        assert_eq!(config.dispatch.workers, 4);
    }

    #[test]
    fn toml_parsing_partial_config() {
        let toml_str = r#"
            [sink]
            binding = "events"
        "#;
        let config: RelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sink.binding, "events");
        // Other sections keep defaults
        assert_eq!(config.queue.command_channel_capacity, 10_000);
        assert_eq!(config.queue.idle_timeout_ms, 100);
    }
}
