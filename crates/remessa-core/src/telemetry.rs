use tracing_subscriber::EnvFilter;

/// Initialize structured logging for the relay.
///
/// Debug builds get pretty-printed output; release builds emit JSON lines so
/// log aggregation can pick up delivered payloads and failure reports
/// machine-readably. The filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if cfg!(debug_assertions) {
        builder.init();
    } else {
        builder.json().init();
    }
}
