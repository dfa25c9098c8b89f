mod error;
mod http;

use std::path::Path;
use std::sync::Arc;

use remessa_core::{DispatchPool, LogSink, Relay, RelayConfig, Sink};
use tracing::info;

fn load_config() -> RelayConfig {
    let paths = ["remessa.toml", "/etc/remessa/remessa.toml"];

    for path in &paths {
        if Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => {
                        info!(path, "loaded configuration");
                        return config;
                    }
                    Err(e) => {
                        eprintln!("error parsing {path}: {e}");
                        std::process::exit(1);
                    }
                },
                Err(e) => {
                    eprintln!("error reading {path}: {e}");
                    std::process::exit(1);
                }
            }
        }
    }

    info!("no config file found, using defaults");
    RelayConfig::default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    remessa_core::telemetry::init_tracing();

    let config = load_config();
    let listen_addr = config.server.listen_addr.clone();

    let relay = Arc::new(Relay::new(&config)?);
    let sink: Arc<dyn Sink> = Arc::new(LogSink::new(config.sink.binding.clone()));
    let pool = DispatchPool::spawn(Arc::clone(&relay), sink, &config.dispatch);

    let app = http::router(Arc::clone(&relay), &config.server);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(%listen_addr, "starting http server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("http server stopped, shutting down relay");

    // Stop the queue thread (draining in-flight deliveries within the grace
    // window), then reap the workers whose channels it closed.
    relay.shutdown()?;
    pool.join().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to install CTRL+C handler");
    }

    info!("received shutdown signal");
}
