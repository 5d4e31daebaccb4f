//! chat-relay server entry point.
//!
//! Connects the broker, starts the Axum server with the WebSocket endpoint,
//! and on Ctrl-C cancels every session before disconnecting the broker.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use chat_relay::app::build_app;
use chat_relay::app_state::AppState;
use chat_relay::broker::{Broker, InMemoryBroker};
use chat_relay::config::{LogFormat, RelayConfig};
use chat_relay::ws::Supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::from_env().context("invalid LISTEN_ADDR")?;
    init_tracing(config.log_format);

    run_with_shutdown(config, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    })
    .await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run_with_shutdown<F>(config: RelayConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(addr = %config.listen_addr, channel = %config.channel, "starting chat-relay");

    let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new(config.broker_channel_capacity));
    broker.connect().await.context("broker connect failed")?;

    let supervisor = Arc::new(Supervisor::from_config(Arc::clone(&broker), &config));
    let app = build_app(AppState::new(Arc::clone(&supervisor)));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let sessions = Arc::clone(&supervisor);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("shutdown requested");
            sessions.shutdown();
        })
        .await
        .context("server error")?;

    broker.disconnect().await.context("broker disconnect failed")?;
    tracing::info!("chat-relay stopped");
    Ok(())
}
