use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;

use lex_config::LexConfig;

use crate::cli::ServeArgs;
use crate::routes::router;
use crate::state::AppState;
use crate::sweeper;

/// Handle `lexora serve`.
pub async fn handle(args: &ServeArgs, mut config: LexConfig) -> anyhow::Result<()> {
    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate().context("invalid configuration")?;

    let addr = config.server.bind_addr();
    let interval = Duration::from_secs(config.general.sweep_interval_secs.max(1));
    let state = Arc::new(AppState::from_config(config).await?);

    let (stop_tx, stop_rx) = watch::channel(false);
    let sweeper = tokio::spawn(sweeper::run(Arc::clone(&state), interval, stop_rx));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let _ = stop_tx.send(true);
    if let Err(error) = sweeper.await {
        tracing::warn!(%error, "sweeper task ended abnormally");
    }
    served.context("server error")?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
