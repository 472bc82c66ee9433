//! todo-api バイナリのエントリポイント

use anyhow::Context;
use infrastructure::{DynamoDbClient, DynamoTodoRepository, DynamoUserRepository};
use shared::{init_tracing, Config};
use std::net::SocketAddr;
use std::sync::Arc;
use todo_api::{app_with_state, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().map_err(|e| anyhow::anyhow!(e))?;

    // 接続先が未設定なら起動しない
    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        environment = %config.environment,
        table = %config.dynamodb_table,
        endpoint = config.dynamodb_endpoint.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let db = DynamoDbClient::new(&config).await;
    let state = AppState::new(
        Arc::new(DynamoTodoRepository::new(db.clone())),
        Arc::new(DynamoUserRepository::new(db)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server is running");

    axum::serve(listener, app_with_state(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Ctrl+C または SIGTERM を待つ
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown"),
        _ = terminate => info!("Received SIGTERM, starting shutdown"),
    }
}
