//! ems-server: ticket registration service for the EMS Trade Fair
//!
//! - Public registration with Stripe Checkout
//! - Door check-in for staff
//! - Back-office administration

use std::net::SocketAddr;

use ems_server::api;
use ems_server::config::Config;
use ems_server::error::BoxError;
use ems_server::services::users;
use ems_server::state::AppState;
use ems_server::tasks::{self, BackgroundTasks};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ems_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "Starting ems-server (env: {}, event: {})",
        config.environment,
        config.event_name
    );

    let state = AppState::new(config.clone()).await?;

    if let Err(e) = users::bootstrap_admin(&state, &config).await {
        let e: shared::error::AppError = e.into();
        tracing::error!(error = %e, "Admin bootstrap failed");
    }

    let mut background = BackgroundTasks::new();
    tasks::spawn_all(&mut background, &state);

    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("ems-server HTTP listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    background.shutdown().await;
    tracing::info!("ems-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
