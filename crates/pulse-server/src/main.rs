// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Pulse.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use pulse_server::api::AppState;
use pulse_server::config::ServerConfig;
use pulse_server::db::Database;

#[tokio::main]
async fn main() -> Result<()> {
    // Respects RUST_LOG environment variable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_owned());
    let config = ServerConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;

    let db = Arc::new(Database::open(&config.database.path)?);
    info!("Database opened at {}", config.database.path);

    if config.auth.webhook_secret.is_empty() {
        warn!("auth.webhook_secret is empty, the publish webhook accepts unauthenticated requests");
    }

    let state = AppState {
        db,
        auth: config.auth.clone(),
    };
    let app = pulse_server::build_router(state);

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    info!("Starting Pulse server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server terminated")?;

    Ok(())
}
