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

//! Pulse server - update checks and usage analytics for app fleets
//!
//! Clients POST their device id and version to /api/v1/check-update; the
//! server opportunistically records usage telemetry and answers from the
//! version catalog. CI publishes releases through a webhook and operators
//! inspect the fleet through the admin API or the HTML overview.

pub mod admin;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod timeutil;
pub mod version;

pub use api::AppState;
pub use config::ServerConfig;
pub use db::Database;

use axum::middleware;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;

/// Assembles the full route tree. CORS is permissive: the check-update
/// endpoint is called from arbitrary app webviews and CI runners.
pub fn build_router(state: AppState) -> axum::Router {
    let admin_routes = axum::Router::new()
        .route("/versions", get(admin::list_versions_handler))
        .route(
            "/versions/{id}",
            put(admin::edit_version_handler).delete(admin::delete_version_handler),
        )
        .route("/stats/overview", get(admin::stats_overview_handler))
        .route("/stats/platforms", get(admin::stats_platforms_handler))
        .route("/stats/versions", get(admin::stats_versions_handler))
        .route("/stats/devices", get(admin::stats_devices_handler))
        .route("/stats/trend/dau", get(admin::stats_trend_dau_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin,
        ));

    axum::Router::new()
        .route("/", get(dashboard::dashboard_handler))
        .route("/health", get(api::health_handler))
        .route("/api/v1/check-update", post(api::check_update_handler))
        .route("/api/v1/webhook/version", post(api::publish_version_handler))
        .nest("/api/v1/admin", admin_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
