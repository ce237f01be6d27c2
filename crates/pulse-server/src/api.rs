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

//! Client-facing API: update check and the version publish webhook

use axum::Json;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::AuthSettings;
use crate::db::Database;
use crate::error::ServerError;
use crate::version;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: AuthSettings,
}

#[derive(Debug, Deserialize)]
pub struct CheckUpdateRequest {
    pub device_id: String,
    pub platform: String,
    pub app_version: String,
    #[serde(default)]
    pub is_beta: bool,
}

/// Optional fields are omitted entirely (not null) when there is no update.
#[derive(Debug, Serialize)]
pub struct CheckUpdateResponse {
    pub has_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub version: String,
    #[serde(default)]
    pub release_notes: String,
    #[serde(default)]
    pub download_url: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Maps engine errors onto transport status codes. Store failures are logged
/// here and surfaced as a generic failure.
pub fn engine_error_response(err: &ServerError, what: &str) -> Response {
    match err {
        ServerError::Validation(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        ServerError::NotFound(_) => error_response(StatusCode::NOT_FOUND, &err.to_string()),
        ServerError::Store(e) => {
            error!(error = %e, "Store failure during {what}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &format!("Failed to {what}"))
        }
    }
}

/// Value of `Authorization: Bearer <token>`, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Client address for telemetry: first X-Forwarded-For entry when running
/// behind a proxy, else the socket peer.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

/// POST /api/v1/check-update
///
/// Telemetry (registry upsert + daily activity mark) is dispatched to the
/// blocking pool and never joined: its failure is logged and swallowed, and
/// the response depends only on the catalog read and the comparison.
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn check_update_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CheckUpdateRequest>,
) -> Response {
    if req.device_id.is_empty() || req.platform.is_empty() || req.app_version.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "device_id, platform and app_version are required",
        );
    }

    let ip = client_ip(&headers, peer);
    let db = state.db.clone();
    let device_id = req.device_id.clone();
    let platform = req.platform.clone();
    let app_version = req.app_version.clone();
    let now = Utc::now();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = db.record_check_in(&device_id, &platform, &app_version, &ip) {
            warn!(error = %e, device_id = %device_id, "Failed to record device check-in");
        }
        if let Err(e) = db.mark_seen(&device_id, &platform, &app_version, now) {
            warn!(error = %e, device_id = %device_id, "Failed to mark daily activity");
        }
    });

    let latest = match state.db.latest_eligible(req.is_beta) {
        Ok(latest) => latest,
        Err(e) => return engine_error_response(&e, "check for updates"),
    };

    let response = match latest {
        Some(candidate) if version::is_newer(&req.app_version, &candidate.version) => {
            CheckUpdateResponse {
                has_update: true,
                latest_version: Some(candidate.version),
                release_notes: Some(candidate.release_notes),
                download_url: Some(candidate.download_url),
            }
        }
        Some(_) | None => CheckUpdateResponse {
            has_update: false,
            latest_version: None,
            release_notes: None,
            download_url: None,
        },
    };

    Json(response).into_response()
}

/// POST /api/v1/webhook/version
///
/// Publishes a release from CI. The shared secret is accepted from the
/// X-Webhook-Secret header, an Authorization bearer token or a `token` query
/// parameter; an empty configured secret disables the check.
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn publish_version_handler(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    Json(req): Json<PublishRequest>,
) -> Response {
    let secret = &state.auth.webhook_secret;
    if !secret.is_empty() {
        let provided = headers
            .get("X-Webhook-Secret")
            .and_then(|v| v.to_str().ok())
            .or_else(|| bearer_token(&headers))
            .or(query.token.as_deref());
        if provided != Some(secret.as_str()) {
            return error_response(StatusCode::UNAUTHORIZED, "invalid webhook secret");
        }
    }

    match state
        .db
        .publish(&req.version, &req.release_notes, &req.download_url)
    {
        Ok(record) => Json(serde_json::json!({
            "message": "Version updated successfully",
            "version": record.version,
        }))
        .into_response(),
        Err(e) => engine_error_response(&e, "update version"),
    }
}

/// GET /health
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn health_handler() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}
