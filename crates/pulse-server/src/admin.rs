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

//! Admin API: catalog management and usage statistics
//!
//! Every route here sits behind [`require_admin`]; issuing and rotating the
//! operator token is the deployment's concern.

use axum::Json;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::api::{AppState, bearer_token, engine_error_response, error_response};
use crate::db::{DeviceFilter, VersionPatch};
use crate::timeutil::{self, DayRange};

/// Bearer-token gate for the /api/v1/admin subtree.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match bearer_token(req.headers()) {
        Some(token) if token == state.auth.admin_token => next.run(req).await,
        Some(_) | None => error_response(StatusCode::UNAUTHORIZED, "unauthorized"),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default, rename = "pageSize")]
    pub page_size: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub window: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceQuery {
    pub platform: Option<String>,
    pub version: Option<String>,
    pub q: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default, rename = "pageSize")]
    pub page_size: u32,
}

impl RangeQuery {
    fn resolve(&self) -> crate::error::Result<DayRange> {
        DayRange::parse(
            self.window.as_deref(),
            self.from.as_deref(),
            self.to.as_deref(),
            timeutil::today(),
        )
    }
}

/// GET /api/v1/admin/versions
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn list_versions_handler(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Response {
    match state.db.list_versions(page.page, page.page_size) {
        Ok((items, total)) => {
            Json(serde_json::json!({ "items": items, "total": total })).into_response()
        }
        Err(e) => engine_error_response(&e, "fetch versions"),
    }
}

/// PUT /api/v1/admin/versions/{id}
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn edit_version_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<VersionPatch>,
) -> Response {
    match state.db.edit_version(id, &patch) {
        Ok(()) => Json(serde_json::json!({ "message": "Version updated successfully" }))
            .into_response(),
        Err(e) => engine_error_response(&e, "update version"),
    }
}

/// DELETE /api/v1/admin/versions/{id}
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn delete_version_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.db.delete_version(id) {
        Ok(()) => Json(serde_json::json!({ "message": "Version deleted successfully" }))
            .into_response(),
        Err(e) => engine_error_response(&e, "delete version"),
    }
}

/// GET /api/v1/admin/stats/overview
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn stats_overview_handler(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Response {
    let range = match range.resolve() {
        Ok(range) => range,
        Err(e) => return engine_error_response(&e, "resolve range"),
    };
    match state.db.overview(range, timeutil::today()) {
        Ok(overview) => Json(overview).into_response(),
        Err(e) => engine_error_response(&e, "fetch overview"),
    }
}

/// GET /api/v1/admin/stats/platforms
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn stats_platforms_handler(State(state): State<AppState>) -> Response {
    match state.db.platform_breakdown() {
        Ok(items) => Json(serde_json::json!({ "items": items })).into_response(),
        Err(e) => engine_error_response(&e, "fetch platform breakdown"),
    }
}

/// GET /api/v1/admin/stats/versions
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn stats_versions_handler(State(state): State<AppState>) -> Response {
    match state.db.version_breakdown() {
        Ok(items) => Json(serde_json::json!({ "items": items })).into_response(),
        Err(e) => engine_error_response(&e, "fetch version breakdown"),
    }
}

/// GET /api/v1/admin/stats/devices
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn stats_devices_handler(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> Response {
    let filter = DeviceFilter {
        platform: query.platform,
        version: query.version,
        q: query.q,
        page: query.page,
        page_size: query.page_size,
    };
    match state.db.list_devices(&filter) {
        Ok((items, total)) => {
            Json(serde_json::json!({ "items": items, "total": total })).into_response()
        }
        Err(e) => engine_error_response(&e, "fetch devices"),
    }
}

/// GET /api/v1/admin/stats/trend/dau
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn stats_trend_dau_handler(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Response {
    let range = match range.resolve() {
        Ok(range) => range,
        Err(e) => return engine_error_response(&e, "resolve range"),
    };
    match state.db.dau_trend(range) {
        Ok((items, window_devices)) => Json(serde_json::json!({
            "items": items,
            "window_devices": window_devices,
        }))
        .into_response(),
        Err(e) => engine_error_response(&e, "fetch DAU trend"),
    }
}
