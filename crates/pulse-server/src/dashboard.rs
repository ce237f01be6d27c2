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

//! Server-rendered operator overview page

use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use chrono::Utc;
use tracing::error;

use crate::api::AppState;
use crate::db::PlatformCount;
use crate::timeutil::{self, DayRange};

#[derive(Debug, Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub dau_today: u64,
    pub active_30d: u64,
    pub total_devices: u64,
    pub latest_version: String,
    pub latest_channel: String,
    pub platforms: Vec<PlatformCount>,
    pub devices: Vec<DashboardDevice>,
    pub server_time: String,
}

#[derive(Debug)]
pub struct DashboardDevice {
    pub device_id: String,
    pub platform: String,
    pub app_version: String,
    pub total_launches: i64,
    pub last_seen_relative: String,
    pub last_seen: String,
}

#[expect(
    clippy::integer_division,
    reason = "integer truncation is intentional for relative time display"
)]
fn format_relative_time(seconds: i64) -> String {
    if seconds < 60 {
        "just now".to_owned()
    } else if seconds < 3600 {
        let mins = seconds / 60;
        if mins == 1 {
            "1 minute ago".to_owned()
        } else {
            format!("{mins} minutes ago")
        }
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        if hours == 1 {
            "1 hour ago".to_owned()
        } else {
            format!("{hours} hours ago")
        }
    } else {
        let days = seconds / 86400;
        if days == 1 {
            "1 day ago".to_owned()
        } else {
            format!("{days} days ago")
        }
    }
}

/// GET / - operator overview
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn dashboard_handler(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    let today = timeutil::today();

    let overview = match state.db.overview(DayRange::window(7, today), today) {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, "Failed to fetch overview for dashboard");
            return Html("<h1>Error loading dashboard</h1>".to_owned());
        }
    };
    let platforms = state.db.platform_breakdown().unwrap_or_default();
    let (latest_version, latest_channel) = match state.db.latest_eligible(true) {
        Ok(Some(v)) => {
            let channel = if v.is_beta { "beta" } else { "stable" };
            (v.version, channel.to_owned())
        }
        Ok(None) => ("none published".to_owned(), "-".to_owned()),
        Err(e) => {
            error!(error = %e, "Failed to fetch latest version for dashboard");
            ("unavailable".to_owned(), "-".to_owned())
        }
    };

    let devices = match state.db.list_devices(&crate::db::DeviceFilter {
        page_size: 10,
        ..crate::db::DeviceFilter::default()
    }) {
        Ok((items, _)) => items
            .iter()
            .map(|d| {
                let elapsed = now.signed_duration_since(d.last_seen).num_seconds().max(0);
                DashboardDevice {
                    device_id: d.device_id.clone(),
                    platform: d.platform.clone(),
                    app_version: d.app_version.clone(),
                    total_launches: d.total_launches,
                    last_seen_relative: format_relative_time(elapsed),
                    last_seen: d.last_seen.to_rfc3339(),
                }
            })
            .collect(),
        Err(e) => {
            error!(error = %e, "Failed to fetch devices for dashboard");
            Vec::new()
        }
    };

    let template = DashboardTemplate {
        dau_today: overview.dau_today,
        active_30d: overview.active_30d,
        total_devices: overview.total_devices,
        latest_version,
        latest_channel,
        platforms,
        devices,
        server_time: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    };

    match template.render() {
        Ok(html) => Html(html),
        Err(e) => {
            error!(error = %e, "Template render error");
            Html(format!("<h1>Error rendering dashboard: {e}</h1>"))
        }
    }
}
