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

//! SQLite store for the version catalog, device statistics and the daily
//! activity ledger. All engine state is durable; every operation is
//! read-modify-write against the store, so concurrent request handlers never
//! share in-memory state.

mod catalog;
mod devices;
mod stats;

pub use catalog::VersionPatch;
pub use devices::DeviceFilter;
pub use stats::{DayCount, Overview, PlatformCount, VersionCount};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct Database {
    conn: Mutex<rusqlite::Connection>,
}

/// A published app version.
#[derive(Debug, Clone, Serialize)]
pub struct VersionRecord {
    pub id: i64,
    pub version: String,
    pub release_notes: String,
    pub download_url: String,
    pub is_latest: bool,
    pub is_beta: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifetime statistics for one device. Exactly zero or one row per
/// device id.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStat {
    pub device_id: String,
    pub platform: String,
    pub app_version: String,
    pub ip: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub total_launches: i64,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = rusqlite::Connection::open(path)
            .with_context(|| format!("Failed to open database: {path}"))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS app_versions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                version       TEXT NOT NULL UNIQUE,
                release_notes TEXT NOT NULL DEFAULT '',
                download_url  TEXT NOT NULL DEFAULT '',
                is_latest     INTEGER NOT NULL DEFAULT 0,
                is_beta       INTEGER NOT NULL DEFAULT 0,
                is_published  INTEGER NOT NULL DEFAULT 1,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_app_versions_is_latest
                ON app_versions(is_latest);

            CREATE TABLE IF NOT EXISTS device_stats (
                device_id      TEXT PRIMARY KEY,
                platform       TEXT NOT NULL,
                app_version    TEXT NOT NULL,
                ip             TEXT NOT NULL DEFAULT '',
                first_seen     TEXT NOT NULL,
                last_seen      TEXT NOT NULL,
                total_launches INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_device_stats_platform
                ON device_stats(platform);
            CREATE INDEX IF NOT EXISTS idx_device_stats_last_seen
                ON device_stats(last_seen DESC);

            CREATE TABLE IF NOT EXISTS daily_activity (
                device_id   TEXT NOT NULL,
                platform    TEXT NOT NULL,
                app_version TEXT NOT NULL,
                seen_date   TEXT NOT NULL,
                seen_at     TEXT NOT NULL,
                PRIMARY KEY (device_id, seen_date)
            );

            CREATE INDEX IF NOT EXISTS idx_daily_activity_seen_date
                ON daily_activity(seen_date);",
        )
        .context("Failed to initialize database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_directory_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/pulse.db");
        let path = path.to_str().unwrap();

        let db = Database::open(path).unwrap();
        db.publish("1.0.0", "notes", "https://example.com/1.0.0")
            .unwrap();
        drop(db);

        // Reopening runs the schema batch again against existing tables
        let db = Database::open(path).unwrap();
        let (items, total) = db.list_versions(1, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].version, "1.0.0");
    }
}
