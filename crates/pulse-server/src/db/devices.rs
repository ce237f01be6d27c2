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

//! Device registry and daily activity ledger
//!
//! Both writes are conflict-safe single statements, so any number of
//! concurrent check-ins from the same device converge: the registry row is
//! updated in place and the activity ledger keeps exactly one row per device
//! and local day.

use chrono::{DateTime, Utc};
use rusqlite::{Row, ToSql, params, params_from_iter};

use super::{Database, DeviceStat};
use crate::error::Result;
use crate::timeutil;

const MAX_PAGE_SIZE: u32 = 200;
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Listing filter for the device table.
#[derive(Debug, Default, Clone)]
pub struct DeviceFilter {
    pub platform: Option<String>,
    pub version: Option<String>,
    /// Substring match over device id or IP.
    pub q: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceStat> {
    Ok(DeviceStat {
        device_id: row.get(0)?,
        platform: row.get(1)?,
        app_version: row.get(2)?,
        ip: row.get(3)?,
        first_seen: row.get(4)?,
        last_seen: row.get(5)?,
        total_launches: row.get(6)?,
    })
}

impl Database {
    /// Upserts the lifetime statistics row for a device. First check-in
    /// creates the row with `first_seen = last_seen = now`; every later one
    /// overwrites platform/version/ip, bumps `last_seen` and increments the
    /// launch counter. `first_seen` is never touched again.
    pub fn record_check_in(
        &self,
        device_id: &str,
        platform: &str,
        app_version: &str,
        ip: &str,
    ) -> Result<()> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO device_stats
                 (device_id, platform, app_version, ip, first_seen, last_seen, total_launches)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, 1)
             ON CONFLICT(device_id) DO UPDATE SET
                platform = ?2,
                app_version = ?3,
                ip = ?4,
                last_seen = ?5,
                total_launches = total_launches + 1",
            params![device_id, platform, app_version, ip, now],
        )?;

        Ok(())
    }

    /// Marks a device as active on the local day `now` falls into. The first
    /// check-in of the day wins; later ones are silent no-ops and do not
    /// update platform, version or `seen_at`.
    pub fn mark_seen(
        &self,
        device_id: &str,
        platform: &str,
        app_version: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn();
        let seen_date = timeutil::local_day(now).to_string();

        conn.execute(
            "INSERT INTO daily_activity (device_id, platform, app_version, seen_date, seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(device_id, seen_date) DO NOTHING",
            params![device_id, platform, app_version, seen_date, now.to_rfc3339()],
        )?;

        Ok(())
    }

    /// Paginated device listing, most recently seen first.
    pub fn list_devices(&self, filter: &DeviceFilter) -> Result<(Vec<DeviceStat>, u64)> {
        let page = filter.page.max(1);
        let page_size = if filter.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            filter.page_size.min(MAX_PAGE_SIZE)
        };
        let offset = i64::from(page - 1) * i64::from(page_size);

        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(platform) = &filter.platform {
            clauses.push("platform = ?");
            args.push(Box::new(platform.clone()));
        }
        if let Some(version) = &filter.version {
            clauses.push("app_version = ?");
            args.push(Box::new(version.clone()));
        }
        if let Some(q) = &filter.q {
            clauses.push("(device_id LIKE ? OR ip LIKE ?)");
            let pattern = format!("%{q}%");
            args.push(Box::new(pattern.clone()));
            args.push(Box::new(pattern));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn();
        let total: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM device_stats {where_sql}"),
            params_from_iter(args.iter().map(|a| a.as_ref())),
            |row| row.get(0),
        )?;

        args.push(Box::new(i64::from(page_size)));
        args.push(Box::new(offset));
        let mut stmt = conn.prepare(&format!(
            "SELECT device_id, platform, app_version, ip, first_seen, last_seen, total_launches
             FROM device_stats {where_sql}
             ORDER BY last_seen DESC
             LIMIT ? OFFSET ?"
        ))?;
        let items = stmt
            .query_map(
                params_from_iter(args.iter().map(|a| a.as_ref())),
                device_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem() -> Database {
        Database::open(":memory:").unwrap()
    }

    fn activity_rows(db: &Database, device_id: &str) -> i64 {
        db.conn()
            .query_row(
                "SELECT COUNT(*) FROM daily_activity WHERE device_id = ?1",
                params![device_id],
                |row| row.get(0),
            )
            .unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_check_in_counts_launches() {
        let db = mem();
        for _ in 0..3 {
            db.record_check_in("dev-1", "android", "1.0.0", "10.0.0.1")
                .unwrap();
        }

        let (items, total) = db.list_devices(&DeviceFilter::default()).unwrap();
        assert_eq!(total, 1);
        let stat = &items[0];
        assert_eq!(stat.total_launches, 3);
        assert!(stat.first_seen <= stat.last_seen);
    }

    #[test]
    fn test_check_in_overwrites_snapshot_fields() {
        let db = mem();
        db.record_check_in("dev-1", "android", "1.0.0", "10.0.0.1")
            .unwrap();
        db.record_check_in("dev-1", "ios", "2.0.0", "10.0.0.2")
            .unwrap();

        let (items, _) = db.list_devices(&DeviceFilter::default()).unwrap();
        assert_eq!(items[0].platform, "ios");
        assert_eq!(items[0].app_version, "2.0.0");
        assert_eq!(items[0].ip, "10.0.0.2");
        assert_eq!(items[0].total_launches, 2);
    }

    #[test]
    fn test_mark_seen_dedupes_within_local_day() {
        let db = mem();
        // Same UTC+8 day, ten hours apart
        db.mark_seen("dev-1", "android", "1.0.0", utc("2024-03-01T02:00:00Z"))
            .unwrap();
        db.mark_seen("dev-1", "android", "1.1.0", utc("2024-03-01T12:00:00Z"))
            .unwrap();
        assert_eq!(activity_rows(&db, "dev-1"), 1);

        // First mark of the day wins
        let version: String = db
            .conn()
            .query_row(
                "SELECT app_version FROM daily_activity WHERE device_id = 'dev-1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, "1.0.0");
    }

    #[test]
    fn test_mark_seen_distinguishes_local_days() {
        let db = mem();
        // 15:00 UTC and 17:00 UTC straddle the UTC+8 midnight
        db.mark_seen("dev-1", "android", "1.0.0", utc("2024-03-01T15:00:00Z"))
            .unwrap();
        db.mark_seen("dev-1", "android", "1.0.0", utc("2024-03-01T17:00:00Z"))
            .unwrap();
        assert_eq!(activity_rows(&db, "dev-1"), 2);
    }

    #[test]
    fn test_list_devices_filters() {
        let db = mem();
        db.record_check_in("alpha-1", "android", "1.0.0", "10.0.0.1")
            .unwrap();
        db.record_check_in("alpha-2", "ios", "1.0.0", "10.0.0.2")
            .unwrap();
        db.record_check_in("bravo-1", "android", "2.0.0", "192.168.0.9")
            .unwrap();

        let (items, total) = db
            .list_devices(&DeviceFilter {
                platform: Some("android".to_owned()),
                ..DeviceFilter::default()
            })
            .unwrap();
        assert_eq!(total, 2);
        assert!(items.iter().all(|d| d.platform == "android"));

        let (_, total) = db
            .list_devices(&DeviceFilter {
                version: Some("2.0.0".to_owned()),
                ..DeviceFilter::default()
            })
            .unwrap();
        assert_eq!(total, 1);

        // Free text matches device id or ip
        let (_, total) = db
            .list_devices(&DeviceFilter {
                q: Some("alpha".to_owned()),
                ..DeviceFilter::default()
            })
            .unwrap();
        assert_eq!(total, 2);
        let (items, total) = db
            .list_devices(&DeviceFilter {
                q: Some("192.168".to_owned()),
                ..DeviceFilter::default()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].device_id, "bravo-1");
    }

    #[test]
    fn test_list_devices_pagination_clamp() {
        let db = mem();
        for i in 0..5 {
            db.record_check_in(&format!("dev-{i}"), "android", "1.0.0", "")
                .unwrap();
        }

        let (items, total) = db
            .list_devices(&DeviceFilter {
                page: 2,
                page_size: 2,
                ..DeviceFilter::default()
            })
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);

        let (items, _) = db
            .list_devices(&DeviceFilter {
                page_size: 100_000,
                ..DeviceFilter::default()
            })
            .unwrap();
        assert_eq!(items.len(), 5);
    }
}
