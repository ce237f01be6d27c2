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

//! Read-only aggregation queries for the admin dashboard
//!
//! Activity-based numbers (DAU, trend, range counts) come from the daily
//! ledger and count each device once per local day. Breakdown numbers come
//! from the device table and reflect each device's current platform/version
//! snapshot, not its history.

use chrono::NaiveDate;
use rusqlite::params;
use serde::Serialize;

use super::Database;
use crate::error::Result;
use crate::timeutil::DayRange;

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub dau_today: u64,
    pub active_30d: u64,
    pub total_devices: u64,
    pub range_devices: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformCount {
    pub platform: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionCount {
    pub version: String,
    pub count: u64,
}

/// Distinct devices active on one local day.
#[derive(Debug, Clone, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
}

impl Database {
    fn distinct_devices_in(&self, range: DayRange) -> Result<u64> {
        let count = self.conn().query_row(
            "SELECT COUNT(DISTINCT device_id) FROM daily_activity
             WHERE seen_date >= ?1 AND seen_date < ?2",
            params![range.from.to_string(), range.to_exclusive.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Headline counters: today's actives, trailing-30-day actives, all-time
    /// device rows and distinct devices inside the caller-supplied range.
    pub fn overview(&self, range: DayRange, today: NaiveDate) -> Result<Overview> {
        let dau_today: u64 = self.conn().query_row(
            "SELECT COUNT(DISTINCT device_id) FROM daily_activity WHERE seen_date = ?1",
            params![today.to_string()],
            |row| row.get(0),
        )?;
        let active_30d = self.distinct_devices_in(DayRange::window(30, today))?;
        let total_devices: u64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM device_stats", [], |row| row.get(0))?;
        let range_devices = self.distinct_devices_in(range)?;

        Ok(Overview {
            dau_today,
            active_30d,
            total_devices,
            range_devices,
        })
    }

    /// Device rows grouped by current platform, largest group first.
    pub fn platform_breakdown(&self) -> Result<Vec<PlatformCount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT platform, COUNT(*) AS count FROM device_stats
             GROUP BY platform ORDER BY count DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PlatformCount {
                    platform: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Device rows grouped by current app version, largest group first.
    pub fn version_breakdown(&self) -> Result<Vec<VersionCount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT app_version, COUNT(*) AS count FROM device_stats
             GROUP BY app_version ORDER BY count DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(VersionCount {
                    version: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Per-day distinct-device counts inside the range plus the distinct
    /// count over the whole range. Days without activity yield no item.
    pub fn dau_trend(&self, range: DayRange) -> Result<(Vec<DayCount>, u64)> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT seen_date, COUNT(DISTINCT device_id) AS count FROM daily_activity
             WHERE seen_date >= ?1 AND seen_date < ?2
             GROUP BY seen_date ORDER BY seen_date",
        )?;
        let items = stmt
            .query_map(
                params![range.from.to_string(), range.to_exclusive.to_string()],
                |row| {
                    Ok(DayCount {
                        date: row.get(0)?,
                        count: row.get(1)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        let window_devices = self.distinct_devices_in(range)?;
        Ok((items, window_devices))
    }
}
