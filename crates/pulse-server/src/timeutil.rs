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

//! Fixed-offset business calendar
//!
//! Daily-active bucketing runs on a fixed UTC+8 calendar regardless of the
//! host timezone, as explicit arithmetic on the instant rather than a tzdb
//! lookup, so the same instant always lands in the same bucket on every
//! deployment.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::{Result, ServerError};

/// Offset of the business calendar from UTC.
pub const LOCAL_OFFSET_HOURS: i64 = 8;

/// Calendar day an instant falls into: shift by the fixed offset, then
/// truncate to the date.
pub fn local_day(at: DateTime<Utc>) -> NaiveDate {
    (at + Duration::hours(LOCAL_OFFSET_HOURS)).date_naive()
}

/// Current local calendar day.
pub fn today() -> NaiveDate {
    local_day(Utc::now())
}

/// Half-open range of local calendar days `[from, to_exclusive)`.
///
/// Stored dates are ISO `YYYY-MM-DD` strings, so range scans compare
/// lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub from: NaiveDate,
    pub to_exclusive: NaiveDate,
}

impl DayRange {
    /// Trailing `days` local days ending at (and including) `today`.
    pub fn window(days: u32, today: NaiveDate) -> Self {
        let days = i64::from(days.max(1));
        Self {
            from: today - Duration::days(days - 1),
            to_exclusive: today + Duration::days(1),
        }
    }

    /// Inclusive `from`/`to` calendar dates, converted to half-open.
    pub fn custom(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(ServerError::Validation(format!(
                "invalid date range: {from} is after {to}"
            )));
        }
        Ok(Self {
            from,
            to_exclusive: to + Duration::days(1),
        })
    }

    /// Parses a window selector as the stats endpoints receive it.
    ///
    /// `7d` (the default for anything unrecognized) and `30d` are trailing
    /// windows ending today; `custom` requires both `from` and `to` as
    /// `YYYY-MM-DD`.
    pub fn parse(
        window: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self> {
        match window.unwrap_or("7d") {
            "custom" => {
                let (Some(from), Some(to)) = (from, to) else {
                    return Err(ServerError::Validation(
                        "custom window requires both from and to".to_owned(),
                    ));
                };
                let from = parse_day(from)?;
                let to = parse_day(to)?;
                Self::custom(from, to)
            }
            "30d" => Ok(Self::window(30, today)),
            _ => Ok(Self::window(7, today)),
        }
    }
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ServerError::Validation(format!("invalid date: {s}, expected YYYY-MM-DD")))
}
