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

//! Version catalog
//!
//! The catalog carries a single mutable "current latest" marker across all
//! rows. Publish and edit keep the at-most-one-latest invariant by clearing
//! and re-setting the flag inside one transaction, so readers observe either
//! the old or the new latest, never zero or two.

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use serde::Deserialize;

use super::{Database, VersionRecord};
use crate::error::{Result, ServerError};

const MAX_PAGE_SIZE: u32 = 200;
const DEFAULT_PAGE_SIZE: u32 = 30;

const VERSION_COLUMNS: &str = "id, version, release_notes, download_url, \
     is_latest, is_beta, is_published, created_at, updated_at";

/// Partial update for a catalog record; only present fields are applied.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct VersionPatch {
    pub release_notes: Option<String>,
    pub download_url: Option<String>,
    pub is_beta: Option<bool>,
    pub is_published: Option<bool>,
    pub is_latest: Option<bool>,
}

/// A version string is considered a beta/pre-release channel build if it
/// carries a dash or one of the usual pre-release markers.
pub fn infer_beta(version: &str) -> bool {
    let v = version.to_lowercase();
    v.contains('-')
        || v.contains("alpha")
        || v.contains("beta")
        || v.contains("rc")
        || v.contains("preview")
        || v.contains("pre")
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<VersionRecord> {
    Ok(VersionRecord {
        id: row.get(0)?,
        version: row.get(1)?,
        release_notes: row.get(2)?,
        download_url: row.get(3)?,
        is_latest: row.get(4)?,
        is_beta: row.get(5)?,
        is_published: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl Database {
    /// Returns the current latest record, excluding beta builds unless the
    /// caller opted in. An empty catalog is a valid absent outcome.
    ///
    /// If a transient inconsistency ever leaves several rows flagged latest,
    /// the most recently created one wins.
    pub fn latest_eligible(&self, include_beta: bool) -> Result<Option<VersionRecord>> {
        let conn = self.conn();
        let sql = if include_beta {
            format!(
                "SELECT {VERSION_COLUMNS} FROM app_versions
                 WHERE is_latest = 1
                 ORDER BY created_at DESC LIMIT 1"
            )
        } else {
            format!(
                "SELECT {VERSION_COLUMNS} FROM app_versions
                 WHERE is_latest = 1 AND is_beta = 0
                 ORDER BY created_at DESC LIMIT 1"
            )
        };
        let record = conn.query_row(&sql, [], version_from_row).optional()?;
        Ok(record)
    }

    /// Publishes a version as the new latest. Upsert keyed on the version
    /// string: republishing overwrites notes/url and re-flags the row.
    pub fn publish(
        &self,
        version: &str,
        release_notes: &str,
        download_url: &str,
    ) -> Result<VersionRecord> {
        if version.trim().is_empty() {
            return Err(ServerError::Validation("version must not be empty".to_owned()));
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let is_beta = infer_beta(version);

        tx.execute(
            "UPDATE app_versions SET is_latest = 0 WHERE is_latest = 1",
            [],
        )?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM app_versions WHERE version = ?1",
                params![version],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            tx.execute(
                "UPDATE app_versions
                 SET release_notes = ?1, download_url = ?2, is_latest = 1,
                     is_beta = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![release_notes, download_url, is_beta, now, id],
            )?;
        } else {
            tx.execute(
                "INSERT INTO app_versions
                     (version, release_notes, download_url, is_latest, is_beta,
                      is_published, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4, 1, ?5, ?5)",
                params![version, release_notes, download_url, is_beta, now],
            )?;
        }

        let record = tx.query_row(
            &format!("SELECT {VERSION_COLUMNS} FROM app_versions WHERE version = ?1"),
            params![version],
            version_from_row,
        )?;
        tx.commit()?;

        Ok(record)
    }

    /// Applies a partial edit. Setting `is_latest = true` clears the flag on
    /// every other record inside the same transaction.
    pub fn edit_version(&self, id: i64, patch: &VersionPatch) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut record = tx
            .query_row(
                &format!("SELECT {VERSION_COLUMNS} FROM app_versions WHERE id = ?1"),
                params![id],
                version_from_row,
            )
            .optional()?
            .ok_or(ServerError::NotFound(id))?;

        if let Some(notes) = &patch.release_notes {
            record.release_notes = notes.clone();
        }
        if let Some(url) = &patch.download_url {
            record.download_url = url.clone();
        }
        if let Some(is_beta) = patch.is_beta {
            record.is_beta = is_beta;
        }
        if let Some(is_published) = patch.is_published {
            record.is_published = is_published;
        }
        if let Some(is_latest) = patch.is_latest {
            if is_latest {
                tx.execute(
                    "UPDATE app_versions SET is_latest = 0 WHERE is_latest = 1",
                    [],
                )?;
            }
            record.is_latest = is_latest;
        }

        tx.execute(
            "UPDATE app_versions
             SET release_notes = ?1, download_url = ?2, is_latest = ?3,
                 is_beta = ?4, is_published = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                record.release_notes,
                record.download_url,
                record.is_latest,
                record.is_beta,
                record.is_published,
                Utc::now().to_rfc3339(),
                id,
            ],
        )?;
        tx.commit()?;

        Ok(())
    }

    /// Hard delete. Deleting an unknown id is a no-op, matching best-effort
    /// operator tooling.
    pub fn delete_version(&self, id: i64) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM app_versions WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Offset-paginated listing, newest first.
    pub fn list_versions(&self, page: u32, page_size: u32) -> Result<(Vec<VersionRecord>, u64)> {
        let page = page.max(1);
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE)
        };
        let offset = i64::from(page - 1) * i64::from(page_size);

        let conn = self.conn();
        let total: u64 = conn.query_row("SELECT COUNT(*) FROM app_versions", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM app_versions
             ORDER BY created_at DESC, id DESC
             LIMIT ?1 OFFSET ?2"
        ))?;
        let items = stmt
            .query_map(params![page_size, offset], version_from_row)?
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

    #[test]
    fn test_infer_beta() {
        assert!(infer_beta("1.2.0-beta.1"));
        assert!(infer_beta("1.2.0rc1"));
        assert!(infer_beta("2.0.0_ALPHA"));
        assert!(infer_beta("3.0.0.preview"));
        assert!(!infer_beta("1.2.0"));
        assert!(!infer_beta("v10.0.3"));
    }

    #[test]
    fn test_publish_flips_latest_to_newest() {
        let db = mem();
        db.publish("1.0.0", "first", "https://dl/1.0.0").unwrap();
        let v2 = db.publish("2.0.0", "second", "https://dl/2.0.0").unwrap();
        assert!(v2.is_latest);

        let latest = db.latest_eligible(false).unwrap().unwrap();
        assert_eq!(latest.version, "2.0.0");

        let (items, total) = db.list_versions(1, 10).unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.iter().filter(|v| v.is_latest).count(), 1);
    }

    #[test]
    fn test_republish_same_version_overwrites_metadata() {
        let db = mem();
        let first = db.publish("1.0.0", "old notes", "https://dl/old").unwrap();
        db.publish("2.0.0", "", "").unwrap();
        let again = db.publish("1.0.0", "new notes", "https://dl/new").unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(again.release_notes, "new notes");
        assert!(again.is_latest);

        let (items, total) = db.list_versions(1, 10).unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.iter().filter(|v| v.is_latest).count(), 1);
        assert_eq!(db.latest_eligible(false).unwrap().unwrap().version, "1.0.0");
    }

    #[test]
    fn test_publish_rejects_empty_version() {
        let db = mem();
        assert!(matches!(
            db.publish("  ", "", ""),
            Err(ServerError::Validation(_))
        ));
    }

    #[test]
    fn test_latest_eligible_beta_gating() {
        let db = mem();
        assert!(db.latest_eligible(true).unwrap().is_none());

        let beta = db.publish("2.0.0-beta.1", "", "").unwrap();
        assert!(beta.is_beta);

        // The only latest record is beta: stable callers see nothing
        assert!(db.latest_eligible(false).unwrap().is_none());
        let eligible = db.latest_eligible(true).unwrap().unwrap();
        assert_eq!(eligible.version, "2.0.0-beta.1");
    }

    #[test]
    fn test_edit_applies_only_present_fields() {
        let db = mem();
        let v = db.publish("1.0.0", "notes", "https://dl/1.0.0").unwrap();

        db.edit_version(
            v.id,
            &VersionPatch {
                release_notes: Some("edited".to_owned()),
                ..VersionPatch::default()
            },
        )
        .unwrap();

        let latest = db.latest_eligible(false).unwrap().unwrap();
        assert_eq!(latest.release_notes, "edited");
        assert_eq!(latest.download_url, "https://dl/1.0.0");
        assert!(latest.is_latest);
    }

    #[test]
    fn test_edit_set_latest_clears_other_rows() {
        let db = mem();
        let old = db.publish("1.0.0", "", "").unwrap();
        db.publish("2.0.0", "", "").unwrap();

        db.edit_version(
            old.id,
            &VersionPatch {
                is_latest: Some(true),
                ..VersionPatch::default()
            },
        )
        .unwrap();

        let (items, _) = db.list_versions(1, 10).unwrap();
        assert_eq!(items.iter().filter(|v| v.is_latest).count(), 1);
        assert_eq!(db.latest_eligible(false).unwrap().unwrap().version, "1.0.0");
    }

    #[test]
    fn test_edit_unknown_id_is_not_found() {
        let db = mem();
        assert!(matches!(
            db.edit_version(42, &VersionPatch::default()),
            Err(ServerError::NotFound(42))
        ));
    }

    #[test]
    fn test_delete_is_idempotent_by_id() {
        let db = mem();
        let v = db.publish("1.0.0", "", "").unwrap();
        db.delete_version(v.id).unwrap();
        db.delete_version(v.id).unwrap();
        assert!(db.latest_eligible(true).unwrap().is_none());
    }

    #[test]
    fn test_list_versions_pagination_and_clamp() {
        let db = mem();
        for i in 0..5 {
            db.publish(&format!("1.0.{i}"), "", "").unwrap();
        }

        let (items, total) = db.list_versions(2, 2).unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);

        // Oversized page size is clamped rather than rejected
        let (items, _) = db.list_versions(1, 10_000).unwrap();
        assert_eq!(items.len(), 5);
    }
}
