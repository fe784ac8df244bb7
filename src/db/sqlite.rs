// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite store with typed operations.
//!
//! Provides high-level operations for:
//! - Accounts (credentials, OAuth tokens, sync watermark)
//! - Activities (synced Strava activities with decoded geometry)

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::db::tables;
use crate::error::StorageError;
use crate::models::{Account, Activity, TokenSet};
use crate::time_utils::from_epoch_secs;

/// SQLite database handle, shared between concurrent account syncs.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "Opened SQLite database");
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    // ─── Account Operations ──────────────────────────────────────

    /// Insert an account, or replace its credentials and tokens.
    ///
    /// The stored `last_sync_at` is kept when the account already exists, so
    /// re-authorizing never rewinds the watermark.
    pub fn upsert_account(&self, account: &Account) -> Result<(), StorageError> {
        self.lock()?.execute(
            &format!(
                "INSERT INTO {} (id, username, client_id, client_secret, access_token,
                                 refresh_token, expires_at, last_sync_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     username = excluded.username,
                     client_id = excluded.client_id,
                     client_secret = excluded.client_secret,
                     access_token = excluded.access_token,
                     refresh_token = excluded.refresh_token,
                     expires_at = excluded.expires_at",
                tables::ACCOUNTS
            ),
            params![
                account.id,
                account.username,
                account.client_id,
                account.client_secret,
                account.access_token,
                account.refresh_token,
                account.expires_at.timestamp(),
                account.last_sync_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Overwrite the token fields of an existing account.
    pub fn update_tokens(&self, account_id: &str, tokens: &TokenSet) -> Result<(), StorageError> {
        let updated = self.lock()?.execute(
            &format!(
                "UPDATE {} SET access_token = ?2, refresh_token = ?3, expires_at = ?4
                 WHERE id = ?1",
                tables::ACCOUNTS
            ),
            params![
                account_id,
                tokens.access_token,
                tokens.refresh_token,
                tokens.expires_at.timestamp(),
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::AccountNotFound(account_id.to_string()));
        }
        Ok(())
    }

    /// Get an account by ID.
    pub fn get_account(&self, account_id: &str) -> Result<Option<Account>, StorageError> {
        let account = self
            .lock()?
            .query_row(
                &format!("SELECT {} FROM {} WHERE id = ?1", ACCOUNT_COLUMNS, tables::ACCOUNTS),
                params![account_id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    /// All stored accounts, ordered by ID.
    pub fn list_accounts(&self) -> Result<Vec<Account>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY id",
            ACCOUNT_COLUMNS,
            tables::ACCOUNTS
        ))?;
        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Insert or fully replace activities by ID, all-or-nothing.
    pub fn upsert_activities(&self, activities: &[Activity]) -> Result<usize, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let written = write_activities(&tx, activities)?;
        tx.commit()?;
        Ok(written)
    }

    /// Persist a sync batch and advance the account watermark atomically.
    ///
    /// The watermark only moves forward: an older `watermark` than the stored
    /// one leaves it untouched.
    pub fn commit_sync(
        &self,
        account_id: &str,
        activities: &[Activity],
        watermark: DateTime<Utc>,
    ) -> Result<usize, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let written = write_activities(&tx, activities)?;

        let updated = tx.execute(
            &format!(
                "UPDATE {} SET last_sync_at = MAX(last_sync_at, ?2) WHERE id = ?1",
                tables::ACCOUNTS
            ),
            params![account_id, watermark.timestamp()],
        )?;
        if updated == 0 {
            // Dropping `tx` rolls back the activity writes.
            return Err(StorageError::AccountNotFound(account_id.to_string()));
        }

        tx.commit()?;
        Ok(written)
    }

    /// Get an activity by ID.
    pub fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, StorageError> {
        let activity = self
            .lock()?
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    ACTIVITY_COLUMNS,
                    tables::ACTIVITIES
                ),
                params![activity_id],
                activity_from_row,
            )
            .optional()?;
        Ok(activity)
    }

    /// Number of stored activities owned by an account.
    pub fn count_activities(&self, account_id: &str) -> Result<usize, StorageError> {
        let count: i64 = self.lock()?.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE account_id = ?1",
                tables::ACTIVITIES
            ),
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, client_id, client_secret, access_token, \
                               refresh_token, expires_at, last_sync_at";

const ACTIVITY_COLUMNS: &str = "id, type, name, distance, moving_time, elapsed_time, \
                                start_date, start_date_local, country, city, state, \
                                average_speed, summary_polyline, summary_geojson, account_id";

/// Create tables if they do not exist yet.
fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {accounts} (
            id TEXT PRIMARY KEY,
            username TEXT,
            client_id TEXT NOT NULL,
            client_secret TEXT NOT NULL,
            access_token TEXT NOT NULL DEFAULT '',
            refresh_token TEXT NOT NULL DEFAULT '',
            expires_at INTEGER NOT NULL DEFAULT 0,
            last_sync_at INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS {activities} (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL,
            name TEXT NOT NULL,
            distance REAL NOT NULL,
            moving_time INTEGER NOT NULL,
            elapsed_time INTEGER NOT NULL,
            start_date TEXT NOT NULL,
            start_date_local TEXT NOT NULL,
            country TEXT,
            city TEXT,
            state TEXT,
            average_speed REAL NOT NULL,
            summary_polyline TEXT NOT NULL DEFAULT '',
            summary_geojson TEXT,
            account_id TEXT NOT NULL REFERENCES {accounts}(id)
        );

        CREATE INDEX IF NOT EXISTS idx_activities_account_id ON {activities}(account_id);
        "#,
        accounts = tables::ACCOUNTS,
        activities = tables::ACTIVITIES,
    ))?;
    Ok(())
}

fn write_activities(tx: &Transaction<'_>, activities: &[Activity]) -> Result<usize, StorageError> {
    let mut stmt = tx.prepare_cached(&format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        tables::ACTIVITIES,
        ACTIVITY_COLUMNS
    ))?;

    for activity in activities {
        stmt.execute(params![
            activity.id,
            activity.kind,
            activity.name,
            activity.distance,
            activity.moving_time,
            activity.elapsed_time,
            activity.start_date,
            activity.start_date_local,
            activity.country,
            activity.city,
            activity.state,
            activity.average_speed,
            activity.summary_polyline,
            activity.summary_geojson,
            activity.account_id,
        ])?;
    }

    Ok(activities.len())
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        client_id: row.get(2)?,
        client_secret: row.get(3)?,
        access_token: row.get(4)?,
        refresh_token: row.get(5)?,
        expires_at: from_epoch_secs(row.get(6)?),
        last_sync_at: from_epoch_secs(row.get(7)?),
    })
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        distance: row.get(3)?,
        moving_time: row.get(4)?,
        elapsed_time: row.get(5)?,
        start_date: row.get(6)?,
        start_date_local: row.get(7)?,
        country: row.get(8)?,
        city: row.get(9)?,
        state: row.get(10)?,
        average_speed: row.get(11)?,
        summary_polyline: row.get(12)?,
        summary_geojson: row.get(13)?,
        account_id: row.get(14)?,
    })
}
