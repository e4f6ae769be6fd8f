//! Database schema migrations for SQLite.
//!
//! Each migration transforms the schema from version N to N+1 and is recorded
//! in `schema_migrations`.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            debug!(version, "applying schema migration");
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Mutable agent directory
        CREATE TABLE agents (
            agent_id INTEGER PRIMARY KEY,
            last_message_number INTEGER NOT NULL,
            security_code BLOB NOT NULL,       -- 2 bytes
            updated_at INTEGER NOT NULL
        );

        -- Immutable genesis directory
        CREATE TABLE genesis_agents (
            agent_id INTEGER PRIMARY KEY,
            last_message_number INTEGER NOT NULL,
            security_code BLOB NOT NULL
        );

        -- Single-row kernel state
        CREATE TABLE kernel_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            watermark INTEGER NOT NULL,
            height INTEGER NOT NULL,
            genesis_installed INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT INTO kernel_state (id, watermark, height, genesis_installed, updated_at)
         VALUES (1, 0, 0, 0, ?1)",
        [now_millis()],
    )?;

    Ok(())
}

/// Current time in milliseconds, 0 if the clock is before the epoch.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
