//! SQLite implementation of the Store trait.
//!
//! The persistent backend for the Message Box Kernel. Uses rusqlite with
//! bundled SQLite, wrapped in async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use msgbox_kernel_authz::{Directory, GenesisDirectory};
use msgbox_kernel_core::{AgentId, AgentRecord, SecurityCode, Watermark};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{AdminOutcome, CommitOutcome, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. Every operation runs on a blocking thread;
/// multi-table writes run in one transaction.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on a blocking thread.
    async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

// SQLite integers are signed; u64 values are stored bit-for-bit.
fn to_sql(value: u64) -> i64 {
    value as i64
}

fn from_sql(value: i64) -> u64 {
    value as u64
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentRecord> {
    let last: i64 = row.get("last_message_number")?;
    let code: Vec<u8> = row.get("security_code")?;
    let code: [u8; 2] = code.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(0, "security_code".into(), rusqlite::types::Type::Blob)
    })?;
    Ok(AgentRecord::new(from_sql(last), SecurityCode::from_bytes(code)))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(AgentId, AgentRecord)> {
    let agent_id: i64 = row.get("agent_id")?;
    Ok((AgentId::new(from_sql(agent_id)), row_to_record(row)?))
}

fn read_height(tx: &Transaction<'_>) -> Result<u64> {
    let height: i64 = tx.query_row("SELECT height FROM kernel_state WHERE id = 1", [], |row| {
        row.get(0)
    })?;
    Ok(from_sql(height))
}

fn bump_height(tx: &Transaction<'_>) -> Result<u64> {
    tx.execute(
        "UPDATE kernel_state SET height = height + 1, updated_at = ?1 WHERE id = 1",
        [now_millis()],
    )?;
    read_height(tx)
}

fn upsert_agent(tx: &Transaction<'_>, agent_id: AgentId, record: &AgentRecord) -> Result<()> {
    tx.execute(
        "INSERT INTO agents (agent_id, last_message_number, security_code, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(agent_id) DO UPDATE SET
            last_message_number = excluded.last_message_number,
            security_code = excluded.security_code,
            updated_at = excluded.updated_at",
        params![
            to_sql(agent_id.get()),
            to_sql(record.last_message_number),
            record.security_code.as_bytes().as_slice(),
            now_millis(),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_agent(&self, agent_id: AgentId) -> Result<Option<AgentRecord>> {
        self.call(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT last_message_number, security_code FROM agents WHERE agent_id = ?1",
                    [to_sql(agent_id.get())],
                    row_to_record,
                )
                .optional()?)
        })
        .await
    }

    async fn load_directory(&self) -> Result<Directory> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT agent_id, last_message_number, security_code FROM agents ORDER BY agent_id",
            )?;
            let entries = stmt
                .query_map([], row_to_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries.into_iter().collect())
        })
        .await
    }

    async fn register_agent(&self, agent_id: AgentId, record: AgentRecord) -> Result<AdminOutcome> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let height = read_height(&tx)?;
            if height > 0 {
                return Ok(AdminOutcome::PastGenesis { height });
            }
            upsert_agent(&tx, agent_id, &record)?;
            tx.commit()?;
            Ok(AdminOutcome::Applied)
        })
        .await
    }

    async fn apply_agent_update(&self, agent_id: AgentId, record: AgentRecord) -> Result<u64> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            upsert_agent(&tx, agent_id, &record)?;
            let height = bump_height(&tx)?;
            tx.commit()?;
            Ok(height)
        })
        .await
    }

    async fn get_genesis_agent(&self, agent_id: AgentId) -> Result<Option<AgentRecord>> {
        self.call(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT last_message_number, security_code FROM genesis_agents WHERE agent_id = ?1",
                    [to_sql(agent_id.get())],
                    row_to_record,
                )
                .optional()?)
        })
        .await
    }

    async fn load_genesis(&self) -> Result<GenesisDirectory> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT agent_id, last_message_number, security_code
                 FROM genesis_agents ORDER BY agent_id",
            )?;
            let entries = stmt
                .query_map([], row_to_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            GenesisDirectory::from_entries(entries)
                .map_err(|e| StoreError::InvalidData(e.to_string()))
        })
        .await
    }

    async fn install_genesis(&self, genesis: &GenesisDirectory) -> Result<AdminOutcome> {
        let genesis = genesis.clone();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let (installed, height): (i64, i64) = tx.query_row(
                "SELECT genesis_installed, height FROM kernel_state WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            if installed != 0 {
                return Ok(AdminOutcome::AlreadyInstalled);
            }
            if height > 0 {
                return Ok(AdminOutcome::PastGenesis {
                    height: from_sql(height),
                });
            }

            {
                let mut insert = tx.prepare(
                    "INSERT INTO genesis_agents (agent_id, last_message_number, security_code)
                     VALUES (?1, ?2, ?3)",
                )?;
                for (agent_id, record) in genesis.iter() {
                    insert.execute(params![
                        to_sql(agent_id.get()),
                        to_sql(record.last_message_number),
                        record.security_code.as_bytes().as_slice(),
                    ])?;
                }
            }

            tx.execute(
                "UPDATE kernel_state SET genesis_installed = 1, updated_at = ?1 WHERE id = 1",
                [now_millis()],
            )?;
            tx.commit()?;
            Ok(AdminOutcome::Applied)
        })
        .await
    }

    async fn genesis_installed(&self) -> Result<bool> {
        self.call(|conn| {
            let installed: i64 = conn.query_row(
                "SELECT genesis_installed FROM kernel_state WHERE id = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(installed != 0)
        })
        .await
    }

    async fn watermark(&self) -> Result<Watermark> {
        self.call(|conn| {
            let watermark: i64 =
                conn.query_row("SELECT watermark FROM kernel_state WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            Ok(Watermark(from_sql(watermark)))
        })
        .await
    }

    async fn height(&self) -> Result<u64> {
        self.call(|conn| {
            let height: i64 =
                conn.query_row("SELECT height FROM kernel_state WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            Ok(from_sql(height))
        })
        .await
    }

    async fn compare_and_swap_watermark(
        &self,
        expected: Watermark,
        new: Watermark,
    ) -> Result<CommitOutcome> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let current: i64 =
                tx.query_row("SELECT watermark FROM kernel_state WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            let current = Watermark(from_sql(current));
            if current != expected {
                return Ok(CommitOutcome::Stale { current });
            }

            tx.execute(
                "UPDATE kernel_state SET watermark = ?1, updated_at = ?2 WHERE id = 1",
                params![to_sql(new.get()), now_millis()],
            )?;
            let height = bump_height(&tx)?;
            tx.commit()?;
            Ok(CommitOutcome::Committed { height })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(last: u64, code: &[u8; 2]) -> AgentRecord {
        AgentRecord::new(last, SecurityCode::from_bytes(*code))
    }

    #[tokio::test]
    async fn test_fresh_state() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.watermark().await.unwrap(), Watermark::GENESIS);
        assert_eq!(store.height().await.unwrap(), 0);
        assert!(!store.genesis_installed().await.unwrap());
    }

    #[tokio::test]
    async fn test_agent_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let id = AgentId::new(42);

        assert!(store.get_agent(id).await.unwrap().is_none());
        store.register_agent(id, record(0, b"Q4")).await.unwrap();
        assert_eq!(store.get_agent(id).await.unwrap(), Some(record(0, b"Q4")));

        let height = store.apply_agent_update(id, record(9, b"Q4")).await.unwrap();
        assert_eq!(height, 1);
        assert_eq!(store.get_agent(id).await.unwrap(), Some(record(9, b"Q4")));
        assert_eq!(store.load_directory().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_large_values_survive() {
        let store = SqliteStore::open_memory().unwrap();
        let id = AgentId::new(u64::MAX);
        store.register_agent(id, record(u64::MAX - 1, b"ZZ")).await.unwrap();
        assert_eq!(store.get_agent(id).await.unwrap(), Some(record(u64::MAX - 1, b"ZZ")));

        store
            .compare_and_swap_watermark(Watermark(0), Watermark(u64::MAX))
            .await
            .unwrap();
        assert_eq!(store.watermark().await.unwrap(), Watermark(u64::MAX));
    }

    #[tokio::test]
    async fn test_cas_and_height() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(
            store
                .compare_and_swap_watermark(Watermark(0), Watermark(7))
                .await
                .unwrap(),
            CommitOutcome::Committed { height: 1 }
        );
        assert_eq!(
            store
                .compare_and_swap_watermark(Watermark(3), Watermark(9))
                .await
                .unwrap(),
            CommitOutcome::Stale {
                current: Watermark(7)
            }
        );
        assert_eq!(store.height().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_genesis_install_rules() {
        let store = SqliteStore::open_memory().unwrap();
        let genesis = GenesisDirectory::from_entries([
            (AgentId::new(7), record(0, b"A7")),
            (AgentId::new(8), record(2, b"A8")),
        ])
        .unwrap();

        assert_eq!(store.install_genesis(&genesis).await.unwrap(), AdminOutcome::Applied);
        assert_eq!(
            store.install_genesis(&genesis).await.unwrap(),
            AdminOutcome::AlreadyInstalled
        );
        assert_eq!(store.load_genesis().await.unwrap(), genesis);
        assert_eq!(
            store.get_genesis_agent(AgentId::new(8)).await.unwrap(),
            Some(record(2, b"A8"))
        );
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.register_agent(AgentId::new(7), record(0, b"A7")).await.unwrap();
            store
                .install_genesis(
                    &GenesisDirectory::from_entries([(AgentId::new(3), record(0, b"C3"))]).unwrap(),
                )
                .await
                .unwrap();
            store
                .compare_and_swap_watermark(Watermark(0), Watermark(12))
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.watermark().await.unwrap(), Watermark(12));
        assert_eq!(store.height().await.unwrap(), 1);
        assert!(store.genesis_installed().await.unwrap());
        assert_eq!(store.get_agent(AgentId::new(7)).await.unwrap(), Some(record(0, b"A7")));
        assert!(store.get_genesis_agent(AgentId::new(3)).await.unwrap().is_some());
        assert_eq!(
            store.register_agent(AgentId::new(9), record(0, b"C9")).await.unwrap(),
            AdminOutcome::PastGenesis { height: 1 }
        );
    }
}
