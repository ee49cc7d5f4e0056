#![forbid(unsafe_code)]

mod error;
mod keys;
mod tree;
mod unit_of_work;

pub use error::StoreError;
pub use keys::{Key, NodeKey, ProjectKey, RecordKind, SnapshotKey};
pub use tree::TreeStore;
pub use unit_of_work::{RetryPolicy, UnitOfWork};

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use scribe_core::OwnerId;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const DB_FILE_NAME: &str = "scribe.db";
const SCHEMA_VERSION: i64 = 1;

/// Key-value substrate: records addressed by key path, grouped for atomic commits.
///
/// One connection is shared behind a mutex. Reads lock it per call; a unit of work
/// only holds it while committing, so concurrent writers race optimistically and
/// the loser observes a bumped group version.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    storage_dir: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE_NAME))?;
        Self::from_connection(conn, Some(storage_dir))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, storage_dir: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;

        preflight_gate(&conn)?;
        install_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            storage_dir,
        })
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    /// Point-in-time read outside any unit of work.
    pub fn get<T: DeserializeOwned>(&self, key: &Key) -> Result<Option<T>, StoreError> {
        let conn = self.lock()?;
        read_record(&conn, key)
    }

    pub fn get_multi<T: DeserializeOwned>(&self, keys: &[Key]) -> Result<Vec<Option<T>>, StoreError> {
        let conn = self.lock()?;
        keys.iter().map(|key| read_record(&conn, key)).collect()
    }

    /// Runs `work` as one atomic unit, retrying it from scratch when another commit
    /// touched one of its key groups first.
    pub fn run<T, F>(&self, policy: RetryPolicy, mut work: F) -> Result<T, StoreError>
    where
        F: FnMut(&mut UnitOfWork<'_>) -> Result<T, StoreError>,
    {
        let attempts = policy.attempts.max(1);
        for attempt in 1..=attempts {
            let mut unit = UnitOfWork::new(self);
            let value = match work(&mut unit) {
                Ok(value) => value,
                Err(StoreError::TransactionConflict { .. }) => {
                    tracing::warn!(attempt, attempts, "unit of work observed a stale read");
                    continue;
                }
                Err(err) => return Err(err),
            };
            if unit.commit()? {
                return Ok(value);
            }
            tracing::warn!(attempt, attempts, "unit of work lost a commit race");
        }
        Err(StoreError::TransactionConflict { attempts })
    }

    pub fn project_keys(&self, owner: &OwnerId) -> Result<Vec<ProjectKey>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT record_key FROM records WHERE kind=?1 AND owner=?2 ORDER BY record_key ASC",
        )?;
        let mut rows = stmt.query(params![RecordKind::Project.as_str(), owner.as_str()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let encoded = row.get::<_, String>(0)?;
            let key = ProjectKey::decode(&encoded)
                .ok_or_else(|| StoreError::corrupt(format!("undecodable project key {encoded:?}")))?;
            out.push(key);
        }
        Ok(out)
    }

    /// Hands out ids from a counter committed on its own, so ids burned by a rolled-back
    /// unit of work are never handed out again.
    pub(crate) fn allocate_id(&self, kind: RecordKind) -> Result<i64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let next = tx
            .query_row(
                "SELECT next_id FROM id_counters WHERE kind=?1",
                params![kind.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .unwrap_or(1);
        tx.execute(
            "INSERT INTO id_counters(kind, next_id) VALUES (?1, ?2) \
             ON CONFLICT(kind) DO UPDATE SET next_id=excluded.next_id",
            params![kind.as_str(), next + 1],
        )?;
        tx.commit()?;
        Ok(next)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

pub(crate) fn read_record<T: DeserializeOwned>(
    conn: &Connection,
    key: &Key,
) -> Result<Option<T>, StoreError> {
    let encoded = key.encode();
    let body = conn
        .query_row(
            "SELECT body FROM records WHERE record_key=?1",
            params![encoded],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    body.map(|body| decode_record(&encoded, &body)).transpose()
}

pub(crate) fn decode_record<T: DeserializeOwned>(encoded: &str, body: &str) -> Result<T, StoreError> {
    serde_json::from_str(body)
        .map_err(|err| StoreError::corrupt(format!("record {encoded:?} does not decode: {err}")))
}

pub(crate) fn group_version(conn: &Connection, group: &str) -> Result<i64, StoreError> {
    Ok(conn
        .query_row(
            "SELECT version FROM groups WHERE group_key=?1",
            params![group],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .unwrap_or(0))
}

pub(crate) fn bump_group_tx(tx: &Transaction<'_>, group: &str) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO groups(group_key, version) VALUES (?1, 1) \
         ON CONFLICT(group_key) DO UPDATE SET version=version + 1",
        params![group],
    )?;
    Ok(())
}

/// Tables owned by this store; anything else in the file means it is not ours.
const TABLES: [&str; 4] = ["store_state", "records", "groups", "id_counters"];

#[derive(Debug, PartialEq, Eq)]
enum SchemaState {
    Empty,
    Current,
    ResetRequired(&'static str),
}

fn inspect_schema(conn: &Connection) -> Result<SchemaState, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;

    if tables.is_empty() {
        return Ok(SchemaState::Empty);
    }
    if tables.iter().any(|table| !TABLES.contains(&table.as_str())) {
        return Ok(SchemaState::ResetRequired(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }
    if TABLES.iter().any(|table| !tables.contains(*table)) {
        return Ok(SchemaState::ResetRequired(
            "RESET_REQUIRED: required table is missing",
        ));
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(match version {
        Some(SCHEMA_VERSION) => SchemaState::Current,
        Some(_) => SchemaState::ResetRequired("RESET_REQUIRED: schema version mismatch"),
        None => SchemaState::ResetRequired("RESET_REQUIRED: schema state row is missing"),
    })
}

/// Refuses to open a file this store did not create, or one from another schema version.
fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    match inspect_schema(conn)? {
        SchemaState::Empty | SchemaState::Current => Ok(()),
        SchemaState::ResetRequired(reason) => {
            tracing::warn!(reason, "storage schema rejected");
            Err(StoreError::InvalidInput(reason))
        }
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS records (
          record_key TEXT PRIMARY KEY,
          group_key TEXT NOT NULL,
          kind TEXT NOT NULL,
          owner TEXT NOT NULL,
          body TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_owner_kind
          ON records(owner, kind, record_key);

        CREATE TABLE IF NOT EXISTS groups (
          group_key TEXT PRIMARY KEY,
          version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS id_counters (
          kind TEXT PRIMARY KEY,
          next_id INTEGER NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version) VALUES (1, ?1) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version",
        params![SCHEMA_VERSION],
    )?;

    Ok(())
}
