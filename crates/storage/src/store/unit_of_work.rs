#![forbid(unsafe_code)]

use super::keys::{Key, RecordKind};
use super::{SqliteStore, StoreError, bump_group_tx, decode_record, group_version, read_record};
use rusqlite::{TransactionBehavior, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

const DEFAULT_ATTEMPTS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn attempts(attempts: u32) -> Self {
        Self { attempts }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
        }
    }
}

#[derive(Debug)]
enum PendingWrite {
    Put {
        group: String,
        kind: RecordKind,
        owner: String,
        body: String,
    },
    Delete {
        group: String,
    },
}

impl PendingWrite {
    fn group(&self) -> &str {
        match self {
            PendingWrite::Put { group, .. } | PendingWrite::Delete { group } => group,
        }
    }
}

/// Read set plus buffered write set of one atomic unit.
///
/// Reads go to the store but are pinned to the group version first observed;
/// writes stay in memory until `commit`, which applies them only if no observed
/// group moved in the meantime.
#[derive(Debug)]
pub struct UnitOfWork<'store> {
    store: &'store SqliteStore,
    observed: BTreeMap<String, i64>,
    writes: BTreeMap<String, PendingWrite>,
}

impl<'store> UnitOfWork<'store> {
    pub(crate) fn new(store: &'store SqliteStore) -> Self {
        Self {
            store,
            observed: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn get<T: DeserializeOwned>(&mut self, key: &Key) -> Result<Option<T>, StoreError> {
        let encoded = key.encode();
        match self.writes.get(&encoded) {
            Some(PendingWrite::Put { body, .. }) => return decode_record(&encoded, body).map(Some),
            Some(PendingWrite::Delete { .. }) => return Ok(None),
            None => {}
        }

        let conn = self.store.lock()?;
        let group = key.group();
        let version = group_version(&conn, &group)?;
        match self.observed.get(&group) {
            Some(pinned) if *pinned != version => {
                return Err(StoreError::TransactionConflict { attempts: 0 });
            }
            Some(_) => {}
            None => {
                self.observed.insert(group, version);
            }
        }
        read_record(&conn, key)
    }

    pub fn get_multi<T: DeserializeOwned>(&mut self, keys: &[Key]) -> Result<Vec<Option<T>>, StoreError> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    pub fn put<T: Serialize>(&mut self, key: &Key, record: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string(record)
            .map_err(|err| StoreError::corrupt(format!("record does not encode: {err}")))?;
        let group = key.group();
        self.observe(&group)?;
        self.writes.insert(
            key.encode(),
            PendingWrite::Put {
                group,
                kind: key.kind(),
                owner: key.owner().as_str().to_string(),
                body,
            },
        );
        Ok(())
    }

    pub fn delete(&mut self, key: &Key) -> Result<(), StoreError> {
        let group = key.group();
        self.observe(&group)?;
        self.writes
            .insert(key.encode(), PendingWrite::Delete { group });
        Ok(())
    }

    pub fn allocate_id(&self, kind: RecordKind) -> Result<i64, StoreError> {
        self.store.allocate_id(kind)
    }

    fn observe(&mut self, group: &str) -> Result<(), StoreError> {
        if self.observed.contains_key(group) {
            return Ok(());
        }
        let version = {
            let conn = self.store.lock()?;
            group_version(&conn, group)?
        };
        self.observed.insert(group.to_string(), version);
        Ok(())
    }

    /// Returns `false` when an observed group changed and nothing was written.
    pub(crate) fn commit(self) -> Result<bool, StoreError> {
        if self.writes.is_empty() {
            return Ok(true);
        }

        let mut conn = self.store.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for (group, pinned) in &self.observed {
            if group_version(&tx, group)? != *pinned {
                return Ok(false);
            }
        }

        let mut touched = Vec::new();
        for (record_key, write) in &self.writes {
            match write {
                PendingWrite::Put {
                    group,
                    kind,
                    owner,
                    body,
                } => {
                    tx.execute(
                        "INSERT INTO records(record_key, group_key, kind, owner, body) \
                         VALUES (?1, ?2, ?3, ?4, ?5) \
                         ON CONFLICT(record_key) DO UPDATE SET body=excluded.body",
                        params![record_key, group, kind.as_str(), owner, body],
                    )?;
                }
                PendingWrite::Delete { .. } => {
                    tx.execute(
                        "DELETE FROM records WHERE record_key=?1",
                        params![record_key],
                    )?;
                }
            }
            if !touched.contains(&write.group()) {
                touched.push(write.group());
            }
        }

        for group in &touched {
            bump_group_tx(&tx, group)?;
        }

        tx.commit()?;
        tracing::debug!(
            writes = self.writes.len(),
            groups = touched.len(),
            "unit of work committed"
        );
        Ok(true)
    }
}
