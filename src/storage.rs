//! Event journal storage
//!
//! SQLite-backed append-only log of [`EventRecord`]s. The journal is the
//! durable source of truth; the in-memory ledger is rebuilt from it on start.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{EscrowError, Result};
use crate::events::{EventRecord, Hash, LedgerEvent, GENESIS_HASH};
use crate::types::{BountyId, Timestamp};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    seq INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    bounty_id INTEGER,
    payload TEXT NOT NULL,
    recorded_at INTEGER NOT NULL,
    prev_hash TEXT NOT NULL,
    hash TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_bounty ON events (bounty_id);
"#;

const SELECT_COLUMNS: &str = "SELECT seq, recorded_at, payload, prev_hash, hash FROM events";

type RawRow = (i64, i64, String, String, String);

pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        info!("Opened event journal at {}", path.display());
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open `path`, treating `:memory:` as an ephemeral journal.
    pub fn open(path: &str) -> Result<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::new(path)
        }
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Append one event, linking it to the current head of the chain.
    pub fn append(&self, timestamp: Timestamp, event: &LedgerEvent) -> Result<EventRecord> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let head: Option<(i64, String)> = tx
            .query_row(
                "SELECT seq, hash FROM events ORDER BY seq DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (seq, prev_hash) = match head {
            Some((seq, hash)) => (seq as u64 + 1, decode_hash(&hash)?),
            None => (1, GENESIS_HASH),
        };

        let record = EventRecord::seal(seq, timestamp, event.clone(), prev_hash)?;
        let payload = serde_json::to_string(&record.event)?;

        tx.execute(
            "INSERT INTO events (seq, kind, bounty_id, payload, recorded_at, prev_hash, hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.seq as i64,
                record.event.kind(),
                record.event.bounty_id().map(|id| id as i64),
                payload,
                record.timestamp,
                hex::encode(record.prev_hash),
                hex::encode(record.hash),
            ],
        )?;
        tx.commit()?;

        debug!("Journaled #{} {}", record.seq, record.event.kind());
        Ok(record)
    }

    pub fn load_all(&self) -> Result<Vec<EventRecord>> {
        self.query(&format!("{} ORDER BY seq ASC", SELECT_COLUMNS), params![])
    }

    /// Records with `seq > after`, oldest first.
    pub fn events_after(&self, after: u64, limit: usize) -> Result<Vec<EventRecord>> {
        self.query(
            &format!("{} WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2", SELECT_COLUMNS),
            params![after as i64, limit as i64],
        )
    }

    pub fn events_for_bounty(&self, id: BountyId) -> Result<Vec<EventRecord>> {
        self.query(
            &format!("{} WHERE bounty_id = ?1 ORDER BY seq ASC", SELECT_COLUMNS),
            params![id as i64],
        )
    }

    pub fn len(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Check sequence continuity, hash links and every record's own hash.
    pub fn verify_chain(&self) -> Result<()> {
        let mut expected_prev = GENESIS_HASH;
        for (i, record) in self.load_all()?.iter().enumerate() {
            let expected_seq = i as u64 + 1;
            if record.seq != expected_seq {
                return Err(EscrowError::CorruptJournal(format!(
                    "expected seq {}, found {}",
                    expected_seq, record.seq
                )));
            }
            if record.prev_hash != expected_prev {
                return Err(EscrowError::CorruptJournal(format!(
                    "record #{} does not link to its predecessor",
                    record.seq
                )));
            }
            if !record.verify()? {
                return Err(EscrowError::CorruptJournal(format!(
                    "record #{} hash mismatch",
                    record.seq
                )));
            }
            expected_prev = record.hash;
        }
        Ok(())
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<EventRecord>> {
        let rows: Vec<RawRow> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params, |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter().map(decode_row).collect()
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }
}

fn decode_row((seq, timestamp, payload, prev_hash, hash): RawRow) -> Result<EventRecord> {
    Ok(EventRecord {
        seq: seq as u64,
        timestamp,
        event: serde_json::from_str(&payload)?,
        prev_hash: decode_hash(&prev_hash)?,
        hash: decode_hash(&hash)?,
    })
}

fn decode_hash(s: &str) -> Result<Hash> {
    hex::decode(s)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| EscrowError::CorruptJournal(format!("malformed hash {}", s)))
}
