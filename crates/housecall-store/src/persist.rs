//! Swappable persistence backends for call records.
//!
//! The store talks to durable storage through [`PersistenceBackend`], a
//! two-method save/load interface, so the record model is not coupled to
//! a storage format. The production backend is SQLite; an in-memory
//! backend exists for tests and ephemeral deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use housecall_db::DbPool;
use housecall_types::{AppointmentContext, CallOutcome, CallStatus, Speaker};
use rusqlite::params;

use crate::record::{CallRecord, TranscriptEntry};

/// Errors from a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// A database operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection pool could not hand out a connection.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored enum label did not parse back.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Durable storage for call records.
///
/// `save` must be atomic per record: a crash mid-save may lose that one
/// update but must never corrupt other records. `load_all` rebuilds every
/// record with transcript entries in sequence order.
pub trait PersistenceBackend: Send + Sync {
    /// Writes one record (and its transcript) durably.
    fn save(&self, record: &CallRecord) -> Result<(), PersistenceError>;

    /// Loads every persisted record.
    fn load_all(&self) -> Result<Vec<CallRecord>, PersistenceError>;
}

/// SQLite-backed persistence using the shared connection pool.
pub struct SqliteBackend {
    pool: DbPool,
}

impl SqliteBackend {
    /// Wraps an initialized pool. Migrations must already have run.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PersistenceBackend for SqliteBackend {
    fn save(&self, record: &CallRecord) -> Result<(), PersistenceError> {
        let conn = self.pool.get()?;
        let appointment_json = serde_json::to_string(&record.appointment)?;

        // One transaction per logical update: the record row and its new
        // transcript rows land together or not at all.
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO call_records (id, destination, status, appointment_json, outcome, frozen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                outcome = excluded.outcome,
                frozen = excluded.frozen,
                updated_at = datetime('now')",
            params![
                record.id,
                record.destination,
                record.status.as_str(),
                appointment_json,
                record.outcome.as_str(),
                record.frozen as i64,
            ],
        )?;

        // Entries are append-only and keyed by (call_id, seq), so replayed
        // saves are harmless.
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO transcript_entries (call_id, seq, speaker, text)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in &record.transcript {
                stmt.execute(params![
                    record.id,
                    entry.sequence as i64,
                    entry.speaker.as_str(),
                    entry.text,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<CallRecord>, PersistenceError> {
        let conn = self.pool.get()?;

        let mut entries_by_call: HashMap<String, Vec<TranscriptEntry>> = HashMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT call_id, seq, speaker, text
                 FROM transcript_entries
                 ORDER BY call_id, seq ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;
            for row in rows {
                let (call_id, seq, speaker, text) = row?;
                let speaker: Speaker = speaker
                    .parse()
                    .map_err(|_| PersistenceError::Corrupt(format!("speaker '{speaker}'")))?;
                entries_by_call.entry(call_id).or_default().push(TranscriptEntry {
                    sequence: seq as u64,
                    speaker,
                    text,
                });
            }
        }

        let mut stmt = conn.prepare(
            "SELECT id, destination, status, appointment_json, outcome, frozen
             FROM call_records",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, destination, status, appointment_json, outcome, frozen) = row?;
            let status: CallStatus = status
                .parse()
                .map_err(|_| PersistenceError::Corrupt(format!("status '{status}'")))?;
            let outcome: CallOutcome = outcome
                .parse()
                .map_err(|_| PersistenceError::Corrupt(format!("outcome '{outcome}'")))?;
            let appointment: AppointmentContext = serde_json::from_str(&appointment_json)?;
            let transcript = entries_by_call.remove(&id).unwrap_or_default();
            records.push(CallRecord {
                id,
                destination,
                status,
                appointment,
                transcript,
                outcome,
                frozen: frozen != 0,
            });
        }

        Ok(records)
    }
}

/// Volatile backend for tests and ephemeral runs.
///
/// Keeps "persisted" records in a mutex-guarded map so restart behavior
/// can be simulated by handing the same backend to a fresh store.
#[derive(Default)]
pub struct InMemoryBackend {
    records: Mutex<HashMap<String, CallRecord>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently "persisted".
    pub fn len(&self) -> usize {
        self.records.lock().expect("backend mutex poisoned").len()
    }

    /// Returns `true` if nothing has been saved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistenceBackend for InMemoryBackend {
    fn save(&self, record: &CallRecord) -> Result<(), PersistenceError> {
        self.records
            .lock()
            .expect("backend mutex poisoned")
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<CallRecord>, PersistenceError> {
        Ok(self
            .records
            .lock()
            .expect("backend mutex poisoned")
            .values()
            .cloned()
            .collect())
    }
}
