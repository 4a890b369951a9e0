//! The synchronized call record store.
//!
//! One `RwLock`-guarded map holds all records; every operation takes the
//! lock only for the in-memory mutation, then hands a snapshot of the
//! changed record to a write-behind worker thread. Persistence never runs
//! inside the critical section, so a slow disk cannot stall either bridge
//! event stream.
//!
//! Save failures are degraded mode, not errors: the in-memory update
//! stands, the failure is logged, and the record id is flagged so
//! [`CallRecordStore::reconcile`] can retry the write later.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, Sender, SyncSender};
use std::sync::{mpsc, Arc, Mutex, RwLock};

use housecall_types::{AppointmentContext, CallOutcome, CallStatus, Speaker};

use crate::error::StoreError;
use crate::outcome::infer_outcome;
use crate::persist::PersistenceBackend;
use crate::record::{CallRecord, TranscriptEntry};

/// Work items for the write-behind worker.
enum PersistJob {
    /// Save this record snapshot durably.
    Save(CallRecord),
    /// Acknowledge once every job queued before this one has finished.
    Flush(SyncSender<()>),
}

/// How many times the worker attempts a save before flagging the record
/// for reconciliation.
const SAVE_ATTEMPTS: u32 = 3;

/// Single source of truth for all call records.
///
/// Thread-safe under concurrent access from the telephony-status stream
/// and the speech/text stream, across many simultaneous calls. Operations
/// on the same record are serialized by the map lock; strict ordering
/// across different records is not provided and not needed.
pub struct CallRecordStore {
    records: RwLock<HashMap<String, CallRecord>>,
    backend: Arc<dyn PersistenceBackend>,
    // std mpsc Sender is not Sync; the mutex makes enqueueing shareable
    // across handler tasks.
    jobs: Mutex<Sender<PersistJob>>,
    /// Record ids whose last durable save failed.
    unsaved: Arc<Mutex<HashSet<String>>>,
    /// Appends that arrived after finalization and were dropped.
    dropped_appends: AtomicU64,
}

impl CallRecordStore {
    /// Opens the store, loading all persisted records before any
    /// operation is accepted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Persistence` if the backend cannot load.
    pub fn open(backend: Arc<dyn PersistenceBackend>) -> Result<Self, StoreError> {
        let mut records = HashMap::new();
        for record in backend.load_all()? {
            records.insert(record.id.clone(), record);
        }
        tracing::info!(count = records.len(), "loaded call records from storage");

        let unsaved = Arc::new(Mutex::new(HashSet::new()));
        let (tx, rx) = mpsc::channel();
        spawn_save_worker(rx, Arc::clone(&backend), Arc::clone(&unsaved));

        Ok(Self {
            records: RwLock::new(records),
            backend,
            jobs: Mutex::new(tx),
            unsaved,
            dropped_appends: AtomicU64::new(0),
        })
    }

    /// Inserts a new record for a just-placed call.
    ///
    /// The id is the provider-assigned call SID. The record starts queued,
    /// with an empty transcript and an unknown outcome.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateId` if the id is already present.
    pub fn create_record(
        &self,
        id: &str,
        destination: &str,
        appointment: AppointmentContext,
    ) -> Result<CallRecord, StoreError> {
        let snapshot = {
            let mut records = self.write_lock();
            if records.contains_key(id) {
                return Err(StoreError::DuplicateId(id.to_string()));
            }
            let record = CallRecord::new(id, destination, appointment);
            records.insert(id.to_string(), record.clone());
            record
        };

        tracing::info!(call_id = id, destination, "created call record");
        self.queue_save(snapshot.clone());
        Ok(snapshot)
    }

    /// Applies a provider lifecycle callback.
    ///
    /// A terminal status freezes the transcript: later appends become
    /// counted no-ops rather than errors, to tolerate late-arriving
    /// bridge events.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the id is unknown.
    pub fn update_status(&self, id: &str, status: CallStatus) -> Result<(), StoreError> {
        let snapshot = {
            let mut records = self.write_lock();
            let record = records
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            record.status = status;
            if status.is_terminal() {
                record.frozen = true;
            }
            record.clone()
        };

        tracing::info!(call_id = id, status = %status, "call status updated");
        self.queue_save(snapshot);
        Ok(())
    }

    /// Appends one conversation turn and re-runs outcome inference.
    ///
    /// Returns the assigned sequence number, or `None` when the record is
    /// already finalized (the entry is dropped silently and counted).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the id is unknown.
    pub fn append_transcript_entry(
        &self,
        id: &str,
        speaker: Speaker,
        text: &str,
    ) -> Result<Option<u64>, StoreError> {
        let (snapshot, sequence) = {
            let mut records = self.write_lock();
            let record = records
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            if record.frozen {
                drop(records);
                self.dropped_appends.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(call_id = id, speaker = %speaker, "dropping append to finalized record");
                return Ok(None);
            }

            let sequence = record.next_sequence();
            record.transcript.push(TranscriptEntry {
                sequence,
                speaker,
                text: text.to_string(),
            });
            // Full re-scan keeps fired signals matching forever, so the
            // outcome never falls back to Unknown.
            record.outcome = infer_outcome(&record.transcript);
            (record.clone(), sequence)
        };

        tracing::debug!(
            call_id = id,
            sequence,
            speaker = %speaker,
            outcome = %snapshot.outcome,
            "transcript entry appended"
        );
        self.queue_save(snapshot);
        Ok(Some(sequence))
    }

    /// Returns the transcript in sequence order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the id is unknown.
    pub fn transcript(&self, id: &str) -> Result<Vec<TranscriptEntry>, StoreError> {
        let records = self.read_lock();
        let record = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(record.transcript.clone())
    }

    /// Returns the inferred outcome.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the id is unknown.
    pub fn outcome(&self, id: &str) -> Result<CallOutcome, StoreError> {
        let records = self.read_lock();
        records
            .get(id)
            .map(|record| record.outcome)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Returns the current telephony status.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the id is unknown.
    pub fn status(&self, id: &str) -> Result<CallStatus, StoreError> {
        let records = self.read_lock();
        records
            .get(id)
            .map(|record| record.status)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Returns a full snapshot of one record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the id is unknown.
    pub fn record(&self, id: &str) -> Result<CallRecord, StoreError> {
        let records = self.read_lock();
        records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Number of transcript appends dropped because the record was
    /// already finalized.
    pub fn dropped_appends(&self) -> u64 {
        self.dropped_appends.load(Ordering::Relaxed)
    }

    /// Retries the durable save for every record flagged by a failed
    /// write. Returns how many records were successfully reconciled.
    ///
    /// Called periodically by the server's background task; safe to call
    /// from anywhere since it snapshots records off the lock first.
    pub fn reconcile(&self) -> usize {
        let flagged: Vec<String> = {
            let mut unsaved = self.unsaved.lock().expect("unsaved set poisoned");
            unsaved.drain().collect()
        };
        if flagged.is_empty() {
            return 0;
        }

        let snapshots: Vec<CallRecord> = {
            let records = self.read_lock();
            flagged
                .iter()
                .filter_map(|id| records.get(id).cloned())
                .collect()
        };

        let mut saved = 0;
        for record in snapshots {
            match self.backend.save(&record) {
                Ok(()) => saved += 1,
                Err(e) => {
                    tracing::warn!(call_id = %record.id, "reconcile save failed: {}", e);
                    self.unsaved
                        .lock()
                        .expect("unsaved set poisoned")
                        .insert(record.id);
                }
            }
        }
        if saved > 0 {
            tracing::info!(count = saved, "reconciled unsaved call records");
        }
        saved
    }

    /// Number of records currently awaiting reconciliation.
    pub fn unsaved_count(&self) -> usize {
        self.unsaved.lock().expect("unsaved set poisoned").len()
    }

    /// Blocks until every queued save has been attempted.
    ///
    /// Used by tests and shutdown; not needed on the request path.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = sync_channel(0);
        let sent = {
            let jobs = self.jobs.lock().expect("job sender poisoned");
            jobs.send(PersistJob::Flush(ack_tx)).is_ok()
        };
        if sent {
            let _ = ack_rx.recv();
        }
    }

    fn queue_save(&self, snapshot: CallRecord) {
        let jobs = self.jobs.lock().expect("job sender poisoned");
        if jobs.send(PersistJob::Save(snapshot)).is_err() {
            tracing::error!("persistence worker is gone; call records are in-memory only");
        }
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CallRecord>> {
        self.records.read().expect("record map poisoned")
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, CallRecord>> {
        self.records.write().expect("record map poisoned")
    }
}

/// Runs the write-behind worker on a dedicated thread.
///
/// The worker exits when the store (and with it the job sender) is
/// dropped. Each save gets a few attempts with a short backoff; after
/// that the record id is flagged for reconciliation.
fn spawn_save_worker(
    rx: Receiver<PersistJob>,
    backend: Arc<dyn PersistenceBackend>,
    unsaved: Arc<Mutex<HashSet<String>>>,
) {
    std::thread::Builder::new()
        .name("housecall-persist".to_string())
        .spawn(move || {
            while let Ok(job) = rx.recv() {
                match job {
                    PersistJob::Save(record) => {
                        let mut attempt = 0;
                        loop {
                            attempt += 1;
                            match backend.save(&record) {
                                Ok(()) => {
                                    // A successful save supersedes any
                                    // earlier failure for this record.
                                    unsaved
                                        .lock()
                                        .expect("unsaved set poisoned")
                                        .remove(&record.id);
                                    break;
                                }
                                Err(e) if attempt < SAVE_ATTEMPTS => {
                                    tracing::warn!(
                                        call_id = %record.id,
                                        attempt,
                                        "durable save failed, retrying: {}",
                                        e
                                    );
                                    std::thread::sleep(std::time::Duration::from_millis(
                                        50 * u64::from(attempt),
                                    ));
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        call_id = %record.id,
                                        "durable save failed, flagging for reconciliation: {}",
                                        e
                                    );
                                    unsaved
                                        .lock()
                                        .expect("unsaved set poisoned")
                                        .insert(record.id.clone());
                                    break;
                                }
                            }
                        }
                    }
                    PersistJob::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        })
        .expect("failed to spawn persistence worker thread");
}
