//! Call record store for the Housecall service.
//!
//! Owns the lifecycle of every outbound call record: creation when the
//! telephony provider accepts a call, status updates from provider
//! callbacks, transcript turns from either the telephony or the
//! speech-conversation bridge, outcome inference, and durable persistence
//! so records survive a process restart.
//!
//! The store is the single source of truth. Both bridge event streams
//! mutate records only through [`CallRecordStore`] operations, which are
//! atomic per record; durable writes happen off the lock on a write-behind
//! worker so a slow disk never stalls event delivery for a live call.
//!
//! # Usage
//!
//! ```rust,ignore
//! use housecall_store::{CallRecordStore, SqliteBackend};
//! use housecall_types::{AppointmentContext, Speaker};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(SqliteBackend::new(pool));
//! let store = CallRecordStore::open(backend)?;
//!
//! store.create_record("CA1", "+15551234567", AppointmentContext::default())?;
//! store.append_transcript_entry("CA1", Speaker::Caller, "I need to reschedule")?;
//! assert_eq!(store.outcome("CA1")?.as_str(), "rescheduled");
//! ```

mod error;
mod outcome;
mod persist;
mod record;
mod store;

pub use error::StoreError;
pub use outcome::{infer_outcome, CANCEL_SIGNALS, CONFIRM_SIGNALS, RESCHEDULE_SIGNALS};
pub use persist::{InMemoryBackend, PersistenceBackend, PersistenceError, SqliteBackend};
pub use record::{CallRecord, TranscriptEntry};
pub use store::CallRecordStore;
