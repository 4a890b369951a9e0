//! Call record and transcript entry types.

use housecall_types::{AppointmentContext, CallOutcome, CallStatus, Speaker};
use serde::{Deserialize, Serialize};

/// A single conversation turn within a call transcript.
///
/// Turns arrive from two independent event streams (assistant text is
/// synchronous, caller speech-to-text is delayed or may never arrive),
/// so wall-clock arrival order is meaningless. The store-assigned
/// `sequence` is the only ordering that matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Strictly increasing position within the record.
    pub sequence: u64,

    /// Which side of the conversation spoke.
    pub speaker: Speaker,

    /// The transcribed text. May be empty when the upstream bridge could
    /// not transcribe the turn; that is a known gap, not an error.
    pub text: String,
}

/// The durable representation of one outbound call attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Provider-assigned call SID. Never changes.
    pub id: String,

    /// The dialed phone number. Not validated beyond presence.
    pub destination: String,

    /// Current telephony lifecycle state, updated only by provider
    /// callbacks.
    pub status: CallStatus,

    /// Appointment details captured at creation. Immutable afterwards.
    pub appointment: AppointmentContext,

    /// Conversation turns ordered by `sequence`. Append-only; frozen once
    /// the call reaches a terminal status.
    pub transcript: Vec<TranscriptEntry>,

    /// Inferred conversation outcome. Recomputed on every append; never
    /// reverts to `Unknown` once a signal has fired.
    pub outcome: CallOutcome,

    /// Set when the record is finalized. Later appends become no-ops.
    pub frozen: bool,
}

impl CallRecord {
    /// Creates a fresh record for a just-placed call.
    pub fn new(id: impl Into<String>, destination: impl Into<String>, appointment: AppointmentContext) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            status: CallStatus::Queued,
            appointment,
            transcript: Vec::new(),
            outcome: CallOutcome::Unknown,
            frozen: false,
        }
    }

    /// Returns the sequence number the next transcript entry will receive.
    pub fn next_sequence(&self) -> u64 {
        self.transcript.last().map(|e| e.sequence + 1).unwrap_or(1)
    }
}
