//! Shared types and constants for the Housecall platform.
//!
//! This crate provides the foundational types used across all Housecall
//! crates: the telephony call lifecycle enum, transcript speaker roles,
//! call outcome classification, and the appointment context attached to
//! each outbound call.
//!
//! No crate in the workspace depends on anything *except* `housecall-types`
//! for cross-cutting type definitions. This keeps the dependency graph
//! clean and prevents circular dependencies.

use serde::{Deserialize, Serialize};

/// Telephony call lifecycle states.
///
/// Mirrors the status strings delivered by the telephony provider's
/// lifecycle callbacks. The store never invents a status on its own;
/// every transition originates from a provider callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallStatus {
    /// Call accepted by the provider, not yet ringing.
    #[serde(rename = "queued")]
    Queued,
    /// The destination is ringing.
    #[serde(rename = "ringing")]
    Ringing,
    /// The call was answered and is live.
    #[serde(rename = "in-progress")]
    InProgress,
    /// The call ended normally.
    #[serde(rename = "completed")]
    Completed,
    /// The provider could not complete the call.
    #[serde(rename = "failed")]
    Failed,
    /// The destination never picked up.
    #[serde(rename = "no-answer")]
    NoAnswer,
    /// The destination line was busy.
    #[serde(rename = "busy")]
    Busy,
}

impl CallStatus {
    /// Returns the provider wire label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Ringing => "ringing",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::NoAnswer => "no-answer",
            Self::Busy => "busy",
        }
    }

    /// Returns `true` if no further call activity can follow this status.
    ///
    /// Once a record reaches a terminal status its transcript is frozen
    /// and its outcome is locked in.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::NoAnswer | Self::Busy
        )
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = ParseCallStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "ringing" => Ok(Self::Ringing),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "no-answer" => Ok(Self::NoAnswer),
            "busy" => Ok(Self::Busy),
            _ => Err(ParseCallStatusError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown call status string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown call status: {0}")]
pub struct ParseCallStatusError(pub String);

/// Which side of the conversation produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    /// The AI assistant placing the call.
    #[serde(rename = "assistant")]
    Assistant,
    /// The patient who answered.
    #[serde(rename = "caller")]
    Caller,
}

impl Speaker {
    /// Returns the wire label for this speaker.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::Caller => "caller",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Speaker {
    type Err = ParseSpeakerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assistant" => Ok(Self::Assistant),
            "caller" => Ok(Self::Caller),
            _ => Err(ParseSpeakerError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown speaker string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown speaker: {0}")]
pub struct ParseSpeakerError(pub String);

/// Coarse classification of what the patient decided during the call.
///
/// Inferred from the transcript by keyword matching. Best-effort and
/// known to misclassify; once a non-`Unknown` value fires it is never
/// reset to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallOutcome {
    /// No decision signal detected yet.
    #[serde(rename = "unknown")]
    Unknown,
    /// The patient confirmed the appointment.
    #[serde(rename = "confirmed")]
    Confirmed,
    /// The patient asked for a different time.
    #[serde(rename = "rescheduled")]
    Rescheduled,
    /// The patient cancelled outright.
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl CallOutcome {
    /// Returns the wire label for this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Confirmed => "confirmed",
            Self::Rescheduled => "rescheduled",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallOutcome {
    type Err = ParseCallOutcomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "confirmed" => Ok(Self::Confirmed),
            "rescheduled" => Ok(Self::Rescheduled),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseCallOutcomeError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown outcome string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown call outcome: {0}")]
pub struct ParseCallOutcomeError(pub String);

/// Appointment details attached to a call record at creation.
///
/// Captured once when the call is placed and immutable afterwards; the
/// store treats it as opaque context for the conversation, not as
/// scheduling state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentContext {
    /// Appointment date as displayed to the patient (e.g. "2025-03-05").
    #[serde(default)]
    pub date: String,

    /// Appointment time as displayed to the patient (e.g. "10:30").
    #[serde(default)]
    pub time: String,

    /// Name of the provider the patient is seeing.
    #[serde(default)]
    pub provider: String,

    /// Patient name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,

    /// Free-form notes carried along for the assistant's prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_wire_labels_round_trip() {
        let all = [
            CallStatus::Queued,
            CallStatus::Ringing,
            CallStatus::InProgress,
            CallStatus::Completed,
            CallStatus::Failed,
            CallStatus::NoAnswer,
            CallStatus::Busy,
        ];
        for status in all {
            let parsed = CallStatus::from_str(status.as_str()).expect("label should parse");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(CallStatus::Completed.is_terminal());
        assert!(CallStatus::Failed.is_terminal());
        assert!(CallStatus::NoAnswer.is_terminal());
        assert!(CallStatus::Busy.is_terminal());
        assert!(!CallStatus::Queued.is_terminal());
        assert!(!CallStatus::Ringing.is_terminal());
        assert!(!CallStatus::InProgress.is_terminal());
    }

    #[test]
    fn unknown_status_rejected() {
        assert!(CallStatus::from_str("canceled").is_err());
        assert!(CallStatus::from_str("").is_err());
    }

    #[test]
    fn status_serde_uses_wire_labels() {
        let json = serde_json::to_string(&CallStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let back: CallStatus = serde_json::from_str("\"no-answer\"").unwrap();
        assert_eq!(back, CallStatus::NoAnswer);
    }

    #[test]
    fn speaker_and_outcome_labels() {
        assert_eq!(Speaker::from_str("caller").unwrap(), Speaker::Caller);
        assert_eq!(
            CallOutcome::from_str("rescheduled").unwrap(),
            CallOutcome::Rescheduled
        );
        assert_eq!(CallOutcome::Unknown.as_str(), "unknown");
    }

    #[test]
    fn appointment_context_omits_empty_optionals() {
        let ctx = AppointmentContext {
            date: "2025-03-05".into(),
            time: "10:30".into(),
            provider: "Dr. Smith".into(),
            patient_name: None,
            notes: None,
        };
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(!json.contains("patient_name"));
        assert!(!json.contains("notes"));
    }
}
