//! Keyword-based outcome inference.
//!
//! A pure function from transcript to outcome, kept separate from the
//! store so it can be unit-tested without any I/O or call simulation.
//! Deliberately simple: case-insensitive substring matching over the
//! concatenated transcript of both speakers, with a fixed precedence.
//! Best-effort — it is not a natural-language classifier and is known
//! to misclassify.

use crate::record::TranscriptEntry;
use housecall_types::CallOutcome;

/// Phrases that signal the patient is cancelling outright.
pub const CANCEL_SIGNALS: &[&str] = &[
    "cancel my appointment",
    "cancel the appointment",
    "cancel it",
    "call off",
];

/// Phrases that signal the patient wants a different time.
pub const RESCHEDULE_SIGNALS: &[&str] = &[
    "reschedule",
    "different time",
    "another day",
    "change the appointment",
    "move my appointment",
];

/// Phrases that signal the patient is keeping the appointment.
pub const CONFIRM_SIGNALS: &[&str] = &[
    "confirm",
    "that works",
    "i'll be there",
    "yes that's fine",
    "sounds good",
];

/// Infers a call outcome from the full transcript.
///
/// The entire transcript is re-scanned on every call, so a signal that
/// fired once keeps matching forever — the outcome can never fall back
/// to [`CallOutcome::Unknown`] once set.
///
/// Precedence is fixed: cancel beats reschedule beats confirm, regardless
/// of the order phrases appear in. A patient who confirms and then asks
/// to reschedule ends up `Rescheduled`; a later confirmation never
/// downgrades an earlier reschedule request.
pub fn infer_outcome(transcript: &[TranscriptEntry]) -> CallOutcome {
    let text = transcript
        .iter()
        .map(|entry| entry.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if CANCEL_SIGNALS.iter().any(|phrase| text.contains(phrase)) {
        CallOutcome::Cancelled
    } else if RESCHEDULE_SIGNALS.iter().any(|phrase| text.contains(phrase)) {
        CallOutcome::Rescheduled
    } else if CONFIRM_SIGNALS.iter().any(|phrase| text.contains(phrase)) {
        CallOutcome::Confirmed
    } else {
        CallOutcome::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use housecall_types::Speaker;

    fn entries(texts: &[(&str, Speaker)]) -> Vec<TranscriptEntry> {
        texts
            .iter()
            .enumerate()
            .map(|(i, (text, speaker))| TranscriptEntry {
                sequence: (i + 1) as u64,
                speaker: *speaker,
                text: (*text).to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_transcript_is_unknown() {
        assert_eq!(infer_outcome(&[]), CallOutcome::Unknown);
    }

    #[test]
    fn no_signal_is_unknown() {
        let t = entries(&[
            ("Hello, this is the clinic.", Speaker::Assistant),
            ("Who is this?", Speaker::Caller),
        ]);
        assert_eq!(infer_outcome(&t), CallOutcome::Unknown);
    }

    #[test]
    fn confirm_phrase_confirms() {
        let t = entries(&[("Sounds good, see you then.", Speaker::Caller)]);
        assert_eq!(infer_outcome(&t), CallOutcome::Confirmed);
    }

    #[test]
    fn reschedule_phrase_reschedules() {
        let t = entries(&[("I need a different time.", Speaker::Caller)]);
        assert_eq!(infer_outcome(&t), CallOutcome::Rescheduled);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let t = entries(&[("RESCHEDULE ME PLEASE", Speaker::Caller)]);
        assert_eq!(infer_outcome(&t), CallOutcome::Rescheduled);
    }

    #[test]
    fn reschedule_beats_confirm_confirm_first() {
        let t = entries(&[
            ("Yes that's fine.", Speaker::Caller),
            ("Actually, can we reschedule?", Speaker::Caller),
        ]);
        assert_eq!(infer_outcome(&t), CallOutcome::Rescheduled);
    }

    #[test]
    fn reschedule_beats_confirm_reschedule_first() {
        let t = entries(&[
            ("I'd like to reschedule.", Speaker::Caller),
            ("Sure, that works for me.", Speaker::Caller),
        ]);
        assert_eq!(infer_outcome(&t), CallOutcome::Rescheduled);
    }

    #[test]
    fn cancel_beats_everything() {
        let t = entries(&[
            ("That works!", Speaker::Caller),
            ("No wait, cancel my appointment.", Speaker::Caller),
        ]);
        assert_eq!(infer_outcome(&t), CallOutcome::Cancelled);
    }

    #[test]
    fn assistant_turns_count_too() {
        // The assistant summarising "your appointment is confirmed" fires
        // the confirm signal; both speakers' text is scanned.
        let t = entries(&[(
            "Great, your appointment is confirmed for March 5th.",
            Speaker::Assistant,
        )]);
        assert_eq!(infer_outcome(&t), CallOutcome::Confirmed);
    }

    #[test]
    fn empty_turns_are_ignored_gaps() {
        let t = entries(&[
            ("", Speaker::Caller),
            ("move my appointment please", Speaker::Caller),
            ("", Speaker::Caller),
        ]);
        assert_eq!(infer_outcome(&t), CallOutcome::Rescheduled);
    }
}
