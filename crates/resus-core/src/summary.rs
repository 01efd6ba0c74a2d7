//! Record view of a case: what happened, newest first.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{Event, EventKind, PatientOutcome};
use crate::review::Deviation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub event: Event,
    pub description: String,
    pub clock: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSummary {
    pub case_id: Uuid,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_secs: u64,
    /// Newest first.
    pub entries: Vec<SummaryEntry>,
    pub medication_counts: BTreeMap<String, usize>,
    pub shocks: usize,
    pub cpr_cycles: u32,
    pub outcome: Option<PatientOutcome>,
    pub deviations: Vec<Deviation>,
}

impl CaseSummary {
    pub(crate) fn entries_for(events: &[Event]) -> Vec<SummaryEntry> {
        events
            .iter()
            .rev()
            .map(|event| SummaryEntry {
                description: event.kind.describe(),
                clock: format_clock(event.offset_secs),
                event: event.clone(),
            })
            .collect()
    }

    pub(crate) fn outcome_of(events: &[Event]) -> Option<PatientOutcome> {
        events.iter().rev().find_map(|e| match e.kind {
            EventKind::Outcome { outcome } => Some(outcome),
            _ => None,
        })
    }
}

/// `mm'ss"` as shown on the timer displays. Minutes keep counting past 99.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}'{:02}\"", secs / 60, secs % 60)
}
