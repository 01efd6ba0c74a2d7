//! After-the-fact review of a recorded case.
//!
//! Marks entries that depart from the protocol so record views can
//! highlight them. Purely advisory; nothing here changes the log.

use serde::{Deserialize, Serialize};

use crate::events::{EventId, EventKind, Rhythm};
use crate::log::EventLog;
use crate::storage::Config;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeviationReason {
    /// Shock not preceded by a shockable rhythm check since the previous shock.
    ShockWithoutShockableRhythm,
    AdrenalineTooSoon { interval_secs: u64 },
    AdrenalineTooLate { interval_secs: u64 },
    /// Antiarrhythmic dose beyond the tolerated count.
    AntiarrhythmicExcess { dose_number: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deviation {
    pub event_id: EventId,
    #[serde(flatten)]
    pub reason: DeviationReason,
}

/// Walk the log once and collect every deviation, oldest first.
pub fn review(log: &EventLog, config: &Config) -> Vec<Deviation> {
    let min_adrenaline = config.guideline.adrenaline_reminder_secs;
    let max_adrenaline = config.attention.adrenaline_stale_secs;
    let max_antiarrhythmic = config.attention.antiarrhythmic_max_doses;

    let mut deviations = Vec::new();
    // Last rhythm check or shock seen so far.
    let mut last_rhythm_or_shock: Option<&EventKind> = None;
    let mut last_adrenaline: Option<u64> = None;
    let mut antiarrhythmic_doses = 0usize;

    for event in log.iter() {
        let kind = &event.kind;
        let mut flag = |reason| {
            deviations.push(Deviation {
                event_id: event.id,
                reason,
            })
        };

        if kind.is_shock() {
            let after_shockable = last_rhythm_or_shock
                .and_then(EventKind::rhythm)
                .is_some_and(|r| r == Rhythm::Shockable);
            if !after_shockable {
                flag(DeviationReason::ShockWithoutShockableRhythm);
            }
            last_rhythm_or_shock = Some(kind);
        } else if kind.rhythm().is_some() {
            last_rhythm_or_shock = Some(kind);
        } else if kind.is_adrenaline() {
            if let Some(prev) = last_adrenaline {
                let interval_secs = event.offset_secs.saturating_sub(prev);
                if interval_secs < min_adrenaline {
                    flag(DeviationReason::AdrenalineTooSoon { interval_secs });
                } else if interval_secs > max_adrenaline {
                    flag(DeviationReason::AdrenalineTooLate { interval_secs });
                }
            }
            last_adrenaline = Some(event.offset_secs);
        } else if kind.is_antiarrhythmic() {
            antiarrhythmic_doses += 1;
            if antiarrhythmic_doses > max_antiarrhythmic {
                flag(DeviationReason::AntiarrhythmicExcess {
                    dose_number: antiarrhythmic_doses,
                });
            }
        }
    }

    deviations
}
