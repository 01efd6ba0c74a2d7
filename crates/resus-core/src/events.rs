use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::summary::format_clock;

/// Identifier of an event, unique within one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// Point in time on the case clock.
///
/// `offset_secs` counts 1 Hz ticks since the case started and is what every
/// staleness rule compares; `at` is the wall-clock instant shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub at: DateTime<Utc>,
    pub offset_secs: u64,
}

impl Stamp {
    pub fn new(at: DateTime<Utc>, offset_secs: u64) -> Self {
        Self { at, offset_secs }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Biphasic,
    Monophasic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientOutcome {
    Alive,
    Death,
}

/// Everything that can be recorded during a case.
///
/// Labels and medication names are free text and stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    RhythmCheck {
        label: String,
    },
    Medication {
        name: String,
        dose: Option<String>,
    },
    Shock {
        energy_joules: Option<u32>,
        waveform: Waveform,
    },
    CprCycleCompleted {
        cycle_number: u32,
    },
    /// Compressions (re)started.
    CprStarted,
    /// CPR time on the clock when a rhythm check interrupted compressions.
    CprSegment {
        duration_secs: u64,
        first: bool,
    },
    Outcome {
        outcome: PatientOutcome,
    },
    Generic {
        label: String,
    },
}

impl EventKind {
    /// Rhythm class of a rhythm check, `None` for every other kind.
    pub fn rhythm(&self) -> Option<Rhythm> {
        match self {
            EventKind::RhythmCheck { label } => Some(Rhythm::classify(label)),
            _ => None,
        }
    }

    pub fn is_medication(&self, needle: &str) -> bool {
        match self {
            EventKind::Medication { name, .. } => name_matches(name, needle),
            _ => false,
        }
    }

    pub fn is_adrenaline(&self) -> bool {
        self.is_medication("adrenaline") || self.is_medication("epinephrine")
    }

    pub fn is_antiarrhythmic(&self) -> bool {
        self.is_medication("amiodarone") || self.is_medication("lidocaine")
    }

    pub fn is_shock(&self) -> bool {
        matches!(self, EventKind::Shock { .. })
    }

    /// Short human-readable description used by record views.
    pub fn describe(&self) -> String {
        match self {
            EventKind::RhythmCheck { label } => format!("ECG: {label}"),
            EventKind::Medication { name, dose: Some(dose) } => format!("Med: {name} {dose}"),
            EventKind::Medication { name, dose: None } => format!("Med: {name}"),
            EventKind::Shock {
                energy_joules: Some(joules),
                waveform,
            } => format!("Defibrillation: {} {joules}J", waveform_label(*waveform)),
            EventKind::Shock {
                energy_joules: None,
                waveform,
            } => format!("Defibrillation: {}", waveform_label(*waveform)),
            EventKind::CprCycleCompleted { cycle_number } => {
                format!("CPR Cycle {cycle_number} completed")
            }
            EventKind::CprStarted => "CPR".to_string(),
            EventKind::CprSegment {
                duration_secs,
                first: true,
            } => format!("CPR 1st (Duration: {})", format_clock(*duration_secs)),
            EventKind::CprSegment { duration_secs, .. } => {
                format!("CPR (Duration: {})", format_clock(*duration_secs))
            }
            EventKind::Outcome { outcome } => match outcome {
                PatientOutcome::Alive => "Outcome: ALIVE".to_string(),
                PatientOutcome::Death => "Outcome: DEATH".to_string(),
            },
            EventKind::Generic { label } => label.clone(),
        }
    }
}

fn waveform_label(waveform: Waveform) -> &'static str {
    match waveform {
        Waveform::Biphasic => "Biphasic",
        Waveform::Monophasic => "Monophasic",
    }
}

/// Case-insensitive containment, so "Adrenaline 1mg" matches "adrenaline".
fn name_matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(needle)
}

/// A single immutable entry of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub offset_secs: u64,
}

/// Guideline classification of a free-text rhythm label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rhythm {
    Shockable,
    NonShockable,
    Rosc,
    Unclassified,
}

impl Rhythm {
    pub fn classify(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "VT/VF" | "PVT/VF" | "VT" | "VF" | "PVT" => Rhythm::Shockable,
            "PEA/AS" | "PEA" | "AS" | "ASYSTOLE" => Rhythm::NonShockable,
            "ROSC" => Rhythm::Rosc,
            _ => Rhythm::Unclassified,
        }
    }
}

/// Standard dose label for the drugs the protocol doses by count.
///
/// `prior_doses` is how many doses of the same drug were already given.
pub fn standard_dose(name: &str, prior_doses: usize) -> Option<String> {
    if name_matches(name, "adrenaline") || name_matches(name, "epinephrine") {
        Some("1mg".to_string())
    } else if name_matches(name, "amiodarone") {
        Some(if prior_doses == 0 { "300mg" } else { "150mg" }.to_string())
    } else {
        None
    }
}
