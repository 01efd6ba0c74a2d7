mod engine;

use serde::{Deserialize, Serialize};

pub use engine::{CycleCompleted, TimerSet, TimerState};

/// The independently controllable count-up timers of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    /// Overall time since the case started.
    Case,
    /// Time since the last shockable rhythm or shock.
    Shock,
    /// Current CPR segment; drives the 2-minute cycle counter.
    Cpr,
    /// Time since return of spontaneous circulation.
    Rosc,
}

impl TimerKind {
    pub const ALL: [TimerKind; 4] = [
        TimerKind::Case,
        TimerKind::Shock,
        TimerKind::Cpr,
        TimerKind::Rosc,
    ];

    fn index(self) -> usize {
        match self {
            TimerKind::Case => 0,
            TimerKind::Shock => 1,
            TimerKind::Cpr => 2,
            TimerKind::Rosc => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerKind::Case => "case",
            TimerKind::Shock => "shock",
            TimerKind::Cpr => "cpr",
            TimerKind::Rosc => "rosc",
        }
    }
}
