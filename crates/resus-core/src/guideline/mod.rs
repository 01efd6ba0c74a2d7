//! Guideline reminders.
//!
//! The scheduler turns elapsed time and recorded events into short-lived
//! advisories. Presentation shows [`GuidelineScheduler::current_advisory`] and
//! plays its cue for every advisory returned by `tick`/`observe`.

mod scheduler;

use serde::{Deserialize, Serialize};

pub use scheduler::{GuidelineScheduler, SchedulerState};

/// What an advisory is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    StartCpr,
    CheckRhythm,
    ConsiderAdrenaline,
    ShockAdvised,
    ContinueCpr,
    GiveAdrenaline,
    ShockDelivered,
    AdrenalineGiven,
    RoscAchieved,
}

impl AdvisoryKind {
    pub fn message(self) -> &'static str {
        match self {
            AdvisoryKind::StartCpr => {
                "Start CPR\n• Give oxygen\n• Attach monitor/defibrillator"
            }
            AdvisoryKind::CheckRhythm => "Check rhythm\nIs rhythm shockable?",
            AdvisoryKind::ConsiderAdrenaline => "Consider administering Adrenaline 1mg",
            AdvisoryKind::ShockAdvised => "Shock advised",
            AdvisoryKind::ContinueCpr => "Continue CPR for 2 minutes",
            AdvisoryKind::GiveAdrenaline => "Give Adrenaline 1mg",
            AdvisoryKind::ShockDelivered => {
                "Shock delivered. Resume CPR immediately for 2 minutes"
            }
            AdvisoryKind::AdrenalineGiven => "Adrenaline administered. Continue CPR",
            AdvisoryKind::RoscAchieved => "ROSC achieved. Proceed to post-cardiac arrest care.",
        }
    }
}

/// A time-boxed reminder. Times are seconds on the scheduler clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
    pub issued_at: u64,
    pub expires_at: u64,
}
