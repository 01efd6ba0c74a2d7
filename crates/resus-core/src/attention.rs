//! Attention flags for the controls that need the clinician's eye.
//!
//! Flags are derived data: the case recomputes them after every append and
//! every tick. Presentation maps a raised flag to a blink or fade cue.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::events::{EventKind, Rhythm};
use crate::log::EventLog;
use crate::storage::AttentionConfig;
use crate::timer::{TimerKind, TimerSet};

/// A control that can be flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    RhythmCheck,
    Adrenaline,
    Antiarrhythmic,
    Energy,
    Shock,
    Cpr,
    Outcome,
}

impl Control {
    pub const ALL: [Control; 7] = [
        Control::RhythmCheck,
        Control::Adrenaline,
        Control::Antiarrhythmic,
        Control::Energy,
        Control::Shock,
        Control::Cpr,
        Control::Outcome,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Control::RhythmCheck => "rhythm_check",
            Control::Adrenaline => "adrenaline",
            Control::Antiarrhythmic => "antiarrhythmic",
            Control::Energy => "energy",
            Control::Shock => "shock",
            Control::Cpr => "cpr",
            Control::Outcome => "outcome",
        }
    }
}

/// "Flag `control` once `threshold_secs` have passed since the last event
/// matching `matcher`." No matching event means not stale.
#[derive(Debug, Clone, Copy)]
pub struct StalenessRule {
    pub control: Control,
    pub threshold_secs: u64,
    pub matcher: fn(&EventKind) -> bool,
}

impl StalenessRule {
    pub fn is_stale(&self, log: &EventLog, now_secs: u64) -> bool {
        since_last(log, self.matcher, now_secs).is_some_and(|secs| secs >= self.threshold_secs)
    }
}

/// Everything the flags are derived from.
#[derive(Debug, Clone, Copy)]
pub struct AttentionInput<'a> {
    pub log: &'a EventLog,
    pub timers: &'a TimerSet,
    /// Current case-clock offset in seconds.
    pub now_secs: u64,
    pub energy_selected: bool,
}

pub type AttentionFlags = BTreeMap<Control, bool>;

#[derive(Debug, Clone)]
pub struct AttentionSignal {
    config: AttentionConfig,
    flags: AttentionFlags,
}

impl Default for AttentionSignal {
    fn default() -> Self {
        Self::new(AttentionConfig::default())
    }
}

impl AttentionSignal {
    pub fn new(config: AttentionConfig) -> Self {
        Self {
            config,
            flags: Control::ALL.iter().map(|c| (*c, false)).collect(),
        }
    }

    /// Current flag of every control.
    pub fn flags(&self) -> &AttentionFlags {
        &self.flags
    }

    pub fn is_flagged(&self, control: Control) -> bool {
        self.flags.get(&control).copied().unwrap_or(false)
    }

    /// Raised controls only, in declaration order.
    pub fn raised(&self) -> Vec<Control> {
        self.flags
            .iter()
            .filter(|(_, on)| **on)
            .map(|(c, _)| *c)
            .collect()
    }

    /// Rule behind the adrenaline flag.
    pub fn adrenaline_rule(&self) -> StalenessRule {
        StalenessRule {
            control: Control::Adrenaline,
            threshold_secs: self.config.adrenaline_stale_secs,
            matcher: EventKind::is_adrenaline,
        }
    }

    /// Recompute every flag. Returns true when any flag changed.
    pub fn recompute(&mut self, input: &AttentionInput<'_>) -> bool {
        let next = self.evaluate(input);
        let changed = next != self.flags;
        if changed {
            let raised: Vec<&str> = next
                .iter()
                .filter(|(_, on)| **on)
                .map(|(c, _)| c.name())
                .collect();
            tracing::debug!(?raised, "attention flags changed");
        }
        self.flags = next;
        changed
    }

    /// Clear all flags (case boundary).
    pub fn clear(&mut self) {
        for on in self.flags.values_mut() {
            *on = false;
        }
    }

    fn evaluate(&self, input: &AttentionInput<'_>) -> AttentionFlags {
        let AttentionInput {
            log,
            timers,
            now_secs,
            energy_selected,
        } = *input;
        let rosc_tracking = timers.is_running(TimerKind::Rosc);

        let mut flags = AttentionFlags::new();
        flags.insert(Control::RhythmCheck, self.rhythm_check_due(input));
        flags.insert(
            Control::Adrenaline,
            !rosc_tracking && self.adrenaline_rule().is_stale(log, now_secs),
        );
        flags.insert(
            Control::Antiarrhythmic,
            log.count_matching(|e| e.kind.is_antiarrhythmic()) > self.config.antiarrhythmic_max_doses,
        );
        flags.insert(Control::Energy, !energy_selected);
        flags.insert(Control::Shock, shock_pending(log));
        flags.insert(
            Control::Cpr,
            !rosc_tracking
                && (cpr_pending(log)
                    || (timers.is_running(TimerKind::Cpr)
                        && timers.elapsed(TimerKind::Cpr) > self.config.rhythm_check_secs)),
        );
        flags.insert(
            Control::Outcome,
            rosc_tracking
                && timers.elapsed(TimerKind::Rosc) >= self.config.outcome_prompt_secs
                && log
                    .last_matching(|e| matches!(e.kind, EventKind::Outcome { .. }))
                    .is_none(),
        );
        flags
    }

    /// No rhythm recorded yet, or the running CPR segment has gone a full
    /// interval without a rhythm check.
    fn rhythm_check_due(&self, input: &AttentionInput<'_>) -> bool {
        let Some(since_rhythm) =
            since_last(input.log, |k| k.rhythm().is_some(), input.now_secs)
        else {
            return true;
        };
        let threshold = self.config.rhythm_check_secs;
        input.timers.is_running(TimerKind::Cpr)
            && input.timers.elapsed(TimerKind::Cpr) >= threshold
            && since_rhythm >= threshold
    }
}

/// Seconds since the last event whose kind matches.
fn since_last(log: &EventLog, matcher: fn(&EventKind) -> bool, now_secs: u64) -> Option<u64> {
    log.last_matching(|e| matcher(&e.kind))
        .map(|e| now_secs.saturating_sub(e.offset_secs))
}

/// Classified rhythms only; unrecognised labels do not change the picture.
fn last_classified_rhythm(log: &EventLog) -> Option<(usize, Rhythm)> {
    log.all()
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, e)| match e.kind.rhythm() {
            Some(Rhythm::Unclassified) | None => None,
            Some(r) => Some((i, r)),
        })
}

/// A shockable rhythm is on record and no shock followed it.
fn shock_pending(log: &EventLog) -> bool {
    match last_classified_rhythm(log) {
        Some((idx, Rhythm::Shockable)) => !log.all()[idx + 1..].iter().any(|e| e.kind.is_shock()),
        _ => false,
    }
}

/// A shock or non-shockable rhythm called for compressions and CPR was not
/// (re)started since.
fn cpr_pending(log: &EventLog) -> bool {
    let trigger = log.all().iter().rposition(|e| {
        e.kind.is_shock() || e.kind.rhythm() == Some(Rhythm::NonShockable)
    });
    match trigger {
        Some(idx) => !log.all()[idx + 1..]
            .iter()
            .any(|e| matches!(e.kind, EventKind::CprStarted)),
        None => false,
    }
}
