//! Timer set implementation.
//!
//! Each timer is a count-up counter advanced by one second per `tick()` while
//! running. There are no internal threads - the case calls `tick()` once per
//! second and feeds every recorded event to `observe()`.
//!
//! ## Trigger policy
//!
//! ```text
//! shockable rhythm | shock  -> Shock: start or re-arm at 0
//! shockable rhythm          -> ROSC: stop and zero
//! ROSC                      -> Shock, CPR: stop;  ROSC: start or re-arm at 0
//! non-shockable rhythm      -> ROSC: stop and zero (CPR keeps running)
//! CPR started               -> CPR: start or re-arm at 0
//! outcome recorded          -> Case: stop
//! ```

use serde::{Deserialize, Serialize};

use super::TimerKind;
use crate::events::{Event, EventKind, Rhythm};

/// State of a single count-up timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub accumulated_secs: u64,
    pub running: bool,
    /// Cycle boundaries crossed so far. Survives `reset`.
    pub completed_cycles: u32,
}

/// A cycle boundary crossed on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCompleted {
    pub kind: TimerKind,
    pub cycle: u32,
}

/// The four timers of a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSet {
    timers: [TimerState; 4],
    /// Length of one CPR cycle in seconds.
    cpr_cycle_secs: u64,
}

impl Default for TimerSet {
    fn default() -> Self {
        Self::new(120)
    }
}

impl TimerSet {
    /// All timers stopped at zero.
    pub fn new(cpr_cycle_secs: u64) -> Self {
        Self {
            timers: [TimerState::default(); 4],
            cpr_cycle_secs: cpr_cycle_secs.max(1),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self, kind: TimerKind) -> TimerState {
        self.timers[kind.index()]
    }

    pub fn elapsed(&self, kind: TimerKind) -> u64 {
        self.timers[kind.index()].accumulated_secs
    }

    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.timers[kind.index()].running
    }

    pub fn cycle_count(&self, kind: TimerKind) -> u32 {
        self.timers[kind.index()].completed_cycles
    }

    pub fn cpr_cycle_secs(&self) -> u64 {
        self.cpr_cycle_secs
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a stopped timer at 0, or zero a running one without stopping it.
    pub fn start_or_reset(&mut self, kind: TimerKind) {
        let timer = &mut self.timers[kind.index()];
        if timer.running {
            tracing::debug!(timer = kind.label(), from = timer.accumulated_secs, "timer re-armed");
        } else {
            tracing::debug!(timer = kind.label(), "timer started");
        }
        timer.accumulated_secs = 0;
        timer.running = true;
    }

    /// Halt the timer; the accumulator keeps its value. Stopping twice is a no-op.
    pub fn stop(&mut self, kind: TimerKind) {
        let timer = &mut self.timers[kind.index()];
        if timer.running {
            timer.running = false;
            tracing::debug!(timer = kind.label(), at = timer.accumulated_secs, "timer stopped");
        }
    }

    /// Zero the accumulator, leaving the running state as it is.
    pub fn reset(&mut self, kind: TimerKind) {
        self.timers[kind.index()].accumulated_secs = 0;
    }

    pub fn stop_all(&mut self) {
        for kind in TimerKind::ALL {
            self.stop(kind);
        }
    }

    /// Advance every running timer by one second.
    ///
    /// Returns the cycle boundaries crossed on this tick.
    pub fn tick(&mut self) -> Vec<CycleCompleted> {
        let mut crossed = Vec::new();
        for kind in TimerKind::ALL {
            let cycle_secs = self.cycle_secs(kind);
            let timer = &mut self.timers[kind.index()];
            if !timer.running {
                continue;
            }
            timer.accumulated_secs += 1;
            if let Some(len) = cycle_secs {
                if timer.accumulated_secs % len == 0 {
                    timer.completed_cycles += 1;
                    crossed.push(CycleCompleted {
                        kind,
                        cycle: timer.completed_cycles,
                    });
                }
            }
        }
        crossed
    }

    /// Apply the trigger policy for a freshly recorded event.
    pub fn observe(&mut self, event: &Event) {
        match &event.kind {
            EventKind::RhythmCheck { label } => match Rhythm::classify(label) {
                Rhythm::Shockable => {
                    self.start_or_reset(TimerKind::Shock);
                    self.cancel_rosc();
                }
                Rhythm::Rosc => {
                    self.stop(TimerKind::Shock);
                    self.stop(TimerKind::Cpr);
                    self.start_or_reset(TimerKind::Rosc);
                }
                Rhythm::NonShockable => self.cancel_rosc(),
                Rhythm::Unclassified => {}
            },
            EventKind::Shock { .. } => self.start_or_reset(TimerKind::Shock),
            EventKind::CprStarted => self.start_or_reset(TimerKind::Cpr),
            EventKind::Outcome { .. } => self.stop(TimerKind::Case),
            EventKind::Medication { .. }
            | EventKind::CprCycleCompleted { .. }
            | EventKind::CprSegment { .. }
            | EventKind::Generic { .. } => {}
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Back in arrest: stop and zero the ROSC timer.
    fn cancel_rosc(&mut self) {
        self.stop(TimerKind::Rosc);
        self.reset(TimerKind::Rosc);
    }

    fn cycle_secs(&self, kind: TimerKind) -> Option<u64> {
        match kind {
            TimerKind::Cpr => Some(self.cpr_cycle_secs),
            TimerKind::Case | TimerKind::Shock | TimerKind::Rosc => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventId, Waveform};
    use chrono::Utc;

    fn event(kind: EventKind) -> Event {
        Event {
            id: EventId(1),
            kind,
            timestamp: Utc::now(),
            offset_secs: 0,
        }
    }

    fn rhythm(label: &str) -> Event {
        event(EventKind::RhythmCheck {
            label: label.into(),
        })
    }

    fn tick_n(timers: &mut TimerSet, n: u64) {
        for _ in 0..n {
            timers.tick();
        }
    }

    #[test]
    fn stopped_timers_do_not_advance() {
        let mut timers = TimerSet::default();
        tick_n(&mut timers, 10);
        for kind in TimerKind::ALL {
            assert_eq!(timers.elapsed(kind), 0);
        }
    }

    #[test]
    fn start_or_reset_rearms_running_timer() {
        let mut timers = TimerSet::default();
        timers.start_or_reset(TimerKind::Shock);
        tick_n(&mut timers, 45);
        assert_eq!(timers.elapsed(TimerKind::Shock), 45);

        timers.start_or_reset(TimerKind::Shock);
        assert_eq!(timers.elapsed(TimerKind::Shock), 0);
        assert!(timers.is_running(TimerKind::Shock));
    }

    #[test]
    fn stop_twice_is_same_as_once() {
        let mut timers = TimerSet::default();
        timers.start_or_reset(TimerKind::Case);
        tick_n(&mut timers, 7);
        timers.stop(TimerKind::Case);
        let once = timers.state(TimerKind::Case);
        timers.stop(TimerKind::Case);
        assert_eq!(timers.state(TimerKind::Case), once);
        assert_eq!(once.accumulated_secs, 7);
        assert!(!once.running);
    }

    #[test]
    fn reset_keeps_running_state() {
        let mut timers = TimerSet::default();
        timers.start_or_reset(TimerKind::Rosc);
        tick_n(&mut timers, 3);
        timers.reset(TimerKind::Rosc);
        assert_eq!(timers.elapsed(TimerKind::Rosc), 0);
        assert!(timers.is_running(TimerKind::Rosc));

        timers.stop(TimerKind::Rosc);
        timers.reset(TimerKind::Rosc);
        assert!(!timers.is_running(TimerKind::Rosc));
    }

    #[test]
    fn cpr_cycle_count_follows_ticks() {
        let mut timers = TimerSet::default();
        timers.start_or_reset(TimerKind::Cpr);
        tick_n(&mut timers, 119);
        assert_eq!(timers.cycle_count(TimerKind::Cpr), 0);
        tick_n(&mut timers, 120);
        assert_eq!(timers.cycle_count(TimerKind::Cpr), 1);
        let crossed = timers.tick();
        assert_eq!(timers.cycle_count(TimerKind::Cpr), 2);
        assert_eq!(
            crossed,
            vec![CycleCompleted {
                kind: TimerKind::Cpr,
                cycle: 2
            }]
        );
    }

    #[test]
    fn pausing_cpr_does_not_skip_cycles() {
        let mut timers = TimerSet::default();
        timers.start_or_reset(TimerKind::Cpr);
        tick_n(&mut timers, 100);
        timers.stop(TimerKind::Cpr);
        tick_n(&mut timers, 500);
        assert_eq!(timers.cycle_count(TimerKind::Cpr), 0);
        // Resume without re-arming.
        timers.timers[TimerKind::Cpr.index()].running = true;
        tick_n(&mut timers, 20);
        assert_eq!(timers.cycle_count(TimerKind::Cpr), 1);
    }

    #[test]
    fn rosc_stops_shock_and_cpr_and_starts_rosc() {
        let mut timers = TimerSet::default();
        timers.start_or_reset(TimerKind::Cpr);
        timers.observe(&rhythm("VF"));
        tick_n(&mut timers, 65);

        timers.observe(&rhythm("ROSC"));
        tick_n(&mut timers, 10);
        assert_eq!(timers.elapsed(TimerKind::Cpr), 65);
        assert_eq!(timers.elapsed(TimerKind::Shock), 65);
        assert_eq!(timers.elapsed(TimerKind::Rosc), 10);
    }

    #[test]
    fn non_shockable_cancels_rosc_tracking_and_leaves_cpr() {
        let mut timers = TimerSet::default();
        timers.start_or_reset(TimerKind::Cpr);
        timers.observe(&rhythm("ROSC"));
        timers.start_or_reset(TimerKind::Cpr);
        tick_n(&mut timers, 30);

        timers.observe(&rhythm("PEA/AS"));
        tick_n(&mut timers, 5);
        assert_eq!(timers.elapsed(TimerKind::Rosc), 0);
        assert!(!timers.is_running(TimerKind::Rosc));
        assert_eq!(timers.elapsed(TimerKind::Cpr), 35);
    }

    #[test]
    fn shock_rearms_shock_timer() {
        let mut timers = TimerSet::default();
        timers.observe(&rhythm("VT/VF"));
        tick_n(&mut timers, 20);
        timers.observe(&event(EventKind::Shock {
            energy_joules: Some(150),
            waveform: Waveform::Biphasic,
        }));
        assert_eq!(timers.elapsed(TimerKind::Shock), 0);
        assert!(timers.is_running(TimerKind::Shock));
    }

    #[test]
    fn shockable_rearrest_cancels_rosc_tracking() {
        let mut timers = TimerSet::default();
        timers.observe(&rhythm("ROSC"));
        tick_n(&mut timers, 10);

        timers.observe(&rhythm("VT/VF"));
        tick_n(&mut timers, 5);
        assert!(!timers.is_running(TimerKind::Rosc));
        assert_eq!(timers.elapsed(TimerKind::Rosc), 0);
        assert_eq!(timers.elapsed(TimerKind::Shock), 5);
    }
}
