//! Guideline scheduler state machine.
//!
//! ```text
//! Idle -> Running -> Stopped
//!            ^          |
//!            +- start --+
//! ```
//!
//! Driven by one `tick()` per second. Delayed follow-ups are entries keyed
//! to the scheduler clock, so `stop()` cancels them by dropping the entries.

use serde::{Deserialize, Serialize};

use super::{Advisory, AdvisoryKind};
use crate::events::{Event, EventKind, Rhythm};
use crate::storage::GuidelineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// One-shot advisory waiting for its due time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct DeferredAdvisory {
    due_at: u64,
    kind: AdvisoryKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidelineScheduler {
    config: GuidelineConfig,
    state: SchedulerState,
    /// Seconds since construction. Keeps running after `stop()` so the last
    /// advisory still expires; nothing fires off it while not running.
    clock_secs: u64,
    /// Seconds since the last `start()`.
    elapsed_secs: u64,
    /// Rhythm checks prompted since the last `start()`.
    step: u32,
    last_adrenaline_secs: Option<u64>,
    current: Option<Advisory>,
    deferred: Vec<DeferredAdvisory>,
}

impl Default for GuidelineScheduler {
    fn default() -> Self {
        Self::new(GuidelineConfig::default())
    }
}

impl GuidelineScheduler {
    pub fn new(config: GuidelineConfig) -> Self {
        Self {
            config,
            state: SchedulerState::Idle,
            clock_secs: 0,
            elapsed_secs: 0,
            step: 0,
            last_adrenaline_secs: None,
            current: None,
            deferred: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// The advisory currently on screen, if any.
    pub fn current_advisory(&self) -> Option<&Advisory> {
        self.current.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        !self.deferred.is_empty()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Enter `Running` from `Idle` or `Stopped`, returning the opening advisory.
    pub fn start(&mut self) -> Option<Advisory> {
        if self.state == SchedulerState::Running {
            return None;
        }
        self.state = SchedulerState::Running;
        self.elapsed_secs = 0;
        self.step = 0;
        self.last_adrenaline_secs = None;
        self.deferred.clear();
        tracing::info!("guideline scheduler started");
        Some(self.fire(AdvisoryKind::StartCpr))
    }

    /// Cancel the tick loop, pending follow-ups and the visible advisory.
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Running {
            self.state = SchedulerState::Stopped;
            tracing::info!(elapsed = self.elapsed_secs, "guideline scheduler stopped");
        }
        self.deferred.clear();
        self.current = None;
    }

    /// Hide the visible advisory. Timers and pending follow-ups are untouched.
    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// One-second tick. Returns the advisories fired on this tick.
    pub fn tick(&mut self) -> Vec<Advisory> {
        self.clock_secs += 1;
        if self
            .current
            .as_ref()
            .is_some_and(|a| a.expires_at <= self.clock_secs)
        {
            self.current = None;
        }
        if self.state != SchedulerState::Running {
            return Vec::new();
        }

        self.elapsed_secs += 1;
        let mut fired = Vec::new();

        let now = self.clock_secs;
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.deferred.drain(..).partition(|d| d.due_at <= now);
        self.deferred = waiting;
        for entry in due {
            fired.push(self.fire(entry.kind));
        }

        // Reminder first so a rhythm prompt on the same second stays visible.
        if let Some(last) = self.last_adrenaline_secs {
            let reminder = self.config.adrenaline_reminder_secs.max(1);
            let since = self.elapsed_secs - last;
            if since >= reminder && since % reminder == 0 {
                fired.push(self.fire(AdvisoryKind::ConsiderAdrenaline));
            }
        }

        let interval = self.config.rhythm_check_interval_secs.max(1);
        if self.elapsed_secs % interval == 0 {
            self.step += 1;
            fired.push(self.fire(AdvisoryKind::CheckRhythm));
        }

        fired
    }

    /// React to a freshly recorded event. Returns the advisories fired.
    pub fn observe(&mut self, event: &Event) -> Vec<Advisory> {
        if self.state != SchedulerState::Running {
            return Vec::new();
        }
        match &event.kind {
            EventKind::RhythmCheck { label } => match Rhythm::classify(label) {
                Rhythm::Rosc => {
                    let terminal = self.fire(AdvisoryKind::RoscAchieved);
                    self.halt();
                    vec![terminal]
                }
                Rhythm::Shockable => vec![self.fire(AdvisoryKind::ShockAdvised)],
                Rhythm::NonShockable => {
                    let fired = self.fire(AdvisoryKind::ContinueCpr);
                    self.defer(AdvisoryKind::GiveAdrenaline);
                    vec![fired]
                }
                Rhythm::Unclassified => Vec::new(),
            },
            EventKind::Shock { .. } => {
                let fired = self.fire(AdvisoryKind::ShockDelivered);
                self.defer(AdvisoryKind::GiveAdrenaline);
                vec![fired]
            }
            kind if kind.is_adrenaline() => {
                self.last_adrenaline_secs = Some(self.elapsed_secs);
                self.deferred
                    .retain(|d| d.kind != AdvisoryKind::GiveAdrenaline);
                vec![self.fire(AdvisoryKind::AdrenalineGiven)]
            }
            EventKind::Medication { .. }
            | EventKind::CprCycleCompleted { .. }
            | EventKind::CprStarted
            | EventKind::CprSegment { .. }
            | EventKind::Outcome { .. }
            | EventKind::Generic { .. } => Vec::new(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Show `kind` now, replacing whatever is visible.
    fn fire(&mut self, kind: AdvisoryKind) -> Advisory {
        let advisory = Advisory {
            kind,
            message: kind.message().to_string(),
            issued_at: self.clock_secs,
            expires_at: self.clock_secs + self.config.advisory_display_secs,
        };
        tracing::info!(kind = ?kind, at = self.elapsed_secs, "advisory fired");
        self.current = Some(advisory.clone());
        advisory
    }

    /// Schedule a one-shot follow-up, replacing a pending one of the same kind.
    fn defer(&mut self, kind: AdvisoryKind) {
        self.deferred.retain(|d| d.kind != kind);
        self.deferred.push(DeferredAdvisory {
            due_at: self.clock_secs + self.config.follow_up_delay_secs,
            kind,
        });
    }

    /// Stop after ROSC, leaving the terminal advisory visible.
    fn halt(&mut self) {
        self.state = SchedulerState::Stopped;
        self.deferred.clear();
        tracing::info!(elapsed = self.elapsed_secs, "guideline finished after ROSC");
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

    fn shock() -> Event {
        event(EventKind::Shock {
            energy_joules: Some(200),
            waveform: Waveform::Biphasic,
        })
    }

    fn adrenaline() -> Event {
        event(EventKind::Medication {
            name: "Adrenaline".into(),
            dose: Some("1mg".into()),
        })
    }

    fn running() -> GuidelineScheduler {
        let mut scheduler = GuidelineScheduler::default();
        scheduler.start();
        scheduler
    }

    fn current_kind(scheduler: &GuidelineScheduler) -> Option<AdvisoryKind> {
        scheduler.current_advisory().map(|a| a.kind)
    }

    #[test]
    fn start_fires_opening_advisory() {
        let scheduler = running();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert_eq!(current_kind(&scheduler), Some(AdvisoryKind::StartCpr));
    }

    #[test]
    fn advisory_hides_after_display_time() {
        let mut scheduler = running();
        for _ in 0..4 {
            scheduler.tick();
        }
        assert!(scheduler.current_advisory().is_some());
        scheduler.tick();
        assert!(scheduler.current_advisory().is_none());
    }

    #[test]
    fn newer_advisory_replaces_visible_one() {
        let mut scheduler = running();
        scheduler.observe(&rhythm("VF"));
        assert_eq!(current_kind(&scheduler), Some(AdvisoryKind::ShockAdvised));
        assert_eq!(
            scheduler.current_advisory().unwrap().message,
            "Shock advised"
        );
    }

    #[test]
    fn rhythm_check_every_two_minutes() {
        let mut scheduler = running();
        let mut prompts = 0;
        for _ in 0..240 {
            prompts += scheduler
                .tick()
                .iter()
                .filter(|a| a.kind == AdvisoryKind::CheckRhythm)
                .count();
        }
        assert_eq!(prompts, 2);
        assert_eq!(scheduler.step(), 2);
    }

    #[test]
    fn non_shockable_schedules_adrenaline_follow_up() {
        let mut scheduler = running();
        let fired = scheduler.observe(&rhythm("PEA/AS"));
        assert_eq!(fired[0].kind, AdvisoryKind::ContinueCpr);
        for _ in 0..4 {
            assert!(scheduler.tick().is_empty());
        }
        let fired = scheduler.tick();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, AdvisoryKind::GiveAdrenaline);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn adrenaline_cancels_pending_follow_up() {
        let mut scheduler = running();
        scheduler.observe(&shock());
        scheduler.observe(&adrenaline());
        assert!(!scheduler.has_pending());
        assert_eq!(
            current_kind(&scheduler),
            Some(AdvisoryKind::AdrenalineGiven)
        );
    }

    #[test]
    fn adrenaline_reminder_after_three_minutes() {
        let mut scheduler = running();
        scheduler.observe(&adrenaline());
        for _ in 0..179 {
            let fired = scheduler.tick();
            assert!(fired.iter().all(|a| a.kind != AdvisoryKind::ConsiderAdrenaline));
        }
        let fired = scheduler.tick();
        assert_eq!(
            fired.last().map(|a| a.kind),
            Some(AdvisoryKind::ConsiderAdrenaline)
        );
    }

    #[test]
    fn adrenaline_reminder_repeats_once_per_interval() {
        let mut scheduler = running();
        scheduler.observe(&adrenaline());
        let mut reminders = Vec::new();
        for _ in 0..360 {
            let fired = scheduler.tick();
            if fired.iter().any(|a| a.kind == AdvisoryKind::ConsiderAdrenaline) {
                reminders.push(scheduler.elapsed_secs());
            }
        }
        assert_eq!(reminders, vec![180, 360]);
        // Rhythm prompt due on the same second wins the display.
        assert_eq!(current_kind(&scheduler), Some(AdvisoryKind::CheckRhythm));
    }

    #[test]
    fn rosc_stops_and_keeps_terminal_advisory() {
        let mut scheduler = running();
        scheduler.observe(&shock());
        let fired = scheduler.observe(&rhythm("ROSC"));
        assert_eq!(fired[0].kind, AdvisoryKind::RoscAchieved);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(!scheduler.has_pending());
        assert_eq!(current_kind(&scheduler), Some(AdvisoryKind::RoscAchieved));

        for _ in 0..120 {
            assert!(scheduler.tick().is_empty());
        }
        assert!(scheduler.current_advisory().is_none());
        assert!(scheduler.observe(&rhythm("VF")).is_empty());
    }

    #[test]
    fn stop_cancels_deferred_and_is_idempotent() {
        let mut scheduler = running();
        scheduler.observe(&shock());
        scheduler.stop();
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(scheduler.current_advisory().is_none());
        for _ in 0..10 {
            assert!(scheduler.tick().is_empty());
        }
    }

    #[test]
    fn dismiss_keeps_follow_up() {
        let mut scheduler = running();
        scheduler.observe(&shock());
        scheduler.dismiss();
        assert!(scheduler.current_advisory().is_none());
        assert!(scheduler.has_pending());
    }

    #[test]
    fn restart_after_stop_resets_elapsed() {
        let mut scheduler = running();
        for _ in 0..30 {
            scheduler.tick();
        }
        scheduler.stop();
        assert!(scheduler.start().is_some());
        assert_eq!(scheduler.elapsed_secs(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Running);
    }
}
