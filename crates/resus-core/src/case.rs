//! The case aggregate.
//!
//! A `Case` owns everything belonging to one resuscitation attempt: the event
//! log, the timers, the guideline scheduler and the attention flags. All
//! mutation goes through `&mut Case`, so appends, ticks and advisories are
//! serialized by construction.
//!
//! ## Lifecycle
//!
//! ```text
//! NotStarted -> Active -> Ended
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut case = Case::new(Config::default());
//! case.start()?;
//! case.record_rhythm("VT/VF")?;
//! // Once per second:
//! let report = case.tick();
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attention::{AttentionFlags, AttentionInput, AttentionSignal};
use crate::error::{CoreError, Result};
use crate::events::{standard_dose, Event, EventKind, PatientOutcome, Rhythm, Stamp, Waveform};
use crate::guideline::{Advisory, GuidelineScheduler};
use crate::log::EventLog;
use crate::review::review;
use crate::storage::Config;
use crate::summary::CaseSummary;
use crate::timer::{CycleCompleted, TimerKind, TimerSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePhase {
    NotStarted,
    Active,
    Ended,
}

/// Defibrillator energy chosen before a shock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergySetting {
    pub joules: u32,
    pub waveform: Waveform,
}

impl EnergySetting {
    pub fn biphasic(joules: u32) -> Self {
        Self {
            joules,
            waveform: Waveform::Biphasic,
        }
    }

    pub fn monophasic(joules: u32) -> Self {
        Self {
            joules,
            waveform: Waveform::Monophasic,
        }
    }
}

/// Direct timer control for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerCommand {
    StartOrReset,
    Stop,
    Reset,
}

/// Outcome of recording one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorded {
    pub event: Event,
    /// CPR segment closed by a rhythm check, appended just before `event`.
    pub cpr_segment: Option<Event>,
    /// Advisories fired synchronously in reaction to the event.
    pub advisories: Vec<Advisory>,
}

/// Everything that changed on one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub offset_secs: u64,
    pub advisories: Vec<Advisory>,
    pub cycles_completed: Vec<CycleCompleted>,
    /// Events appended by the case itself on this tick.
    pub events: Vec<Event>,
    pub flags: AttentionFlags,
}

#[derive(Debug, Clone)]
pub struct Case {
    id: Uuid,
    phase: CasePhase,
    config: Config,
    started_at: Option<DateTime<Utc>>,
    /// Ticks since start.
    offset_secs: u64,
    log: EventLog,
    timers: TimerSet,
    guideline: GuidelineScheduler,
    attention: AttentionSignal,
    energy: Option<EnergySetting>,
}

impl Default for Case {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Case {
    pub fn new(config: Config) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: CasePhase::NotStarted,
            timers: TimerSet::new(config.timers.cpr_cycle_secs),
            guideline: GuidelineScheduler::new(config.guideline.clone()),
            attention: AttentionSignal::new(config.attention.clone()),
            config,
            started_at: None,
            offset_secs: 0,
            log: EventLog::new(),
            energy: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> CasePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == CasePhase::Active
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Seconds on the case clock.
    pub fn offset_secs(&self) -> u64 {
        self.offset_secs
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn guideline(&self) -> &GuidelineScheduler {
        &self.guideline
    }

    pub fn current_advisory(&self) -> Option<&Advisory> {
        self.guideline.current_advisory()
    }

    pub fn attention(&self) -> &AttentionSignal {
        &self.attention
    }

    pub fn selected_energy(&self) -> Option<EnergySetting> {
        self.energy
    }

    /// Record view of the case so far.
    pub fn summary(&self) -> CaseSummary {
        let events = self.log.all();
        CaseSummary {
            case_id: self.id,
            started_at: self.started_at,
            duration_secs: self.timers.elapsed(TimerKind::Case),
            entries: CaseSummary::entries_for(events),
            medication_counts: self.log.medication_counts(),
            shocks: self.log.count_matching(|e| e.kind.is_shock()),
            cpr_cycles: self.timers.cycle_count(TimerKind::Cpr),
            outcome: CaseSummary::outcome_of(events),
            deviations: review(&self.log, &self.config),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<Option<Advisory>> {
        self.start_at(Utc::now())
    }

    /// Start the case with `now` as its wall-clock origin.
    ///
    /// Starts the case and CPR timers and the guideline scheduler. Starting an
    /// active case does nothing.
    pub fn start_at(&mut self, now: DateTime<Utc>) -> Result<Option<Advisory>> {
        match self.phase {
            CasePhase::Active => return Ok(None),
            CasePhase::Ended => return Err(CoreError::CaseEnded(self.id)),
            CasePhase::NotStarted => {}
        }
        self.phase = CasePhase::Active;
        self.started_at = Some(now);
        self.offset_secs = 0;
        self.log.clear();
        self.timers = TimerSet::new(self.config.timers.cpr_cycle_secs);
        self.timers.start_or_reset(TimerKind::Case);
        self.timers.start_or_reset(TimerKind::Cpr);
        let opening = self.guideline.start();
        self.refresh_attention();
        tracing::info!(case = %self.id, "case started");
        Ok(opening)
    }

    /// End the case, discarding all of its state.
    ///
    /// Returns the final summary the first time an active case ends; ending
    /// again is a no-op.
    pub fn end(&mut self) -> Option<CaseSummary> {
        let summary = match self.phase {
            CasePhase::Active => Some(self.summary()),
            CasePhase::NotStarted => None,
            CasePhase::Ended => return None,
        };
        self.guideline.stop();
        self.timers.stop_all();
        self.log.clear();
        self.attention.clear();
        self.energy = None;
        self.phase = CasePhase::Ended;
        tracing::info!(case = %self.id, duration = self.offset_secs, "case ended");
        summary
    }

    // ── Recording ────────────────────────────────────────────────────

    /// Append `kind` and let timers, guideline and flags react, in that order.
    ///
    /// A classified rhythm check taken while CPR runs first records the CPR
    /// time so far. CPR itself keeps running.
    pub fn record(&mut self, kind: EventKind) -> Result<Recorded> {
        self.ensure_active()?;
        let cpr_segment = self.close_cpr_segment(&kind);
        let (event, advisories) = self.append(kind);
        Ok(Recorded {
            event,
            cpr_segment,
            advisories,
        })
    }

    pub fn record_rhythm(&mut self, label: &str) -> Result<Recorded> {
        self.record(EventKind::RhythmCheck {
            label: label.to_string(),
        })
    }

    /// Record a medication. Without an explicit dose the standard dose label
    /// for the drug is used, if it has one.
    pub fn give_medication(&mut self, name: &str, dose: Option<&str>) -> Result<Recorded> {
        let dose = match dose {
            Some(d) => Some(d.to_string()),
            None => {
                let prior = self.log.count_matching(|e| {
                    matches!(&e.kind, EventKind::Medication { name: n, .. } if n.eq_ignore_ascii_case(name))
                });
                standard_dose(name, prior)
            }
        };
        self.record(EventKind::Medication {
            name: name.to_string(),
            dose,
        })
    }

    pub fn select_energy(&mut self, setting: EnergySetting) -> Result<()> {
        self.ensure_active()?;
        self.energy = Some(setting);
        self.refresh_attention();
        Ok(())
    }

    /// Record a shock at the selected energy.
    pub fn deliver_shock(&mut self) -> Result<Recorded> {
        let (energy_joules, waveform) = match self.energy {
            Some(setting) => (Some(setting.joules), setting.waveform),
            None => (None, Waveform::Biphasic),
        };
        self.record(EventKind::Shock {
            energy_joules,
            waveform,
        })
    }

    pub fn start_cpr(&mut self) -> Result<Recorded> {
        self.record(EventKind::CprStarted)
    }

    pub fn record_outcome(&mut self, outcome: PatientOutcome) -> Result<Recorded> {
        self.record(EventKind::Outcome { outcome })
    }

    pub fn note(&mut self, label: &str) -> Result<Recorded> {
        self.record(EventKind::Generic {
            label: label.to_string(),
        })
    }

    pub fn dismiss_advisory(&mut self) {
        self.guideline.dismiss();
    }

    pub fn control_timer(&mut self, kind: TimerKind, command: TimerCommand) -> Result<()> {
        self.ensure_active()?;
        match command {
            TimerCommand::StartOrReset => self.timers.start_or_reset(kind),
            TimerCommand::Stop => self.timers.stop(kind),
            TimerCommand::Reset => self.timers.reset(kind),
        }
        self.refresh_attention();
        Ok(())
    }

    // ── Clock ────────────────────────────────────────────────────────

    /// One-second tick. Does nothing unless the case is active.
    pub fn tick(&mut self) -> TickReport {
        if !self.is_active() {
            return TickReport {
                offset_secs: self.offset_secs,
                flags: self.attention.flags().clone(),
                ..TickReport::default()
            };
        }

        self.offset_secs += 1;
        let cycles_completed = self.timers.tick();
        let mut events = Vec::with_capacity(cycles_completed.len());
        let mut advisories = Vec::new();
        for cycle in &cycles_completed {
            let (event, fired) = self.append(EventKind::CprCycleCompleted {
                cycle_number: cycle.cycle,
            });
            events.push(event);
            advisories.extend(fired);
        }
        advisories.extend(self.guideline.tick());
        self.refresh_attention();

        TickReport {
            offset_secs: self.offset_secs,
            advisories,
            cycles_completed,
            events,
            flags: self.attention.flags().clone(),
        }
    }

    /// Tick `secs` times, collecting the reports.
    pub fn advance(&mut self, secs: u64) -> Vec<TickReport> {
        (0..secs).map(|_| self.tick()).collect()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoreError::CaseNotActive { phase: self.phase })
        }
    }

    fn stamp(&self) -> Stamp {
        let origin = self.started_at.unwrap_or_else(Utc::now);
        let offset = i64::try_from(self.offset_secs).unwrap_or(i64::MAX);
        Stamp::new(origin + Duration::seconds(offset), self.offset_secs)
    }

    /// Append and let timers, guideline and flags observe the new event.
    fn append(&mut self, kind: EventKind) -> (Event, Vec<Advisory>) {
        let stamp = self.stamp();
        let event = self.log.append(kind, stamp).clone();
        self.timers.observe(&event);
        let advisories = self.guideline.observe(&event);
        self.refresh_attention();
        (event, advisories)
    }

    fn close_cpr_segment(&mut self, kind: &EventKind) -> Option<Event> {
        let classified = matches!(kind.rhythm(), Some(r) if r != Rhythm::Unclassified);
        let duration_secs = self.timers.elapsed(TimerKind::Cpr);
        if !classified || !self.timers.is_running(TimerKind::Cpr) || duration_secs == 0 {
            return None;
        }
        let first = self
            .log
            .count_matching(|e| matches!(e.kind, EventKind::CprSegment { .. }))
            == 0;
        let (event, _) = self.append(EventKind::CprSegment {
            duration_secs,
            first,
        });
        Some(event)
    }

    fn refresh_attention(&mut self) {
        let input = AttentionInput {
            log: &self.log,
            timers: &self.timers,
            now_secs: self.offset_secs,
            energy_selected: self.energy.is_some(),
        };
        self.attention.recompute(&input);
    }
}
