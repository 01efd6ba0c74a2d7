//! Integration tests for whole resuscitation scenarios.
//!
//! Each test drives a `Case` the way presentation does: record actions,
//! then tick once per simulated second.

use resus_core::{
    AdvisoryKind, Case, Config, Control, EnergySetting, EventKind, PatientOutcome,
    SchedulerState, TimerKind,
};

fn started() -> Case {
    let mut case = Case::new(Config::default());
    case.start().unwrap();
    case
}

fn current_message(case: &Case) -> Option<String> {
    case.current_advisory().map(|a| a.message.clone())
}

#[test]
fn test_basic_shockable_arrest() {
    let mut case = started();

    let recorded = case.record_rhythm("VT/VF").unwrap();
    assert_eq!(recorded.advisories[0].kind, AdvisoryKind::ShockAdvised);
    assert_eq!(current_message(&case).as_deref(), Some("Shock advised"));
    assert!(case.attention().is_flagged(Control::Shock));

    case.select_energy(EnergySetting::biphasic(200)).unwrap();
    case.deliver_shock().unwrap();
    assert_eq!(
        current_message(&case).as_deref(),
        Some("Shock delivered. Resume CPR immediately for 2 minutes")
    );

    for _ in 0..4 {
        case.tick();
        assert_eq!(
            current_message(&case).as_deref(),
            Some("Shock delivered. Resume CPR immediately for 2 minutes")
        );
    }
    let report = case.tick();
    assert_eq!(report.advisories.len(), 1);
    assert_eq!(current_message(&case).as_deref(), Some("Give Adrenaline 1mg"));
}

#[test]
fn test_rosc_stops_everything() {
    let mut case = started();
    case.record_rhythm("VF").unwrap();
    case.advance(65);
    assert_eq!(case.timers().elapsed(TimerKind::Cpr), 65);

    case.record_rhythm("ROSC").unwrap();
    assert_eq!(case.guideline().state(), SchedulerState::Stopped);
    let cpr = case.timers().elapsed(TimerKind::Cpr);
    let shock = case.timers().elapsed(TimerKind::Shock);

    let reports = case.advance(120);
    assert!(reports.iter().all(|r| r.advisories.is_empty()));
    assert_eq!(case.timers().elapsed(TimerKind::Cpr), cpr);
    assert_eq!(case.timers().elapsed(TimerKind::Shock), shock);
    assert_eq!(case.timers().elapsed(TimerKind::Rosc), 120);
    assert!(case.timers().is_running(TimerKind::Case));
}

#[test]
fn test_rosc_cancels_pending_follow_up() {
    let mut case = started();
    case.record_rhythm("PEA/AS").unwrap();
    case.record_rhythm("ROSC").unwrap();
    let reports = case.advance(10);
    assert!(reports.iter().all(|r| r.advisories.is_empty()));
}

#[test]
fn test_adrenaline_staleness_flag() {
    let mut case = started();
    case.give_medication("Adrenaline", None).unwrap();
    case.advance(299);
    assert!(!case.attention().is_flagged(Control::Adrenaline));
    case.advance(1);
    assert!(case.attention().is_flagged(Control::Adrenaline));
}

#[test]
fn test_amiodarone_overdose_flag_before_tick() {
    let mut case = started();
    case.give_medication("Amiodarone", None).unwrap();
    case.give_medication("Amiodarone", None).unwrap();
    assert!(!case.attention().is_flagged(Control::Antiarrhythmic));
    case.give_medication("Amiodarone", None).unwrap();
    assert!(case.attention().is_flagged(Control::Antiarrhythmic));
}

#[test]
fn test_rhythm_check_prompt_every_two_minutes() {
    let mut case = started();
    let reports = case.advance(360);
    let prompts: Vec<u64> = reports
        .iter()
        .filter(|r| r.advisories.iter().any(|a| a.kind == AdvisoryKind::CheckRhythm))
        .map(|r| r.offset_secs)
        .collect();
    assert_eq!(prompts, vec![120, 240, 360]);
}

#[test]
fn test_cpr_cycles_accumulate_across_segments() {
    let mut case = started();
    case.advance(120);
    case.start_cpr().unwrap();
    case.advance(119);
    assert_eq!(case.timers().cycle_count(TimerKind::Cpr), 1);
    case.advance(1);
    assert_eq!(case.timers().cycle_count(TimerKind::Cpr), 2);

    let cycles = case
        .log()
        .count_matching(|e| matches!(e.kind, EventKind::CprCycleCompleted { .. }));
    assert_eq!(cycles, 2);
}

#[test]
fn test_non_shockable_after_rosc_resumes_arrest() {
    let mut case = started();
    case.record_rhythm("ROSC").unwrap();
    case.advance(30);
    assert_eq!(case.timers().elapsed(TimerKind::Rosc), 30);

    case.record_rhythm("PEA/AS").unwrap();
    assert_eq!(case.timers().elapsed(TimerKind::Rosc), 0);
    assert!(!case.timers().is_running(TimerKind::Rosc));
}

#[test]
fn test_summary_reports_case() {
    let mut case = started();
    case.record_rhythm("VF").unwrap();
    case.select_energy(EnergySetting::biphasic(150)).unwrap();
    case.deliver_shock().unwrap();
    case.deliver_shock().unwrap();
    case.give_medication("Adrenaline", None).unwrap();
    case.advance(60);
    case.give_medication("Adrenaline", None).unwrap();
    case.record_rhythm("ROSC").unwrap();
    case.record_outcome(PatientOutcome::Alive).unwrap();

    let summary = case.end().unwrap();
    assert_eq!(summary.shocks, 2);
    assert_eq!(summary.medication_counts.get("Adrenaline"), Some(&2));
    assert_eq!(summary.outcome, Some(PatientOutcome::Alive));
    assert_eq!(summary.duration_secs, 60);
    // Second shock without a new rhythm check, second adrenaline too soon.
    assert_eq!(summary.deviations.len(), 2);
    assert_eq!(summary.entries.first().unwrap().description, "Outcome: ALIVE");
}

#[test]
fn test_configured_intervals_are_used() {
    let mut config = Config::default();
    config.set("guideline.rhythm_check_interval_secs", "60").unwrap();
    config.set("timers.cpr_cycle_secs", "60").unwrap();
    let mut case = Case::new(config);
    case.start().unwrap();

    let reports = case.advance(60);
    let last = reports.last().unwrap();
    assert!(last
        .advisories
        .iter()
        .any(|a| a.kind == AdvisoryKind::CheckRhythm));
    assert_eq!(last.cycles_completed.len(), 1);
}
