//! Line-oriented action language shared by `simulate` and `live`.
//!
//! One action per line; blank lines and `#` comments are skipped.
//!
//! ```text
//! rhythm VT/VF
//! energy biphasic 200
//! shock
//! wait 5
//! med Adrenaline
//! med Magnesium 2g
//! timer stop cpr
//! outcome alive
//! end
//! ```

use resus_core::{Case, EnergySetting, PatientOutcome, TimerCommand, TimerKind};

use super::Reporter;

/// One parsed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Let `n` seconds pass on the case clock.
    Wait(u64),
    Rhythm(String),
    Medication { name: String, dose: Option<String> },
    Energy(EnergySetting),
    Shock,
    Cpr,
    Outcome(PatientOutcome),
    Note(String),
    Dismiss,
    Timer(TimerCommand, TimerKind),
    Status,
    End,
}

/// Whether the case is still running after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Ended,
}

/// Parse one line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<Step>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let step = match word.to_ascii_lowercase().as_str() {
        "wait" => {
            let secs = rest
                .parse::<u64>()
                .map_err(|_| format!("wait expects whole seconds, got '{rest}'"))?;
            Step::Wait(secs)
        }
        "rhythm" | "ecg" => {
            if rest.is_empty() {
                return Err("rhythm expects a label".to_string());
            }
            Step::Rhythm(rest.to_string())
        }
        "med" | "medication" => match args.as_slice() {
            [name] => Step::Medication {
                name: (*name).to_string(),
                dose: None,
            },
            [name, dose @ ..] if !dose.is_empty() => Step::Medication {
                name: (*name).to_string(),
                dose: Some(dose.join(" ")),
            },
            _ => return Err("med expects a name and optional dose".to_string()),
        },
        "energy" => match args.as_slice() {
            [waveform, joules] => {
                let joules = joules
                    .trim_end_matches(['J', 'j'])
                    .parse::<u32>()
                    .map_err(|_| format!("invalid energy '{joules}'"))?;
                match waveform.to_ascii_lowercase().as_str() {
                    "biphasic" => Step::Energy(EnergySetting::biphasic(joules)),
                    "monophasic" => Step::Energy(EnergySetting::monophasic(joules)),
                    other => return Err(format!("unknown waveform '{other}'")),
                }
            }
            _ => return Err("energy expects <biphasic|monophasic> <joules>".to_string()),
        },
        "shock" => Step::Shock,
        "cpr" => Step::Cpr,
        "outcome" => match rest.to_ascii_lowercase().as_str() {
            "alive" => Step::Outcome(PatientOutcome::Alive),
            "death" | "dead" => Step::Outcome(PatientOutcome::Death),
            other => return Err(format!("unknown outcome '{other}'")),
        },
        "note" => Step::Note(rest.to_string()),
        "dismiss" => Step::Dismiss,
        "timer" => match args.as_slice() {
            [command, kind] => Step::Timer(parse_timer_command(command)?, parse_timer_kind(kind)?),
            _ => return Err("timer expects <start|stop|reset> <case|shock|cpr|rosc>".to_string()),
        },
        "status" => Step::Status,
        "end" => Step::End,
        other => return Err(format!("unknown action '{other}'")),
    };
    Ok(Some(step))
}

/// Parse a whole script, reporting the first bad line.
pub fn parse_script(text: &str) -> Result<Vec<Step>, Box<dyn std::error::Error>> {
    let mut steps = Vec::new();
    for (index, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(step)) => steps.push(step),
            Ok(None) => {}
            Err(message) => return Err(format!("line {}: {message}", index + 1).into()),
        }
    }
    Ok(steps)
}

fn parse_timer_command(word: &str) -> Result<TimerCommand, String> {
    match word.to_ascii_lowercase().as_str() {
        "start" | "restart" => Ok(TimerCommand::StartOrReset),
        "stop" => Ok(TimerCommand::Stop),
        "reset" => Ok(TimerCommand::Reset),
        other => Err(format!("unknown timer command '{other}'")),
    }
}

fn parse_timer_kind(word: &str) -> Result<TimerKind, String> {
    match word.to_ascii_lowercase().as_str() {
        "case" => Ok(TimerKind::Case),
        "shock" => Ok(TimerKind::Shock),
        "cpr" => Ok(TimerKind::Cpr),
        "rosc" => Ok(TimerKind::Rosc),
        other => Err(format!("unknown timer '{other}'")),
    }
}

/// Apply `step` to `case`, reporting everything it produced.
pub fn apply(
    case: &mut Case,
    step: &Step,
    out: &mut Reporter,
) -> Result<Flow, Box<dyn std::error::Error>> {
    let recorded = match step {
        Step::Wait(secs) => {
            for report in case.advance(*secs) {
                out.tick(&report)?;
            }
            return Ok(Flow::Continue);
        }
        Step::Rhythm(label) => case.record_rhythm(label)?,
        Step::Medication { name, dose } => case.give_medication(name, dose.as_deref())?,
        Step::Energy(setting) => {
            case.select_energy(*setting)?;
            out.flags(case)?;
            return Ok(Flow::Continue);
        }
        Step::Shock => case.deliver_shock()?,
        Step::Cpr => case.start_cpr()?,
        Step::Outcome(outcome) => case.record_outcome(*outcome)?,
        Step::Note(label) => case.note(label)?,
        Step::Dismiss => {
            case.dismiss_advisory();
            return Ok(Flow::Continue);
        }
        Step::Timer(command, kind) => {
            case.control_timer(*kind, *command)?;
            out.flags(case)?;
            return Ok(Flow::Continue);
        }
        Step::Status => {
            out.status(case)?;
            return Ok(Flow::Continue);
        }
        Step::End => {
            if let Some(summary) = case.end() {
                out.summary(&summary)?;
            }
            return Ok(Flow::Ended);
        }
    };

    if let Some(segment) = &recorded.cpr_segment {
        out.event(segment)?;
    }
    out.event(&recorded.event)?;
    for advisory in &recorded.advisories {
        out.advisory(case.offset_secs(), advisory)?;
    }
    out.flags(case)?;
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_actions() {
        assert_eq!(parse_line("wait 30").unwrap(), Some(Step::Wait(30)));
        assert_eq!(
            parse_line("rhythm VT/VF").unwrap(),
            Some(Step::Rhythm("VT/VF".to_string()))
        );
        assert_eq!(
            parse_line("med Magnesium 2 g").unwrap(),
            Some(Step::Medication {
                name: "Magnesium".to_string(),
                dose: Some("2 g".to_string())
            })
        );
        assert_eq!(
            parse_line("energy monophasic 360J").unwrap(),
            Some(Step::Energy(EnergySetting::monophasic(360)))
        );
        assert_eq!(
            parse_line("timer stop cpr").unwrap(),
            Some(Step::Timer(TimerCommand::Stop, TimerKind::Cpr))
        );
        assert_eq!(
            parse_line("OUTCOME alive").unwrap(),
            Some(Step::Outcome(PatientOutcome::Alive))
        );
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   # arrival").unwrap(), None);
    }

    #[test]
    fn reports_line_number_on_error() {
        let err = parse_script("rhythm VF\n\nwait soon\n").unwrap_err();
        assert_eq!(err.to_string(), "line 3: wait expects whole seconds, got 'soon'");
        assert!(parse_line("energy triphasic 200").is_err());
        assert!(parse_line("defibrillate").is_err());
    }
}
