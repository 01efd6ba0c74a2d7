pub mod config;
pub mod live;
pub mod script;
pub mod simulate;

use std::path::Path;

use resus_core::{
    format_clock, Advisory, Case, CaseSummary, Config, Control, Event, TickReport, TimerKind,
};
use serde::Serialize;

/// Load the config from `path` if given, else from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Config::load_from(path)?),
        None => Ok(Config::load_or_default()),
    }
}

/// One line of machine-readable output.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Line<'a> {
    Event {
        event: &'a Event,
    },
    Advisory {
        offset_secs: u64,
        advisory: &'a Advisory,
    },
    Attention {
        offset_secs: u64,
        raised: &'a [Control],
    },
    Status {
        offset_secs: u64,
        timers: Vec<TimerLine>,
        advisory: Option<&'a Advisory>,
        raised: &'a [Control],
    },
    Summary {
        summary: &'a CaseSummary,
    },
}

#[derive(Serialize)]
struct TimerLine {
    timer: TimerKind,
    elapsed_secs: u64,
    running: bool,
    cycles: u32,
}

/// Renders case output as text or JSON lines on stdout.
///
/// Attention flags are only printed when the raised set changes.
pub struct Reporter {
    json: bool,
    raised: Vec<Control>,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            raised: Vec::new(),
        }
    }

    pub fn event(&mut self, event: &Event) -> Result<(), serde_json::Error> {
        if self.json {
            return emit(&Line::Event { event });
        }
        println!("[{}] {}", format_clock(event.offset_secs), event.kind.describe());
        Ok(())
    }

    pub fn advisory(&mut self, offset_secs: u64, advisory: &Advisory) -> Result<(), serde_json::Error> {
        if self.json {
            return emit(&Line::Advisory {
                offset_secs,
                advisory,
            });
        }
        println!(
            "[{}] >> {}",
            format_clock(offset_secs),
            advisory.message.replace('\n', " / ")
        );
        Ok(())
    }

    /// Print the raised flags if they changed since the last call.
    pub fn flags(&mut self, case: &Case) -> Result<(), serde_json::Error> {
        let raised = case.attention().raised();
        if raised == self.raised {
            return Ok(());
        }
        self.raised = raised;
        if self.json {
            return emit(&Line::Attention {
                offset_secs: case.offset_secs(),
                raised: &self.raised,
            });
        }
        println!(
            "[{}] attention: {}",
            format_clock(case.offset_secs()),
            names(&self.raised)
        );
        Ok(())
    }

    pub fn tick(&mut self, report: &TickReport) -> Result<(), serde_json::Error> {
        for event in &report.events {
            self.event(event)?;
        }
        for advisory in &report.advisories {
            self.advisory(report.offset_secs, advisory)?;
        }
        let raised: Vec<Control> = report
            .flags
            .iter()
            .filter(|(_, on)| **on)
            .map(|(control, _)| *control)
            .collect();
        if raised != self.raised {
            self.raised = raised;
            if self.json {
                return emit(&Line::Attention {
                    offset_secs: report.offset_secs,
                    raised: &self.raised,
                });
            }
            println!(
                "[{}] attention: {}",
                format_clock(report.offset_secs),
                names(&self.raised)
            );
        }
        Ok(())
    }

    pub fn status(&mut self, case: &Case) -> Result<(), serde_json::Error> {
        let timers: Vec<TimerLine> = TimerKind::ALL
            .iter()
            .map(|&kind| {
                let state = case.timers().state(kind);
                TimerLine {
                    timer: kind,
                    elapsed_secs: state.accumulated_secs,
                    running: state.running,
                    cycles: state.completed_cycles,
                }
            })
            .collect();
        let raised = case.attention().raised();

        if self.json {
            return emit(&Line::Status {
                offset_secs: case.offset_secs(),
                timers,
                advisory: case.current_advisory(),
                raised: &raised,
            });
        }

        println!("── status at {} ──", format_clock(case.offset_secs()));
        for line in &timers {
            let marker = if line.running { "running" } else { "stopped" };
            print!(
                "  {:<6} {} ({marker})",
                line.timer.label(),
                format_clock(line.elapsed_secs)
            );
            if line.timer == TimerKind::Cpr {
                print!(" cycles: {}", line.cycles);
            }
            println!();
        }
        match case.current_advisory() {
            Some(advisory) => println!("  advisory: {}", advisory.message.replace('\n', " / ")),
            None => println!("  advisory: -"),
        }
        println!("  attention: {}", names(&raised));
        Ok(())
    }

    pub fn summary(&mut self, summary: &CaseSummary) -> Result<(), serde_json::Error> {
        if self.json {
            return emit(&Line::Summary { summary });
        }

        println!("── case {} ──", summary.case_id);
        println!("  duration: {}", format_clock(summary.duration_secs));
        println!("  shocks: {}", summary.shocks);
        println!("  cpr cycles: {}", summary.cpr_cycles);
        for (name, count) in &summary.medication_counts {
            println!("  {name}: {count}");
        }
        if let Some(outcome) = summary.outcome {
            println!("  outcome: {outcome:?}");
        }
        for entry in &summary.entries {
            println!("  {}  {}", entry.clock, entry.description);
        }
        if !summary.deviations.is_empty() {
            println!("  deviations:");
            for deviation in &summary.deviations {
                println!("    event {}: {:?}", deviation.event_id.0, deviation.reason);
            }
        }
        Ok(())
    }
}

fn emit(line: &Line<'_>) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(line)?);
    Ok(())
}

fn names(controls: &[Control]) -> String {
    if controls.is_empty() {
        return "none".to_string();
    }
    controls
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}
