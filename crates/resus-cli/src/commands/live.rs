//! Interactive mode: a real 1 Hz clock plus actions typed on stdin.
//!
//! Stdin is read on a blocking task and forwarded over a channel; one task
//! selects between that channel and the interval and is the only owner of
//! the case.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use resus_core::Case;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::script::{apply, parse_line, Flow};
use super::{load_config, Reporter};

#[derive(Args)]
pub struct LiveArgs {
    /// Emit JSON lines instead of text
    #[arg(long)]
    pub json: bool,
    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Milliseconds per case-clock second
    #[arg(long, default_value = "1000")]
    pub tick_ms: u64,
}

enum Input {
    Line(String),
    Closed,
}

pub fn run(args: LiveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let result = runtime.block_on(run_case(args));
    // The stdin task may still be parked in a blocking read.
    runtime.shutdown_background();
    result
}

async fn run_case(args: LiveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;
    let mut case = Case::new(config);
    let mut out = Reporter::new(args.json);

    let (tx, mut rx) = mpsc::channel(64);
    tokio::task::spawn_blocking(move || read_stdin(tx));

    let period = Duration::from_millis(args.tick_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    // A late tick is still a case-clock second.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    if let Some(opening) = case.start()? {
        out.advisory(case.offset_secs(), &opening)?;
    }
    out.flags(&case)?;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = case.tick();
                out.tick(&report)?;
            }
            input = rx.recv() => match input {
                Some(Input::Line(line)) => {
                    let step = match parse_line(&line) {
                        Ok(Some(step)) => step,
                        Ok(None) => continue,
                        Err(message) => {
                            eprintln!("error: {message}");
                            continue;
                        }
                    };
                    if apply(&mut case, &step, &mut out)? == Flow::Ended {
                        return Ok(());
                    }
                }
                Some(Input::Closed) | None => break,
            },
        }
    }

    if let Some(summary) = case.end() {
        out.summary(&summary)?;
    }
    Ok(())
}

fn read_stdin(tx: mpsc::Sender<Input>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => {
                if tx.blocking_send(Input::Line(line)).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
    let _ = tx.blocking_send(Input::Closed);
}
