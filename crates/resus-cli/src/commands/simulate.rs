use std::path::PathBuf;

use clap::Args;
use resus_core::Case;

use super::script::{apply, parse_script, Flow};
use super::{load_config, Reporter};

/// Replay a script of actions against a fresh case.
#[derive(Args)]
pub struct SimulateArgs {
    /// Script file, one action per line
    pub script: PathBuf,
    /// Emit JSON lines instead of text
    #[arg(long)]
    pub json: bool,
    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&args.script)?;
    let steps = parse_script(&text)?;
    let config = load_config(args.config.as_deref())?;

    let mut case = Case::new(config);
    let mut out = Reporter::new(args.json);
    if let Some(opening) = case.start()? {
        out.advisory(case.offset_secs(), &opening)?;
    }
    out.flags(&case)?;

    for step in &steps {
        if apply(&mut case, step, &mut out)? == Flow::Ended {
            return Ok(());
        }
    }

    // A script without `end` still closes the case.
    if let Some(summary) = case.end() {
        out.summary(&summary)?;
    }
    Ok(())
}
