// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
//   1. `train` — trains the scoring model from a YAML config
//   2. `score` — rates (context, response) pairs with a param set

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, ScoreArgs, TrainArgs};
use std::io::Write;

#[derive(Parser, Debug)]
#[command(
    name = "ade-trainer",
    version,
    about = "Train and run an automatic dialogue evaluation model."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Score(args) => run_score(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let cfg = args.resolve()?;
    tracing::info!("Starting training on '{}'", cfg.training_file.display());

    let summary = TrainUseCase::new(cfg).execute()?;
    println!(
        "Training complete: {} steps, final loss {:.6}, {:.1}s",
        summary.steps,
        summary.last_loss,
        summary.duration.as_secs_f64()
    );
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    use crate::application::score_use_case::ScoreUseCase;

    let scores = ScoreUseCase::new(&args.param_dir, args.use_gpu).score_file(&args.input)?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::fs::File::create(path).with_context(|| {
            format!("Cannot create '{}'", path.display())
        })?),
        None => Box::new(std::io::stdout().lock()),
    };
    for s in &scores {
        writeln!(out, "{s:.6}")?;
    }
    out.flush()?;

    tracing::info!("Scored {} pairs", scores.len());
    Ok(())
}
