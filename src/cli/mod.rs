// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with clap and delegates all
// work to Layer 2 (application).
//
//   1. `train`   — fine-tunes the classifier
//   2. `predict` — loads a saved model and classifies a string

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "antiscam-trainer",
    version,
    about = "Fine-tune a multilingual BERT classifier to flag phishing and scam text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training with base model '{}'", args.model);
    let output = std::path::Path::new(&args.output).join("latest");

    let metadata = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Model saved to {}", output.display());
    println!("{}", serde_json::to_string_pretty(&metadata.metrics)?);
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::predict;

    let prediction = predict(&args.text, &args.model_dir)?;
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}
