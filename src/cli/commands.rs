// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and all
// their configurable flags.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the classifier and save it under <output>/latest
    Train(TrainArgs),

    /// Classify one string with a saved model
    Predict(PredictArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV with `text` and `label` columns.
    /// Missing or absent → builtin sample table
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Directory for run_{timestamp}/ and latest/
    #[arg(long, env = "ANTISCAM_OUTPUT", default_value = "models")]
    pub output: String,

    /// Hugging Face Hub id or local model directory
    #[arg(long, env = "ANTISCAM_MODEL", default_value = "bert-base-multilingual-cased")]
    pub model: String,

    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Peak learning rate, reached after warmup
    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// Token sequence length after truncation and padding
    #[arg(long, default_value_t = 256)]
    pub max_length: usize,

    #[arg(long, default_value_t = 100)]
    pub warmup_steps: usize,

    /// AdamW decoupled weight decay
    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Epochs without F1 improvement before stopping (0 = never)
    #[arg(long, default_value_t = 2)]
    pub patience: usize,

    /// Seed for the split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 0.2)]
    pub val_fraction: f64,

    /// Log the training loss every N optimizer steps
    #[arg(long, default_value_t = 10)]
    pub logging_steps: usize,
}

/// Boundary between Layer 1 and Layer 2: the application
/// layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data:          a.data.map(|p| p.display().to_string()),
            output_dir:    a.output,
            model_name:    a.model,
            epochs:        a.epochs,
            batch_size:    a.batch_size,
            lr:            a.lr,
            max_length:    a.max_length,
            warmup_steps:  a.warmup_steps,
            weight_decay:  a.weight_decay,
            patience:      a.patience,
            seed:          a.seed,
            val_fraction:  a.val_fraction,
            logging_steps: a.logging_steps,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// The string to classify
    #[arg(long)]
    pub text: String,

    /// A saved model directory
    #[arg(long, default_value = "models/latest")]
    pub model_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use super::*;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["antiscam-trainer", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let mut cfg = TrainConfig::from(args);
        // env vars may be set on the host
        cfg.output_dir = "models".to_string();
        cfg.model_name = "bert-base-multilingual-cased".to_string();
        assert_eq!(cfg, TrainConfig::default());
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "antiscam-trainer", "train",
            "--data", "data/sites.csv",
            "--epochs", "1",
            "--batch-size", "2",
            "--lr", "5e-5",
        ]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.data.as_deref(), Some("data/sites.csv"));
        assert_eq!(cfg.epochs, 1);
        assert_eq!(cfg.batch_size, 2);
        assert_eq!(cfg.lr, 5e-5);
    }

    #[test]
    fn test_predict_requires_text() {
        assert!(Cli::try_parse_from(["antiscam-trainer", "predict"]).is_err());
        let cli = Cli::try_parse_from(["antiscam-trainer", "predict", "--text", "Shopee"]).unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert_eq!(args.model_dir, PathBuf::from("models/latest"));
    }
}
