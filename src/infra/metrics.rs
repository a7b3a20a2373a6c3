// ============================================================
// Layer 6 — Metrics
// ============================================================
// Classification metrics over a full validation pass, and a
// CSV logger that records them once per epoch.
//
// Metrics:
//   accuracy  = correct / total
//   precision, recall, f1 — computed per class, then averaged
//               with each class weighted by its support (its
//               count in the true labels). A class whose
//               denominator is 0 scores 0 for that metric.
//
// Output file: run_{timestamp}/logs/metrics.csv
//
//   epoch,train_loss,eval_loss,eval_accuracy,eval_precision,eval_recall,eval_f1
//   1,1.602210,1.583914,0.333333,0.111111,0.333333,0.166667
//   ...

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// Accuracy plus support-weighted precision/recall/F1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
}

impl ClassificationMetrics {
    /// Compute metrics from predicted and true class ids in `0..num_classes`.
    /// Empty input yields all zeros.
    pub fn compute(predictions: &[usize], labels: &[usize], num_classes: usize) -> Self {
        assert_eq!(
            predictions.len(),
            labels.len(),
            "predictions and labels must have same length"
        );

        let total = labels.len();
        if total == 0 {
            return Self::default();
        }

        let mut tp      = vec![0usize; num_classes];
        let mut fp      = vec![0usize; num_classes];
        let mut support = vec![0usize; num_classes];

        for (&pred, &label) in predictions.iter().zip(labels.iter()) {
            support[label] += 1;
            if pred == label {
                tp[label] += 1;
            } else {
                fp[pred] += 1;
            }
        }

        let correct: usize = tp.iter().sum();
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };

        let mut precision = 0.0;
        let mut recall    = 0.0;
        let mut f1        = 0.0;

        for c in 0..num_classes {
            if support[c] == 0 {
                continue;
            }
            let weight = support[c] as f64 / total as f64;
            let p = ratio(tp[c], tp[c] + fp[c]);
            let r = ratio(tp[c], support[c]);
            let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };

            precision += weight * p;
            recall    += weight * r;
            f1        += weight * f;
        }

        Self {
            accuracy: correct as f64 / total as f64,
            precision,
            recall,
            f1,
        }
    }
}

/// Final evaluation of the selected model, as written into
/// metadata.json under `metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub eval_loss:      f64,
    pub eval_accuracy:  f64,
    pub eval_precision: f64,
    pub eval_recall:    f64,
    pub eval_f1:        f64,
    /// Epoch whose checkpoint produced these numbers
    pub epoch:          usize,
}

impl EvalReport {
    pub fn new(epoch: usize, loss: f64, m: ClassificationMetrics) -> Self {
        Self {
            eval_loss:      loss,
            eval_accuracy:  m.accuracy,
            eval_precision: m.precision,
            eval_recall:    m.recall,
            eval_f1:        m.f1,
            epoch,
        }
    }
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average cross-entropy loss over all training batches
    pub train_loss: f64,

    /// Average cross-entropy loss on the validation set
    pub eval_loss: f64,

    pub eval: ClassificationMetrics,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, eval_loss: f64, eval: ClassificationMetrics) -> Self {
        Self { epoch, train_loss, eval_loss, eval }
    }

    /// Best-model selection uses weighted F1, greater is better.
    pub fn is_improvement(&self, best_f1: Option<f64>) -> bool {
        best_f1.map_or(true, |best| self.eval.f1 > best)
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,eval_loss,eval_accuracy,eval_precision,eval_recall,eval_f1")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.eval_loss,
            m.eval.accuracy,
            m.eval.precision,
            m.eval.recall,
            m.eval.f1,
        )?;

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical_predictions_score_one() {
        let labels = [0, 1, 2, 3, 4, 0, 2];
        let m = ClassificationMetrics::compute(&labels, &labels, 5);
        assert_eq!(m.accuracy, 1.0);
        assert!(approx(m.precision, 1.0));
        assert!(approx(m.recall, 1.0));
        assert!(approx(m.f1, 1.0));
    }

    #[test]
    fn test_disjoint_predictions_score_zero() {
        let labels = [0, 0, 1, 1, 2];
        let preds  = [1, 2, 0, 3, 4];
        let m = ClassificationMetrics::compute(&preds, &labels, 5);
        assert_eq!(m.accuracy, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn test_weighted_average() {
        // class 0: support 3, tp 2, fp 0 → p=1,   r=2/3, f1=0.8
        // class 1: support 1, tp 1, fp 1 → p=0.5, r=1,   f1=2/3
        let labels = [0, 0, 0, 1];
        let preds  = [0, 0, 1, 1];
        let m = ClassificationMetrics::compute(&preds, &labels, 5);
        assert!(approx(m.accuracy, 0.75));
        assert!(approx(m.precision, 0.75 * 1.0 + 0.25 * 0.5));
        assert!(approx(m.recall, 0.75 * (2.0 / 3.0) + 0.25 * 1.0));
        assert!(approx(m.f1, 0.75 * 0.8 + 0.25 * (2.0 / 3.0)));
    }

    #[test]
    fn test_empty_input() {
        let m = ClassificationMetrics::compute(&[], &[], 5);
        assert_eq!(m, ClassificationMetrics::default());
    }

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 1.2, 1.1, ClassificationMetrics { f1: 0.6, ..Default::default() });
        assert!(m.is_improvement(None));
        assert!(m.is_improvement(Some(0.5)));
        // Equal is not an improvement
        assert!(!m.is_improvement(Some(0.6)));
    }

    #[test]
    fn test_logger_appends_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path().join("logs")).unwrap();
        let m      = ClassificationMetrics { accuracy: 0.5, precision: 0.25, recall: 0.5, f1: 0.3 };
        logger.log(&EpochMetrics::new(1, 1.5, 1.4, m)).unwrap();
        logger.log(&EpochMetrics::new(2, 1.2, 1.3, m)).unwrap();

        let text  = std::fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("epoch,train_loss"));
        assert!(lines[2].starts_with("2,1.200000,1.300000,0.500000"));
    }
}
