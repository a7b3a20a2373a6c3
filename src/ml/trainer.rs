// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tuning loop using Burn's DataLoader and AdamW.
//
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the model on B::InnerBackend, so the
//     validation batcher uses the inner backend too
//   - argmax(1) returns [batch, 1]; flatten before comparing
//
// Per epoch: train → evaluate → log + CSV row → save
// run_{ts}/checkpoint-{epoch}. The best epoch by weighted F1 is
// reloaded at the end and evaluated once more.
//
// Reference: Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{ClassificationBatch, ClassificationBatcher},
    dataset::ScamDataset,
};
use crate::domain::label::Label;
use crate::infra::checkpoint::{CheckpointManager, RunLayout};
use crate::infra::metrics::{ClassificationMetrics, EpochMetrics, EvalReport, MetricsLogger};
use crate::ml::bert::BertClassifier;

// ─── Learning-rate schedule ───────────────────────────────────────────────────
/// Linear warmup from 0 to the peak rate, then linear decay to 0
/// at `total_steps`. `step` counts optimizer updates already taken.
#[derive(Debug, Clone, Copy)]
pub struct LinearWarmup {
    peak:         f64,
    warmup_steps: usize,
    total_steps:  usize,
}

impl LinearWarmup {
    pub fn new(peak: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { peak, warmup_steps, total_steps }
    }

    pub fn lr_at(&self, step: usize) -> f64 {
        let factor = if step < self.warmup_steps {
            step as f64 / self.warmup_steps.max(1) as f64
        } else {
            let remaining = self.total_steps.saturating_sub(step) as f64;
            let span      = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
            (remaining / span).max(0.0)
        };
        self.peak * factor
    }
}

// ─── Early stopping ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Improved,
    NoImprovement,
    Stop,
}

/// Tracks the best weighted F1 seen so far. `patience` consecutive
/// epochs without a strict improvement end training; 0 never stops.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:   usize,
    best_f1:    Option<f64>,
    best_epoch: usize,
    stale:      usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best_f1: None, best_epoch: 0, stale: 0 }
    }

    pub fn observe(&mut self, metrics: &EpochMetrics) -> Verdict {
        if metrics.is_improvement(self.best_f1) {
            self.best_f1    = Some(metrics.eval.f1);
            self.best_epoch = metrics.epoch;
            self.stale      = 0;
            return Verdict::Improved;
        }
        self.stale += 1;
        if self.patience > 0 && self.stale >= self.patience {
            Verdict::Stop
        } else {
            Verdict::NoImprovement
        }
    }

    /// Epoch of the best checkpoint, 0 before the first observation.
    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }
}

// ─── Evaluation ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct EvalOutcome {
    pub loss:    f64,
    pub metrics: ClassificationMetrics,
}

/// One full pass over `loader`: per-example mean loss and metrics
/// over every example.
pub fn evaluate<B: Backend>(
    model:  &BertClassifier<B>,
    loader: &Arc<dyn DataLoader<ClassificationBatch<B>>>,
) -> EvalOutcome {
    let mut loss_sum = 0.0f64;
    let mut seen     = 0usize;
    let mut preds    = Vec::new();
    let mut labels   = Vec::new();

    for batch in loader.iter() {
        let batch_len      = batch.labels.dims()[0];
        let (loss, logits) = model.forward_loss(batch.input_ids, batch.attention_mask, batch.labels.clone());
        // Batch loss is a mean; weight it back by batch size
        loss_sum += loss.into_scalar().elem::<f64>() * batch_len as f64;
        seen     += batch_len;

        // argmax(1) returns shape [batch, 1]
        let predicted = logits.argmax(1).flatten::<1>(0, 1);
        preds.extend(predicted.into_data().iter::<i64>().map(|p| p as usize));
        labels.extend(batch.labels.into_data().iter::<i64>().map(|l| l as usize));
    }

    EvalOutcome {
        loss:    if seen > 0 { loss_sum / seen as f64 } else { f64::NAN },
        metrics: ClassificationMetrics::compute(&preds, &labels, Label::COUNT),
    }
}

// ─── Training ─────────────────────────────────────────────────────────────────
/// The selected model and how it got there.
pub struct TrainOutcome<B: Backend> {
    pub model:   BertClassifier<B>,
    pub report:  EvalReport,
    pub history: Vec<EpochMetrics>,
}

pub fn run_training<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    model:   BertClassifier<B>,
    train:   ScamDataset,
    val:     ScamDataset,
    run:     &RunLayout,
    device:  &B::Device,
) -> Result<TrainOutcome<B>> {
    let mut model = model;

    // ── AdamW with gradient-norm clipping ─────────────────────────────────────
    let mut optim = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay as f32)
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(1.0)))
        .init::<B, BertClassifier<B>>();

    let steps_per_epoch = train.len().div_ceil(cfg.batch_size);
    let schedule        = LinearWarmup::new(cfg.lr, cfg.warmup_steps, steps_per_epoch * cfg.epochs);

    tracing::info!(
        "Training on {} samples, validating on {} ({} steps/epoch, {} epochs max)",
        train.len(), val.len(), steps_per_epoch, cfg.epochs
    );

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(ClassificationBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train);

    // ── Validation data loader (InnerBackend, no autodiff overhead) ───────────
    let val_loader = DataLoaderBuilder::new(ClassificationBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val);

    let logger      = MetricsLogger::new(run.logs_dir())?;
    tracing::info!("Logging epoch metrics to '{}'", logger.csv_path().display());
    let mut stopper = EarlyStopping::new(cfg.patience);
    let mut history = Vec::new();
    let mut step    = 0usize;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch.input_ids, batch.attention_mask, batch.labels);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val;
            train_batches  += 1;

            let lr    = schedule.lr_at(step);
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
            step += 1;

            if cfg.logging_steps > 0 && step % cfg.logging_steps == 0 {
                tracing::info!("step {:>5} | loss={:.4} | lr={:.3e}", step, loss_val, lr);
            }
        }

        let train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // dropout disabled for evaluation
        let eval    = evaluate(&model.valid(), &val_loader);
        let metrics = EpochMetrics::new(epoch, train_loss, eval.loss, eval.metrics);

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | eval_loss={:.4} | acc={:.1}% | f1={:.4}",
            epoch, cfg.epochs, train_loss, eval.loss,
            eval.metrics.accuracy * 100.0, eval.metrics.f1,
        );
        logger.log(&metrics)?;

        CheckpointManager::new(run.checkpoint_dir(epoch)).save_model(&model)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);

        let verdict = stopper.observe(&metrics);
        history.push(metrics);

        match verdict {
            Verdict::Improved => tracing::info!("New best weighted F1 {:.4} at epoch {}", eval.metrics.f1, epoch),
            Verdict::NoImprovement => {}
            Verdict::Stop => {
                tracing::info!("Early stopping after epoch {} (patience {})", epoch, cfg.patience);
                break;
            }
        }
    }

    // ── Reload best checkpoint and evaluate it ────────────────────────────────
    let best_epoch = stopper.best_epoch();
    if best_epoch == 0 {
        anyhow::bail!("Training finished without completing an epoch");
    }
    tracing::info!("Loading best checkpoint (epoch {})", best_epoch);
    let model = CheckpointManager::new(run.checkpoint_dir(best_epoch)).load_model(model, device)?;

    let final_eval = evaluate(&model.valid(), &val_loader);
    let report     = EvalReport::new(best_epoch, final_eval.loss, final_eval.metrics);
    tracing::info!(
        "Final evaluation: loss={:.4} accuracy={:.4} precision={:.4} recall={:.4} f1={:.4}",
        report.eval_loss, report.eval_accuracy, report.eval_precision, report.eval_recall, report.eval_f1
    );

    Ok(TrainOutcome { model, report, history })
}
