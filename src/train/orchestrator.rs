//! Training orchestration
//!
//! Drives the run as an explicit state machine:
//! `Initialized → DataReady → ModelReady → Training(epoch) → Completed`,
//! with resume re-entering `Training` at the checkpoint's epoch + 1.
//! Epoch control is single-threaded: no two epochs overlap, and the epoch-N
//! checkpoint is durable before epoch N+1 starts. Parallelism lives entirely
//! inside the batch loaders; the orchestrator is the only writer of learner
//! parameters.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ndarray::Array1;
use serde::Serialize;

use super::config::{OptimizerKind, SchedulerKind, TrainConfig};
use super::loss::AestheticLoss;
use super::metrics::{mean_absolute_error, pearson_correlation};
use super::state::TrainingState;
use crate::data::{
    load_ground_truth, BatchLoader, SampleSource, ScoreNormalizer, SplitSummary,
    StratifiedSplitter,
};
use crate::error::Result;
use crate::io::{
    load_checkpoint, save_checkpoint, Checkpoint, LearnerSnapshot, BEST_CHECKPOINT,
    LATEST_CHECKPOINT,
};
use crate::model::{AestheticModel, ImageTransform, Learner, ModelInfo};
use crate::optim::{
    clip_grad_norm, Adam, CosineAnnealing, Optimizer, ReduceOnPlateau, Scheduler, SGD,
};

/// Orchestrator lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialized,
    DataReady,
    ModelReady,
    Training(usize),
    Completed,
}

/// The three per-split loaders plus the persisted summary.
struct DataPipeline {
    train: BatchLoader,
    val: BatchLoader,
    test: BatchLoader,
    summary: SplitSummary,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub epochs_run: usize,
    pub final_train_loss: f32,
    pub final_val_loss: f32,
    pub best_val_loss: Option<f32>,
    pub elapsed_secs: f64,
}

#[derive(Serialize)]
struct RunHistory<'a> {
    train_losses: &'a [f32],
    val_losses: &'a [f32],
    learning_rates: &'a [f32],
    best_val_loss: Option<f32>,
    total_training_time: f64,
    config: &'a TrainConfig,
}

/// Owns the full training run: data pipeline, learner, optimizer, schedule,
/// and the single mutable [`TrainingState`].
pub struct TrainingOrchestrator {
    config: TrainConfig,
    output_dir: PathBuf,
    phase: Phase,
    start_epoch: usize,
    state: TrainingState,
    loss: AestheticLoss,
    data: Option<DataPipeline>,
    learner: Option<Box<dyn Learner>>,
    optimizer: Option<Box<dyn Optimizer>>,
    scheduler: Option<Scheduler>,
    model_info: Option<ModelInfo>,
}

impl TrainingOrchestrator {
    /// Create an orchestrator and its output directory.
    pub fn new(config: TrainConfig) -> Result<Self> {
        let output_dir = config.output_dir.clone();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            crate::error::Error::persistence(
                format!("creating output directory {}", output_dir.display()),
                e,
            )
        })?;

        println!("Trainer initialized:");
        println!("  Output directory: {}", output_dir.display());

        Ok(Self {
            config,
            output_dir,
            phase: Phase::Initialized,
            start_epoch: 0,
            state: TrainingState::new(),
            loss: AestheticLoss::default(),
            data: None,
            learner: None,
            optimizer: None,
            scheduler: None,
            model_info: None,
        })
    }

    /// Build the data pipeline: CSV → normalizer → stratified splits →
    /// sample sources → loaders. Persists the split summary.
    pub fn setup_data(&mut self) -> Result<()> {
        assert!(
            self.phase == Phase::Initialized,
            "setup_data must run exactly once, before setup_model"
        );

        println!("Setting up data loaders...");
        let normalizer = ScoreNormalizer::default();
        let examples = load_ground_truth(&self.config.csv_path, &normalizer)?;
        println!("Dataset loaded: {} images", examples.len());

        let splitter = StratifiedSplitter::new(
            self.config.val_split,
            self.config.test_split,
            self.config.random_seed,
        )?;
        let (train, val, test, summary) = splitter.split_with_summary(&examples)?;

        for stats in &summary.splits_data {
            println!(
                "{:5}: {:6} images ({:.1}%), score {:.2}±{:.2}",
                stats.split, stats.size, stats.percentage, stats.mean_score, stats.std_score
            );
        }

        crate::io::write_json(
            self.output_dir.join("split_info.json"),
            &summary,
            "writing split summary",
        )?;

        let transform = ImageTransform;
        let images_path = &self.config.images_path;
        let train_source = Arc::new(SampleSource::new(train, images_path, transform));
        let val_source = Arc::new(SampleSource::new(val, images_path, transform));
        let test_source = Arc::new(SampleSource::new(test, images_path, transform));

        let batch_size = self.config.batch_size;
        let workers = self.config.num_workers;
        let seed = self.config.random_seed;
        self.data = Some(DataPipeline {
            train: BatchLoader::new(train_source, batch_size, true, true, workers, seed),
            val: BatchLoader::new(val_source, batch_size, false, false, workers, seed),
            test: BatchLoader::new(test_source, batch_size, false, false, workers, seed),
            summary,
        });

        self.phase = Phase::DataReady;
        println!("Data loaders setup complete!");
        Ok(())
    }

    /// Resolve the configured tags into a learner, optimizer, and scheduler.
    /// Unknown tags fail fast here, before any epoch runs.
    pub fn setup_model(&mut self) -> Result<()> {
        assert!(
            self.phase == Phase::DataReady,
            "setup_model requires setup_data to have completed"
        );

        println!("Setting up model...");
        let backbone = self.config.backbone.parse()?;
        let optimizer_kind = self.config.optimizer_kind()?;
        let scheduler_kind = self.config.scheduler_kind()?;

        let learner = AestheticModel::new(backbone, self.config.pretrained, self.config.random_seed);
        let info = learner.info();
        println!(
            "  Backbone: {} (pretrained: {})",
            info.backbone, info.pretrained
        );
        println!("  Trainable parameters: {}", info.trainable_parameters);

        let lr = self.config.learning_rate;
        let weight_decay = self.config.weight_decay;
        let optimizer: Box<dyn Optimizer> = match optimizer_kind {
            OptimizerKind::Adam => Box::new(Adam::default_params(lr, weight_decay)),
            OptimizerKind::Sgd => Box::new(SGD::new(lr, 0.9, weight_decay)),
        };

        self.scheduler = match scheduler_kind {
            SchedulerKind::ReduceOnPlateau => {
                Some(Scheduler::ReduceOnPlateau(ReduceOnPlateau::new(0.5, 5)))
            }
            SchedulerKind::Cosine => Some(Scheduler::Cosine(CosineAnnealing::new(
                lr,
                self.config.epochs,
                0.0,
            ))),
            SchedulerKind::None => None,
        };

        crate::io::write_json(
            self.output_dir.join("model_info.json"),
            &info,
            "writing model info",
        )?;

        self.model_info = Some(info);
        self.learner = Some(Box::new(learner));
        self.optimizer = Some(optimizer);
        self.phase = Phase::ModelReady;
        println!("Model setup complete!");
        Ok(())
    }

    /// Restore a checkpoint and arrange for the next epoch to be
    /// `checkpoint.epoch + 1`.
    pub fn resume(&mut self, checkpoint_path: impl AsRef<Path>) -> Result<()> {
        assert!(
            self.phase == Phase::ModelReady,
            "resume requires setup_model to have completed"
        );

        let path = checkpoint_path.as_ref();
        println!("Loading checkpoint from: {}", path.display());
        let checkpoint = load_checkpoint(path)?;

        let info = self.model_info.as_ref().expect("model_info set in setup_model");
        checkpoint.check_compatible(info)?;

        let learner = self.learner.as_mut().expect("learner set in setup_model");
        checkpoint.learner.restore(learner.as_mut())?;

        let optimizer = self.optimizer.as_mut().expect("optimizer set in setup_model");
        optimizer.load_state(&checkpoint.optimizer)?;

        if let (Some(scheduler), Some(state)) = (self.scheduler.as_mut(), &checkpoint.scheduler) {
            scheduler.load_state(state)?;
        }

        self.state = TrainingState {
            epoch: checkpoint.epoch,
            best_val_loss: checkpoint.best_val_loss,
            train_losses: checkpoint.train_losses,
            val_losses: checkpoint.val_losses,
            learning_rates: Vec::new(),
        };
        self.start_epoch = checkpoint.epoch + 1;

        println!("Resuming training from epoch {}", self.start_epoch);
        if let Some(best) = self.state.best_val_loss {
            println!("Previous best validation loss: {best:.4}");
        }
        Ok(())
    }

    /// Run the epoch loop to the configured epoch count.
    pub fn run(&mut self) -> Result<TrainingReport> {
        assert!(
            self.phase == Phase::ModelReady,
            "run requires setup_data and setup_model to have completed"
        );

        let epochs = self.config.epochs;
        println!("\nStarting training for {epochs} epochs...");
        let run_start = Instant::now();

        for epoch in self.start_epoch..epochs {
            self.phase = Phase::Training(epoch);
            let epoch_start = Instant::now();

            let (train_loss, train_mse, train_ranking) = self.train_epoch(epoch);
            let (val_loss, val_mse, val_ranking, val_mae, val_corr) = self.validate_epoch(epoch);

            if let Some(scheduler) = self.scheduler.as_mut() {
                let optimizer = self.optimizer.as_mut().expect("optimizer present");
                scheduler.step(val_loss, optimizer.as_mut());
            }

            let lr = self.optimizer.as_ref().expect("optimizer present").lr();
            let is_best = self.state.record_epoch(epoch, train_loss, val_loss, lr);

            // Persist before the next epoch may begin; failure aborts the run.
            self.save_checkpoint(epoch, is_best)?;

            let epoch_time = epoch_start.elapsed().as_secs_f64();
            println!("\nEpoch {}/{} Summary:", epoch + 1, epochs);
            println!(
                "  Train Loss: {train_loss:.4} (MSE: {train_mse:.4}, Ranking: {train_ranking:.4})"
            );
            println!("  Val Loss:   {val_loss:.4} (MSE: {val_mse:.4}, Ranking: {val_ranking:.4})");
            println!("  Val MAE:    {val_mae:.4}");
            println!("  Val Corr:   {val_corr:.4}");
            println!("  Time:       {epoch_time:.1}s");
            println!("  LR:         {lr:.6}");
        }

        self.phase = Phase::Completed;
        let elapsed_secs = run_start.elapsed().as_secs_f64();
        println!("\nTraining completed in {:.1} minutes!", elapsed_secs / 60.0);
        if let Some(best) = self.state.best_val_loss {
            println!("Best validation loss: {best:.4}");
        }

        let history = RunHistory {
            train_losses: &self.state.train_losses,
            val_losses: &self.state.val_losses,
            learning_rates: &self.state.learning_rates,
            best_val_loss: self.state.best_val_loss,
            total_training_time: elapsed_secs,
            config: &self.config,
        };
        crate::io::write_json(
            self.output_dir.join("training_history.json"),
            &history,
            "writing training history",
        )?;

        Ok(TrainingReport {
            epochs_run: self.state.epochs_recorded(),
            final_train_loss: self.state.train_losses.last().copied().unwrap_or(0.0),
            final_val_loss: self.state.val_losses.last().copied().unwrap_or(0.0),
            best_val_loss: self.state.best_val_loss,
            elapsed_secs,
        })
    }

    /// One shuffled pass over the training source.
    fn train_epoch(&mut self, epoch: usize) -> (f32, f32, f32) {
        let data = self.data.as_ref().expect("data pipeline present");
        let learner = self.learner.as_mut().expect("learner present");
        let optimizer = self.optimizer.as_mut().expect("optimizer present");
        let clip = self.config.gradient_clip;

        let mut total_loss = 0.0;
        let mut total_mse = 0.0;
        let mut total_ranking = 0.0;
        let mut num_batches = 0usize;

        for batch in data.train.iter_epoch(epoch) {
            {
                let mut params = learner.parameters_mut();
                optimizer.zero_grad(&mut params);
            }

            let predictions = learner.forward(&batch.images);
            let breakdown = self.loss.forward(&predictions, &batch.targets);
            let grad = self.loss.backward(&predictions, &batch.targets);
            learner.backward(&grad);

            {
                let mut params = learner.parameters_mut();
                if clip > 0.0 {
                    clip_grad_norm(&mut params, clip);
                }
                optimizer.step(&mut params);
            }

            total_loss += breakdown.total;
            total_mse += breakdown.mse;
            total_ranking += breakdown.ranking;
            num_batches += 1;
        }

        if num_batches == 0 {
            return (0.0, 0.0, 0.0);
        }
        let n = num_batches as f32;
        (total_loss / n, total_mse / n, total_ranking / n)
    }

    /// One fixed-order pass over the validation source, gradients disabled.
    fn validate_epoch(&mut self, epoch: usize) -> (f32, f32, f32, f32, f32) {
        let data = self.data.as_ref().expect("data pipeline present");
        let learner = self.learner.as_ref().expect("learner present");

        let mut total_loss = 0.0;
        let mut total_mse = 0.0;
        let mut total_ranking = 0.0;
        let mut num_batches = 0usize;
        let mut all_predictions: Vec<f32> = Vec::new();
        let mut all_targets: Vec<f32> = Vec::new();

        for batch in data.val.iter_epoch(epoch) {
            let predictions = learner.forward_inference(&batch.images);
            let breakdown = self.loss.forward(&predictions, &batch.targets);

            total_loss += breakdown.total;
            total_mse += breakdown.mse;
            total_ranking += breakdown.ranking;
            num_batches += 1;

            all_predictions.extend(predictions.iter());
            all_targets.extend(batch.targets.iter());
        }

        if num_batches == 0 {
            return (0.0, 0.0, 0.0, 0.0, 0.0);
        }

        let predictions = Array1::from_vec(all_predictions);
        let targets = Array1::from_vec(all_targets);
        let mae = mean_absolute_error(&predictions, &targets);
        let corr = pearson_correlation(&predictions, &targets);

        let n = num_batches as f32;
        (total_loss / n, total_mse / n, total_ranking / n, mae, corr)
    }

    fn save_checkpoint(&mut self, epoch: usize, is_best: bool) -> Result<()> {
        let learner = self.learner.as_ref().expect("learner present");
        let optimizer = self.optimizer.as_ref().expect("optimizer present");

        let checkpoint = Checkpoint {
            epoch,
            learner: LearnerSnapshot::capture(learner.as_ref()),
            optimizer: optimizer.state(),
            scheduler: self.scheduler.as_ref().map(|s| s.state()),
            best_val_loss: self.state.best_val_loss,
            train_losses: self.state.train_losses.clone(),
            val_losses: self.state.val_losses.clone(),
            config: self.config.clone(),
            model_info: self.model_info.clone().expect("model_info present"),
        };

        save_checkpoint(&checkpoint, self.output_dir.join(LATEST_CHECKPOINT))?;
        if is_best {
            save_checkpoint(&checkpoint, self.output_dir.join(BEST_CHECKPOINT))?;
            if let Some(best) = self.state.best_val_loss {
                println!("New best model saved! Val loss: {best:.4}");
            }
        }
        Ok(())
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Accumulated run state.
    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    /// The run's output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Split summary, available after `setup_data`.
    pub fn split_summary(&self) -> Option<&SplitSummary> {
        self.data.as_ref().map(|d| &d.summary)
    }

    /// Held-out test evaluation: fixed-order pass with gradients disabled,
    /// same metrics as validation. Available once training has run.
    pub fn evaluate_test(&self) -> Option<(f32, f32, f32)> {
        let data = self.data.as_ref()?;
        let learner = self.learner.as_ref()?;

        let mut all_predictions: Vec<f32> = Vec::new();
        let mut all_targets: Vec<f32> = Vec::new();
        let mut total_loss = 0.0;
        let mut num_batches = 0usize;

        for batch in data.test.iter_epoch(0) {
            let predictions = learner.forward_inference(&batch.images);
            total_loss += self.loss.forward(&predictions, &batch.targets).total;
            num_batches += 1;
            all_predictions.extend(predictions.iter());
            all_targets.extend(batch.targets.iter());
        }
        if num_batches == 0 {
            return None;
        }

        let predictions = Array1::from_vec(all_predictions);
        let targets = Array1::from_vec(all_targets);
        Some((
            total_loss / num_batches as f32,
            mean_absolute_error(&predictions, &targets),
            pearson_correlation(&predictions, &targets),
        ))
    }

    /// Model-defining facts, available after `setup_model`.
    pub fn model_info(&self) -> Option<&ModelInfo> {
        self.model_info.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> TrainConfig {
        TrainConfig {
            csv_path: dir.path().join("ground_truth.csv"),
            images_path: dir.path().join("images"),
            output_dir: dir.path().join("outputs"),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_new_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let orchestrator = TrainingOrchestrator::new(config).unwrap();
        assert!(orchestrator.output_dir().exists());
        assert_eq!(orchestrator.phase(), Phase::Initialized);
    }

    #[test]
    #[should_panic(expected = "setup_data")]
    fn test_setup_model_before_data_panics() {
        let dir = TempDir::new().unwrap();
        let mut orchestrator = TrainingOrchestrator::new(config_in(&dir)).unwrap();
        let _ = orchestrator.setup_model();
    }

    #[test]
    #[should_panic(expected = "run requires")]
    fn test_run_before_setup_panics() {
        let dir = TempDir::new().unwrap();
        let mut orchestrator = TrainingOrchestrator::new(config_in(&dir)).unwrap();
        let _ = orchestrator.run();
    }

    #[test]
    fn test_missing_csv_is_dataset_error() {
        let dir = TempDir::new().unwrap();
        let mut orchestrator = TrainingOrchestrator::new(config_in(&dir)).unwrap();
        let err = orchestrator.setup_data().unwrap_err();
        assert!(matches!(err, crate::error::Error::Dataset { .. }));
        assert_eq!(orchestrator.phase(), Phase::Initialized);
    }
}
