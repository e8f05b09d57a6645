use std::path::Path;
use burn::data::dataloader::DataLoaderBuilder;
use burn::module::AutodiffModule;
use burn::optim::AdamConfig;
use burn::prelude::{Backend, Config, Module};
use burn::record::CompactRecorder;
use burn::tensor::backend::AutodiffBackend;
use burn::train::metric::store::{Aggregate, Direction, Split};
use burn::train::metric::{AccuracyMetric, LossMetric};
use burn::train::{
    ClassificationOutput, LearnerBuilder, MetricEarlyStoppingStrategy, StoppingCondition, TrainOutput, TrainStep,
    ValidStep,
};
use eyre::{ContextCompat, WrapErr};
use crate::emotion_classifier::data::{EmotionBatcher, EmotionTrainingBatch};
use crate::emotion_classifier::model::{EmotionModel, EmotionModelConfig};
use crate::emotion_classifier::{
    save_preprocessing, CONFIG_FILE, HISTORY_FILE, LABELS_FILE, MODEL_FILE, PIPELINE_FILE, REPORT_FILE,
};
use crate::prepare::PreparedData;

pub mod history;
pub mod renderer;

pub use history::{EpochMetrics, TrainingHistory};
pub use renderer::TracingRenderer;

/// Sub-directories the learner writes its per-epoch metric logs to.
const TRAIN_LOGS: &str = "train";
const VALID_LOGS: &str = "valid";

impl<B: AutodiffBackend> TrainStep<EmotionTrainingBatch<B>, ClassificationOutput<B>> for EmotionModel<B> {
    fn step(&self, batch: EmotionTrainingBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch.tokens, batch.labels);

        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<EmotionTrainingBatch<B>, ClassificationOutput<B>> for EmotionModel<B> {
    fn step(&self, batch: EmotionTrainingBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch.tokens, batch.labels)
    }
}

#[derive(Config)]
pub struct TrainingConfig {
    pub model: EmotionModelConfig,
    pub optimizer: AdamConfig,
    #[config(default = 20)]
    pub num_epochs: usize,
    #[config(default = 32)]
    pub batch_size: usize,
    #[config(default = 1)]
    pub num_workers: usize,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = 1.0e-3)]
    pub learning_rate: f64,
    /// Epochs without validation accuracy improvement before training halts.
    #[config(default = 2)]
    pub patience: usize,
}

pub struct TrainedModel<B: AutodiffBackend> {
    /// The weights after the final epoch, on the non-autodiff backend.
    pub model: EmotionModel<B::InnerBackend>,
    pub history: TrainingHistory,
    /// Epoch at which early stopping triggered, if it did.
    pub stopped_at: Option<usize>,
}

/// Clear the output of an earlier run from `artifact_dir`, leaving anything else in place.
///
/// A non-empty directory without a [CONFIG_FILE] was not written by us and is refused.
fn prepare_artifact_dir(artifact_dir: &Path) -> eyre::Result<()> {
    if artifact_dir.exists() {
        let has_entries = std::fs::read_dir(artifact_dir)?.next().is_some();
        if has_entries && !artifact_dir.join(CONFIG_FILE).exists() {
            eyre::bail!("{artifact_dir:?} is not empty and does not hold an earlier training run, refusing to write artifacts to it");
        }

        let model_file = format!("{MODEL_FILE}.mpk");
        for file in [CONFIG_FILE, model_file.as_str(), PIPELINE_FILE, LABELS_FILE, HISTORY_FILE, REPORT_FILE] {
            remove_if_present(std::fs::remove_file(artifact_dir.join(file)))?;
        }
        for dir in [TRAIN_LOGS, VALID_LOGS] {
            remove_if_present(std::fs::remove_dir_all(artifact_dir.join(dir)))?;
        }
    }

    std::fs::create_dir_all(artifact_dir)
        .wrap_err_with(|| format!("Could not create the artifact directory {artifact_dir:?}"))
}

fn remove_if_present(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Train a fresh model on `data.train`, monitoring `data.validation` for early stopping.
///
/// Everything needed to reload the classifier is written to `artifact_dir`.
#[tracing::instrument(skip_all, fields(artifact_dir = ?artifact_dir))]
pub fn train<B: AutodiffBackend>(
    artifact_dir: &Path,
    data: &PreparedData,
    config: TrainingConfig,
    device: B::Device,
) -> eyre::Result<TrainedModel<B>> {
    prepare_artifact_dir(artifact_dir)?;
    let artifact_str = artifact_dir.to_str().context("Artifact directory is not valid UTF-8")?;
    config.save(artifact_dir.join(CONFIG_FILE))?;
    save_preprocessing(artifact_dir, &data.pipeline, &data.labels)?;

    B::seed(config.seed);

    let batcher_train = EmotionBatcher::<B>::new(device.clone());
    let batcher_valid = EmotionBatcher::<B::InnerBackend>::new(device.clone());

    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(data.train.dataset());

    let dataloader_valid = DataLoaderBuilder::new(batcher_valid)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(data.validation.dataset());

    tracing::info!(
        train = data.train.len(),
        validation = data.validation.len(),
        epochs = config.num_epochs,
        patience = config.patience,
        "Starting training"
    );

    let learner = LearnerBuilder::new(artifact_str)
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .early_stopping(MetricEarlyStoppingStrategy::new::<AccuracyMetric<B>>(
            Aggregate::Mean,
            Direction::Highest,
            Split::Valid,
            StoppingCondition::NoImprovementSince {
                n_epochs: config.patience,
            },
        ))
        .with_application_logger(None)
        .renderer(TracingRenderer::default())
        .devices(vec![device.clone()])
        .num_epochs(config.num_epochs)
        .build(
            config.model.init::<B>(&device),
            config.optimizer.init(),
            config.learning_rate,
        );

    let model_trained = learner.fit(dataloader_train, dataloader_valid);

    let history = TrainingHistory::from_metric_logs(
        &format!("{artifact_str}/{TRAIN_LOGS}"),
        &format!("{artifact_str}/{VALID_LOGS}"),
        config.num_epochs,
    )?;
    for m in &history.epochs {
        tracing::info!(
            "Epoch {:>3}/{} | loss={:.4} accuracy={:.4} | val_loss={:.4} val_accuracy={:.4}",
            m.epoch,
            config.num_epochs,
            m.train_loss,
            m.train_accuracy,
            m.valid_loss,
            m.valid_accuracy,
        );
    }
    let stopped_at = Some(history.epochs_trained()).filter(|&epochs| epochs < config.num_epochs);
    if let Some(epoch) = stopped_at {
        tracing::info!(epoch, "Validation accuracy stopped improving");
    }

    model_trained
        .clone()
        .save_file(artifact_dir.join(MODEL_FILE), &CompactRecorder::new())
        .map_err(|e| eyre::eyre!("Trained model could not be saved: {e:?}"))?;
    history.save_csv(artifact_dir.join(HISTORY_FILE))?;

    Ok(TrainedModel {
        model: model_trained.valid(),
        history,
        stopped_at,
    })
}
