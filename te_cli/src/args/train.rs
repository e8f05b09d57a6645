use std::path::{Path, PathBuf};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use te_ml::burn::backend::ndarray::NdArrayDevice;
use te_ml::burn::backend::wgpu::WgpuDevice;
use te_ml::burn::backend::Autodiff;
use te_ml::burn::optim::AdamConfig;
use te_ml::burn::tensor::backend::AutodiffBackend;
use te_ml::dataset::{DatasetSource, EmotionSplits, SplitStats};
use te_ml::emotion_classifier::model::EmotionModelConfig;
use te_ml::emotion_classifier::training::{self, TrainingConfig, TrainingHistory};
use te_ml::emotion_classifier::{EmotionClassifier, REPORT_FILE};
use te_ml::evaluation::{self, SampledPrediction};
use te_ml::prepare::PreparedData;
use te_ml::{report, CpuBackend, GpuBackend};
use crate::args::ArtifactArgs;
use crate::config::{ComputeBackend, Config, SharedConfig};

#[derive(clap::Args, Debug)]
pub struct TrainCommand {
    #[clap(flatten)]
    artifacts: ArtifactArgs,
    /// Read `train.txt`, `val.txt` and `test.txt` from this directory instead of the configured dataset.
    #[clap(long)]
    data_dir: Option<PathBuf>,
    /// Maximum number of epochs, overrides `training.epochs`.
    #[clap(long)]
    epochs: Option<usize>,
    /// Overrides `training.patience`.
    #[clap(long)]
    patience: Option<usize>,
    /// Overrides `training.seed`.
    #[clap(long)]
    seed: Option<u64>,
}

/// Summary of a full run, written next to the other artifacts.
#[derive(Serialize, Debug)]
struct RunReport<'a> {
    classes: &'a [String],
    vocab_size: usize,
    epochs_trained: usize,
    stopped_early: bool,
    history: &'a TrainingHistory,
    test_loss: f64,
    test_accuracy: f64,
    confusion: Vec<Vec<f64>>,
    sample: Option<&'a SampledPrediction>,
}

impl TrainCommand {
    #[tracing::instrument(skip_all)]
    pub fn run(self, conf: SharedConfig) -> eyre::Result<()> {
        let source = match &self.data_dir {
            Some(dir) => DatasetSource::Local { dir: dir.clone() },
            None => conf.dataset.source(),
        };
        let splits = source.load()?;
        let train_stats = SplitStats::from_split(&splits.train);
        if let Some(first) = splits.train.first() {
            tracing::info!(text = %first.text, label = %first.label, "First training example");
        }
        tracing::info!(
            longest = train_stats.max_length(),
            covered = train_stats.coverage(conf.preprocessing.shape.max_len),
            "Training split lengths"
        );

        let data = PreparedData::fit(&splits, conf.preprocessing.clone())?;
        println!("Classes: {:?}", data.labels.class_to_index());

        let training_config = self.training_config(&conf, &data);
        let artifact_dir = self.artifacts.artifact_dir(&conf);

        match self.artifacts.backend(&conf) {
            ComputeBackend::Cpu => {
                train_and_report::<Autodiff<CpuBackend>>(&artifact_dir, &splits, data, training_config, NdArrayDevice::default())
            }
            ComputeBackend::Gpu => {
                train_and_report::<Autodiff<GpuBackend>>(&artifact_dir, &splits, data, training_config, WgpuDevice::default())
            }
        }
    }

    fn training_config(&self, conf: &Config, data: &PreparedData) -> TrainingConfig {
        let settings = &conf.training;
        let model = EmotionModelConfig::new(data.pipeline.tokenizer.vocab_size(), data.labels.num_classes())
            .with_embedding_dim(settings.embedding_dim)
            .with_lstm_hidden(settings.lstm_hidden);

        TrainingConfig::new(model, AdamConfig::new())
            .with_num_epochs(self.epochs.unwrap_or(settings.epochs))
            .with_batch_size(settings.batch_size)
            .with_num_workers(settings.num_workers)
            .with_seed(self.seed.unwrap_or(settings.seed))
            .with_learning_rate(settings.learning_rate)
            .with_patience(self.patience.unwrap_or(settings.patience))
    }
}

fn train_and_report<B: AutodiffBackend>(
    artifact_dir: &Path,
    splits: &EmotionSplits,
    data: PreparedData,
    config: TrainingConfig,
    device: B::Device,
) -> eyre::Result<()> {
    let seed = config.seed;
    let batch_size = config.batch_size;
    let trained = training::train::<B>(artifact_dir, &data, config, device.clone())?;

    println!("\n{}", report::history_table(&trained.history));
    if let Some(epoch) = trained.stopped_at {
        println!("Early stopping after epoch {epoch}");
    }

    let num_classes = data.labels.num_classes();
    let test_report = evaluation::evaluate(&trained.model, &data.test, num_classes, batch_size, &device)?;
    println!("Test loss: {:.4}, test accuracy: {:.4}", test_report.loss, test_report.accuracy);

    let vocab_size = data.pipeline.tokenizer.vocab_size();
    let classifier = EmotionClassifier::new(trained.model, data.pipeline, data.labels, device);
    let mut rng = StdRng::seed_from_u64(seed);
    let sample = evaluation::sample_prediction(&classifier, &splits.test, &mut rng)?;
    if let Some(sample) = &sample {
        super::evaluate::print_sample(sample, classifier.labels());
    }

    println!("\n{}", report::confusion_matrix(&test_report.confusion, classifier.labels()));

    let run = RunReport {
        classes: classifier.labels().classes(),
        vocab_size,
        epochs_trained: trained.history.epochs_trained(),
        stopped_early: trained.stopped_at.is_some(),
        history: &trained.history,
        test_loss: test_report.loss,
        test_accuracy: test_report.accuracy,
        confusion: test_report.confusion.normalized(),
        sample: sample.as_ref(),
    };
    let report_path = artifact_dir.join(REPORT_FILE);
    std::fs::write(&report_path, serde_json::to_string_pretty(&run)?)?;

    tracing::info!(artifacts = ?artifact_dir, report = ?report_path, "Finished training run");

    Ok(())
}
