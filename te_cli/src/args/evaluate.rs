use std::path::PathBuf;
use rand::rngs::StdRng;
use rand::SeedableRng;
use te_ml::burn::prelude::Backend;
use te_ml::dataset::{DatasetSource, DatasetSplit, LabelledText};
use te_ml::emotion_classifier::EmotionClassifier;
use te_ml::evaluation::{self, SampledPrediction};
use te_ml::labels::LabelEncoder;
use te_ml::prepare::encode_split;
use te_ml::report;
use crate::args::{with_classifier, ArtifactArgs, ClassifierTask};
use crate::config::SharedConfig;

#[derive(clap::Args, Debug)]
pub struct EvaluateCommand {
    #[clap(flatten)]
    artifacts: ArtifactArgs,
    /// Read `test.txt` from this directory instead of the configured dataset.
    #[clap(long)]
    data_dir: Option<PathBuf>,
    /// Seed for picking the sampled test example, defaults to `training.seed`.
    #[clap(long)]
    seed: Option<u64>,
}

impl EvaluateCommand {
    #[tracing::instrument(skip_all)]
    pub fn run(self, conf: SharedConfig) -> eyre::Result<()> {
        let source = match &self.data_dir {
            Some(dir) => DatasetSource::Local { dir: dir.clone() },
            None => conf.dataset.source(),
        };
        let test = source.load_split(DatasetSplit::Test)?;
        let task = TestEvaluation {
            test,
            batch_size: conf.training.batch_size,
            seed: self.seed.unwrap_or(conf.training.seed),
        };

        with_classifier(&self.artifacts, &conf, task)
    }
}

struct TestEvaluation {
    test: Vec<LabelledText>,
    batch_size: usize,
    seed: u64,
}

impl ClassifierTask for TestEvaluation {
    type Output = ();

    fn apply<B: Backend>(self, classifier: EmotionClassifier<B>) -> eyre::Result<()> {
        let labels = classifier.labels();
        let encoded = encode_split(classifier.pipeline(), labels, &self.test)?;
        let test_report = evaluation::evaluate(
            classifier.model(),
            &encoded,
            labels.num_classes(),
            self.batch_size,
            classifier.device(),
        )?;
        println!("Test loss: {:.4}, test accuracy: {:.4}", test_report.loss, test_report.accuracy);

        let mut rng = StdRng::seed_from_u64(self.seed);
        if let Some(sample) = evaluation::sample_prediction(&classifier, &self.test, &mut rng)? {
            print_sample(&sample, labels);
        }

        println!("\n{}", report::confusion_matrix(&test_report.confusion, labels));

        Ok(())
    }
}

pub fn print_sample(sample: &SampledPrediction, labels: &LabelEncoder) {
    println!("\nSentence: {}", sample.text);
    println!("Emotion: {}", sample.actual);
    println!("Predicted Emotion: {}", sample.predicted.label);
    println!("  {}", report::top_predictions(&sample.predicted, labels, 3));
}
