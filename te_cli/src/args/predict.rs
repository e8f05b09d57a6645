use te_ml::burn::prelude::Backend;
use te_ml::emotion_classifier::EmotionClassifier;
use te_ml::report;
use crate::args::{with_classifier, ArtifactArgs, ClassifierTask};
use crate::config::SharedConfig;

#[derive(clap::Args, Debug)]
pub struct PredictCommand {
    /// The texts to classify
    #[clap(required = true)]
    pub(super) texts: Vec<String>,
    #[clap(flatten)]
    pub(super) artifacts: ArtifactArgs,
    /// Number of classes to show per text
    #[clap(long, short, default_value_t = 3)]
    top: usize,
    /// Print the predictions as JSON lines instead
    #[clap(long)]
    json: bool,
}

impl PredictCommand {
    #[tracing::instrument(skip_all, fields(texts = self.texts.len()))]
    pub fn run(self, conf: SharedConfig) -> eyre::Result<()> {
        let artifacts = self.artifacts.clone();
        with_classifier(&artifacts, &conf, self)
    }
}

impl ClassifierTask for PredictCommand {
    type Output = ();

    fn apply<B: Backend>(self, classifier: EmotionClassifier<B>) -> eyre::Result<()> {
        let predictions = classifier.infer(self.texts.iter().map(String::as_str))?;

        for (text, prediction) in self.texts.iter().zip(&predictions) {
            if self.json {
                println!("{}", serde_json::to_string(prediction)?);
            } else {
                println!("{text}\n  -> {} ({})", prediction.label, report::top_predictions(prediction, classifier.labels(), self.top));
            }
        }

        Ok(())
    }
}
