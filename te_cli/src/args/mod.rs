use std::path::PathBuf;
use te_ml::burn::backend::ndarray::NdArrayDevice;
use te_ml::burn::backend::wgpu::WgpuDevice;
use te_ml::emotion_classifier::EmotionClassifier;
use te_ml::{CpuBackend, GpuBackend};
use crate::args::evaluate::EvaluateCommand;
use crate::args::inspect::InspectCommand;
use crate::args::predict::PredictCommand;
use crate::args::train::TrainCommand;
use crate::config::{ComputeBackend, Config};

pub mod evaluate;
pub mod inspect;
pub mod predict;
pub mod train;

#[derive(clap::Parser, Debug)]
#[clap(version, about)]
pub struct ClapArgs {
    /// Use this config file instead of the one in the platform config directory.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub commands: SubCommands,
}

#[derive(clap::Subcommand, Debug)]
pub enum SubCommands {
    /// Fit the tokenizer and label encoder, train the classifier, and report on the test split
    #[clap(alias = "t")]
    Train(TrainCommand),
    /// Re-evaluate previously trained artifacts on the test split
    #[clap(alias = "e")]
    Evaluate(EvaluateCommand),
    /// Classify the given texts with previously trained artifacts
    #[clap(arg_required_else_help(true))]
    #[clap(alias = "p")]
    Predict(PredictCommand),
    /// Show length and label distributions of the dataset, and a preview of the vocabulary
    #[clap(alias = "i")]
    Inspect(InspectCommand),
}

/// Options shared by every command that reads or writes trained artifacts.
#[derive(clap::Args, Debug, Clone)]
pub struct ArtifactArgs {
    /// Directory holding the model, tokenizer and labels. Defaults to the app data directory.
    #[clap(long)]
    pub artifacts: Option<PathBuf>,
    /// Compute backend, overrides `training.backend`.
    #[clap(long, value_enum)]
    pub backend: Option<ComputeBackend>,
}

impl ArtifactArgs {
    pub fn artifact_dir(&self, conf: &Config) -> PathBuf {
        self.artifacts.clone().unwrap_or_else(|| conf.dirs.artifact_path())
    }

    pub fn backend(&self, conf: &Config) -> ComputeBackend {
        self.backend.unwrap_or(conf.training.backend)
    }
}

/// Anything that can run against a loaded classifier, regardless of backend.
pub trait ClassifierTask {
    type Output;

    fn apply<B: te_ml::burn::prelude::Backend>(self, classifier: EmotionClassifier<B>) -> eyre::Result<Self::Output>;
}

/// Load the classifier in `artifacts` on the requested backend and hand it to `task`.
pub fn with_classifier<T: ClassifierTask>(artifacts: &ArtifactArgs, conf: &Config, task: T) -> eyre::Result<T::Output> {
    let dir = artifacts.artifact_dir(conf);
    tracing::debug!(?dir, "Loading classifier");

    match artifacts.backend(conf) {
        ComputeBackend::Cpu => task.apply(EmotionClassifier::<CpuBackend>::load(&dir, NdArrayDevice::default())?),
        ComputeBackend::Gpu => task.apply(EmotionClassifier::<GpuBackend>::load(&dir, WgpuDevice::default())?),
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        ClapArgs::command().debug_assert();
    }

    #[test]
    fn backend_flag_overrides_config() {
        let args = ClapArgs::parse_from(["tweet_emotion", "predict", "i am thrilled", "--backend", "gpu"]);
        let SubCommands::Predict(predict) = args.commands else {
            panic!("Expected the predict command");
        };

        assert_eq!(predict.artifacts.backend, Some(ComputeBackend::Gpu));
        assert_eq!(predict.texts, vec!["i am thrilled".to_string()]);
    }
}
