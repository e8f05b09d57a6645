use std::fmt::Debug;
use std::path::Path;
use burn::data::dataloader::batcher::Batcher;
use burn::prelude::{Backend, Config, Module};
use burn::record::{CompactRecorder, Recorder};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use crate::CpuBackend;
use crate::emotion_classifier::data::{float_values, EmotionBatcher, EmotionInferBatch};
use crate::emotion_classifier::model::EmotionModel;
use crate::emotion_classifier::training::TrainingConfig;
use crate::error::{InferError, LoadError};
use crate::labels::LabelEncoder;
use crate::prepare::TextPipeline;

pub mod data;
pub mod model;
pub mod training;

pub const CONFIG_FILE: &str = "config.json";
pub const MODEL_FILE: &str = "model";
pub const PIPELINE_FILE: &str = "pipeline.json";
pub const LABELS_FILE: &str = "labels.json";
pub const HISTORY_FILE: &str = "history.csv";
/// Written by the command line tool after evaluating a fresh model.
pub const REPORT_FILE: &str = "report.json";

/// Classifier output for a single text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub class_id: usize,
    /// Indexed by class id.
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// The `k` most likely classes, most likely first.
    pub fn top_k<'a>(&self, labels: &'a LabelEncoder, k: usize) -> Vec<(&'a str, f32)> {
        self.probabilities
            .iter()
            .enumerate()
            .sorted_by(|a, b| b.1.total_cmp(a.1))
            .take(k)
            .filter_map(|(id, &p)| labels.decode(id).ok().map(|name| (name, p)))
            .collect()
    }
}

/// Persist the pipeline and class index next to the model weights.
pub fn save_preprocessing(artifact_dir: &Path, pipeline: &TextPipeline, labels: &LabelEncoder) -> Result<(), LoadError> {
    std::fs::write(artifact_dir.join(PIPELINE_FILE), serde_json::to_vec_pretty(pipeline)?)?;
    std::fs::write(artifact_dir.join(LABELS_FILE), serde_json::to_vec_pretty(labels)?)?;

    Ok(())
}

/// A trained model together with the frozen text pipeline and class index it was trained with.
pub struct EmotionClassifier<B: Backend = CpuBackend> {
    model: EmotionModel<B>,
    pipeline: TextPipeline,
    labels: LabelEncoder,
    batcher: EmotionBatcher<B>,
    device: B::Device,
}

impl<B: Backend> EmotionClassifier<B> {
    pub fn new(model: EmotionModel<B>, pipeline: TextPipeline, labels: LabelEncoder, device: B::Device) -> Self {
        Self {
            model,
            pipeline,
            labels,
            batcher: EmotionBatcher::new(device.clone()),
            device,
        }
    }

    /// Load a classifier from the artifact directory written by [training::train].
    #[tracing::instrument]
    pub fn load(artifact_dir: impl AsRef<Path> + Debug, device: B::Device) -> Result<Self, LoadError> {
        let artifact_dir = artifact_dir.as_ref();
        tracing::trace!("Loading emotion classifier");
        let model_path = artifact_dir.join(MODEL_FILE);
        if !model_path.with_extension("mpk").exists() {
            return Err(LoadError::ModelNotFound { path: model_path });
        }

        let config = TrainingConfig::load(artifact_dir.join(CONFIG_FILE))?;
        let record = CompactRecorder::new()
            .load(model_path, &device)
            .map_err(|e| LoadError::Record { reason: format!("{e:?}") })?;
        let model = config.model.init::<B>(&device).load_record(record);

        let pipeline = serde_json::from_slice(&std::fs::read(artifact_dir.join(PIPELINE_FILE))?)?;
        let labels = serde_json::from_slice(&std::fs::read(artifact_dir.join(LABELS_FILE))?)?;

        Ok(Self::new(model, pipeline, labels, device))
    }

    /// Classify each text in `texts`.
    ///
    /// # Arguments
    /// * `texts` - An ordered iterator, the first item in the result will match with the first text snippet in the iterator.
    #[tracing::instrument(skip_all)]
    pub fn infer<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Result<Vec<Prediction>, InferError> {
        let sequences = self.pipeline.encode_all(texts);
        if sequences.is_empty() {
            return Ok(Vec::new());
        }

        let batch: EmotionInferBatch<B> = self.batcher.batch(sequences);
        let probabilities = float_values(self.model.infer(batch))?;

        probabilities
            .chunks(self.labels.num_classes())
            .map(|row| -> Result<Prediction, InferError> {
                let (class_id, _) = row
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .ok_or(InferError::TensorData { reason: "Empty probability row".into() })?;

                Ok(Prediction {
                    label: self.labels.decode(class_id)?.to_string(),
                    class_id,
                    probabilities: row.to_vec(),
                })
            })
            .collect()
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    pub fn pipeline(&self) -> &TextPipeline {
        &self.pipeline
    }

    pub fn model(&self) -> &EmotionModel<B> {
        &self.model
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_orders_by_probability() {
        let labels = LabelEncoder::fit(["anger", "fear", "joy"]);
        let prediction = Prediction {
            label: "joy".into(),
            class_id: 2,
            probabilities: vec![0.2, 0.1, 0.7],
        };

        assert_eq!(prediction.top_k(&labels, 2), vec![("joy", 0.7), ("anger", 0.2)]);
    }
}
