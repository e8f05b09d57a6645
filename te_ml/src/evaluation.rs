//! Test-set metrics: loss, accuracy, confusion matrix and sampled predictions.
use burn::data::dataloader::batcher::Batcher;
use burn::prelude::{Backend, ElementConversion};
use burn::train::ClassificationOutput;
use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::dataset::LabelledText;
use crate::emotion_classifier::data::{int_values, EmotionBatcher, EmotionTrainingBatch};
use crate::emotion_classifier::model::EmotionModel;
use crate::emotion_classifier::{EmotionClassifier, Prediction};
use crate::error::{InferError, LabelError};
use crate::prepare::EncodedSplit;

/// Running loss/accuracy over a sequence of batches, weighted by batch size.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationStats {
    loss_sum: f64,
    correct: usize,
    total: usize,
}

impl ClassificationStats {
    pub fn record<B: Backend>(&mut self, output: &ClassificationOutput<B>) {
        let batch_size = output.targets.dims()[0];
        let loss = output.loss.clone().into_scalar().elem::<f64>();
        let correct = output
            .output
            .clone()
            .argmax(1)
            .flatten::<1>(0, 1)
            .equal(output.targets.clone())
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        self.loss_sum += loss * batch_size as f64;
        self.correct += correct as usize;
        self.total += batch_size;
    }

    pub fn loss(&self) -> f64 {
        if self.total == 0 { f64::NAN } else { self.loss_sum / self.total as f64 }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.correct as f64 / self.total as f64 }
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Counts of true class (rows) against predicted class (columns).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        Self {
            counts: vec![vec![0; num_classes]; num_classes],
        }
    }

    pub fn from_predictions(truth: &[usize], predicted: &[usize], num_classes: usize) -> Result<Self, LabelError> {
        let mut matrix = Self::new(num_classes);
        for (&t, &p) in truth.iter().zip(predicted) {
            matrix.add(t, p)?;
        }

        Ok(matrix)
    }

    pub fn add(&mut self, truth: usize, predicted: usize) -> Result<(), LabelError> {
        let num_classes = self.num_classes();
        let out_of_range = |id| LabelError::UnknownId { id, num_classes };
        let row = self.counts.get_mut(truth).ok_or_else(|| out_of_range(truth))?;
        let cell = row.get_mut(predicted).ok_or_else(|| out_of_range(predicted))?;
        *cell += 1;

        Ok(())
    }

    pub fn num_classes(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, truth: usize, predicted: usize) -> usize {
        self.counts[truth][predicted]
    }

    /// Number of examples whose true class is `truth`.
    pub fn support(&self, truth: usize) -> usize {
        self.counts[truth].iter().sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.num_classes()).map(|i| self.counts[i][i]).sum();

        correct as f64 / total as f64
    }

    /// Each row divided by its support, so a row shows where examples of that class ended up.
    ///
    /// Rows without any examples stay all zero.
    pub fn normalized(&self) -> Vec<Vec<f64>> {
        self.counts
            .iter()
            .map(|row| {
                let support: usize = row.iter().sum();
                row.iter()
                    .map(|&c| if support == 0 { 0.0 } else { c as f64 / support as f64 })
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub loss: f64,
    pub accuracy: f64,
    pub predictions: Vec<usize>,
    pub confusion: ConfusionMatrix,
}

/// Run `model` over the whole split, in order.
#[tracing::instrument(skip_all, fields(examples = split.len()))]
pub fn evaluate<B: Backend>(
    model: &EmotionModel<B>,
    split: &EncodedSplit,
    num_classes: usize,
    batch_size: usize,
    device: &B::Device,
) -> Result<EvaluationReport, InferError> {
    let batcher = EmotionBatcher::<B>::new(device.clone());
    let mut stats = ClassificationStats::default();
    let mut predictions = Vec::with_capacity(split.len());

    for chunk in split.items.chunks(batch_size.max(1)) {
        let batch: EmotionTrainingBatch<B> = batcher.batch(chunk.to_vec());
        let output = model.forward_classification(batch.tokens, batch.labels);
        stats.record(&output);

        let predicted = int_values(output.output.argmax(1).flatten::<1>(0, 1))?;
        predictions.extend(predicted.into_iter().map(|id| id as usize));
    }

    let confusion = ConfusionMatrix::from_predictions(&split.labels(), &predictions, num_classes)?;
    tracing::info!(loss = stats.loss(), accuracy = stats.accuracy(), "Evaluated split");

    Ok(EvaluationReport {
        loss: stats.loss(),
        accuracy: stats.accuracy(),
        predictions,
        confusion,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampledPrediction {
    pub index: usize,
    pub text: String,
    pub actual: String,
    pub predicted: Prediction,
}

impl SampledPrediction {
    pub fn is_correct(&self) -> bool {
        self.actual == self.predicted.label
    }
}

/// Classify one uniformly drawn example of `split`. `None` for an empty split.
pub fn sample_prediction<B: Backend>(
    classifier: &EmotionClassifier<B>,
    split: &[LabelledText],
    rng: &mut impl Rng,
) -> Result<Option<SampledPrediction>, InferError> {
    if split.is_empty() {
        return Ok(None);
    }
    let index = rng.gen_range(0..split.len());
    let example = &split[index];
    let predicted = classifier.infer([example.text.as_str()])?.pop();

    Ok(predicted.map(|predicted| SampledPrediction {
        index,
        text: example.text.clone(),
        actual: example.label.clone(),
        predicted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_correct_single_class_is_identity_cell() {
        let matrix = ConfusionMatrix::from_predictions(&[0, 0, 0], &[0, 0, 0], 2).unwrap();
        let normalized = matrix.normalized();

        assert_eq!(normalized, vec![vec![1.0, 0.0], vec![0.0, 0.0]]);
        assert_eq!(matrix.accuracy(), 1.0);
    }

    #[test]
    fn rows_are_normalised_by_support() {
        let matrix = ConfusionMatrix::from_predictions(&[0, 0, 0, 0, 1, 2], &[0, 0, 1, 2, 1, 1], 3).unwrap();
        let normalized = matrix.normalized();

        assert_eq!(normalized[0], vec![0.5, 0.25, 0.25]);
        assert_eq!(normalized[2], vec![0.0, 1.0, 0.0]);
        assert_eq!(matrix.support(0), 4);
        assert_eq!(matrix.count(2, 1), 1);
        assert!((matrix.accuracy() - 0.5).abs() < 1e-12);
        for row in normalized {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        let err = ConfusionMatrix::from_predictions(&[0, 3], &[0, 0], 2).unwrap_err();

        assert!(matches!(err, LabelError::UnknownId { id: 3, num_classes: 2 }));
    }

    #[test]
    fn empty_stats_report_zero_accuracy() {
        let stats = ClassificationStats::default();

        assert_eq!(stats.accuracy(), 0.0);
        assert!(stats.loss().is_nan());
    }
}
