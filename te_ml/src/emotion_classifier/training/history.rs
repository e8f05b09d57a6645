use std::io::Write;
use std::path::Path;
use burn::train::logger::{FileMetricLogger, MetricLogger};
use burn::train::metric::NumericEntry;
use serde::{Deserialize, Serialize};

const CSV_HEADER: &str = "epoch,train_loss,train_accuracy,valid_loss,valid_accuracy";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub valid_loss: f64,
    pub valid_accuracy: f64,
}

/// Per-epoch training and validation curves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn epochs_trained(&self) -> usize {
        self.epochs.len()
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    pub fn best_valid_accuracy(&self) -> Option<&EpochMetrics> {
        self.epochs
            .iter()
            .max_by(|a, b| a.valid_accuracy.total_cmp(&b.valid_accuracy))
    }

    pub fn write_csv(&self, mut writer: impl Write) -> std::io::Result<()> {
        writeln!(writer, "{CSV_HEADER}")?;
        for m in &self.epochs {
            writeln!(
                writer,
                "{},{:.6},{:.6},{:.6},{:.6}",
                m.epoch, m.train_loss, m.train_accuracy, m.valid_loss, m.valid_accuracy
            )?;
        }

        Ok(())
    }

    /// Rebuild the curves from the per-batch metric logs the learner wrote under `train_dir` and `valid_dir`.
    ///
    /// Reading stops at the first epoch without validation logs, which is where early stopping ended the run.
    pub fn from_metric_logs(train_dir: &str, valid_dir: &str, max_epochs: usize) -> eyre::Result<Self> {
        let mut train = FileMetricLogger::new(train_dir);
        let mut valid = FileMetricLogger::new(valid_dir);
        let mut history = TrainingHistory::default();

        for epoch in 1..=max_epochs {
            let Some(valid_accuracy) = read_epoch_mean(&mut valid, ACCURACY, epoch) else {
                break;
            };
            let metrics = EpochMetrics {
                epoch,
                train_loss: read_epoch_mean(&mut train, LOSS, epoch).unwrap_or(f64::NAN),
                train_accuracy: read_epoch_mean(&mut train, ACCURACY, epoch).unwrap_or(f64::NAN),
                valid_loss: read_epoch_mean(&mut valid, LOSS, epoch).unwrap_or(f64::NAN),
                valid_accuracy,
            };
            history.push(metrics);
        }

        if history.epochs.is_empty() {
            eyre::bail!("No metric logs found in {valid_dir:?}");
        }

        Ok(history)
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write_csv(file)
    }
}

/// Names the learner logs [burn::train::metric::AccuracyMetric] and [burn::train::metric::LossMetric] under.
pub(crate) const ACCURACY: &str = "Accuracy";
pub(crate) const LOSS: &str = "Loss";

fn read_epoch_mean(logger: &mut FileMetricLogger, metric: &str, epoch: usize) -> Option<f64> {
    let entries = logger.read_numeric(metric, epoch).ok()?;
    epoch_mean(&entries)
}

/// Batch-size weighted mean of one epoch's logged values, matching burn's `Aggregate::Mean` for aggregated entries.
pub(crate) fn epoch_mean(entries: &[NumericEntry]) -> Option<f64> {
    let (sum, count) = entries.iter().fold((0.0, 0usize), |(sum, count), entry| match entry {
        NumericEntry::Value(value) => (sum + value, count + 1),
        NumericEntry::Aggregated(value, items) => (sum + value * *items as f64, count + items),
    });

    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, valid_accuracy: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 1.0 / epoch as f64,
            train_accuracy: 0.5,
            valid_loss: 0.9,
            valid_accuracy,
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_epoch() {
        let mut history = TrainingHistory::default();
        history.push(metrics(1, 0.4));
        history.push(metrics(2, 0.6));

        let mut out = Vec::new();
        history.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[2], "2,0.500000,0.500000,0.900000,0.600000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn epoch_mean_weights_batches_by_size() {
        let entries = [NumericEntry::Aggregated(1.0, 3), NumericEntry::Aggregated(0.0, 1)];

        assert_eq!(epoch_mean(&entries), Some(0.75));
        assert_eq!(epoch_mean(&[NumericEntry::Value(0.5), NumericEntry::Value(1.0)]), Some(0.75));
        assert_eq!(epoch_mean(&[]), None);
    }

    #[test]
    fn missing_logs_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy();

        assert!(TrainingHistory::from_metric_logs(&format!("{root}/train"), &format!("{root}/valid"), 3).is_err());
    }

    #[test]
    fn best_epoch_by_validation_accuracy() {
        let mut history = TrainingHistory::default();
        for (epoch, acc) in [(1, 0.3), (2, 0.8), (3, 0.7)] {
            history.push(metrics(epoch, acc));
        }

        assert_eq!(history.best_valid_accuracy().map(|m| m.epoch), Some(2));
        assert_eq!(history.epochs_trained(), 3);
    }
}
