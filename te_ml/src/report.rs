//! Terminal renderings of the training curves, dataset histograms and the confusion matrix.
use std::fmt::Write;
use itertools::Itertools;
use crate::emotion_classifier::Prediction;
use crate::emotion_classifier::training::TrainingHistory;
use crate::evaluation::ConfusionMatrix;
use crate::labels::LabelEncoder;

const BAR_WIDTH: usize = 40;
/// Top-left cell of the confusion matrix grid.
const CORNER: &str = "true\\pred";

/// Accuracy and loss curves as one row per epoch.
pub fn history_table(history: &TrainingHistory) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} | {:>9} {:>9} | {:>9} {:>9}",
        "epoch", "accuracy", "val_acc", "loss", "val_loss"
    );
    let _ = writeln!(out, "{}", "-".repeat(49));
    for m in &history.epochs {
        let _ = writeln!(
            out,
            "{:>5} | {:>9.4} {:>9.4} | {:>9.4} {:>9.4}",
            m.epoch, m.train_accuracy, m.valid_accuracy, m.train_loss, m.valid_loss
        );
    }

    out
}

/// Horizontal bar chart, bars scaled to the largest bucket.
pub fn histogram<K: std::fmt::Display>(title: &str, buckets: impl IntoIterator<Item = (K, usize)>) -> String {
    let buckets = buckets.into_iter().map(|(k, v)| (k.to_string(), v)).collect_vec();
    let max = buckets.iter().map(|(_, v)| *v).max().unwrap_or_default().max(1);
    let key_width = buckets.iter().map(|(k, _)| k.len()).max().unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    for (key, count) in buckets {
        let bar = "#".repeat(count * BAR_WIDTH / max);
        let _ = writeln!(out, "{key:>key_width$} | {bar} {count}");
    }

    out
}

/// Row-normalised confusion matrix, true classes down the side and predicted classes across the top.
pub fn confusion_matrix(matrix: &ConfusionMatrix, labels: &LabelEncoder) -> String {
    let names = labels.classes();
    let width = names.iter().map(String::len).max().unwrap_or_default().max(CORNER.len());

    let mut out = String::new();
    let _ = write!(out, "{CORNER:>width$} |");
    for name in names {
        let _ = write!(out, " {name:>width$}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "-".repeat((width + 1) * (names.len() + 1) + 1));

    for (name, row) in names.iter().zip(matrix.normalized()) {
        let _ = write!(out, "{name:>width$} |");
        for value in row {
            let _ = write!(out, " {value:>width$.2}");
        }
        let _ = writeln!(out);
    }

    out
}

pub fn top_predictions(prediction: &Prediction, labels: &LabelEncoder, k: usize) -> String {
    prediction
        .top_k(labels, k)
        .into_iter()
        .map(|(name, p)| format!("{name}: {:.1}%", p * 100.0))
        .join(", ")
}
