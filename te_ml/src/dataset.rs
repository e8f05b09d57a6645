//! Acquisition of the labelled tweet splits.
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use burn::data::dataset::{Dataset, HuggingfaceDatasetLoader, SqliteDataset};
use serde::{Deserialize, Serialize};
use crate::error::DatasetError;

/// Hugging Face identifier of the tweet emotion dataset.
pub const DEFAULT_DATASET: &str = "dair-ai/emotion";

/// Class names in the order the registry stores them as integer labels.
pub const EMOTION_NAMES: [&str; 6] = [
    "sadness",
    "joy",
    "love",
    "anger",
    "fear",
    "surprise",
];

/// Raw row as stored by the dataset registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetItem {
    pub text: String,
    pub label: usize,
}

/// A tweet with its emotion class name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelledText {
    pub text: String,
    pub label: String,
}

impl LabelledText {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

impl TryFrom<TweetItem> for LabelledText {
    type Error = DatasetError;

    fn try_from(value: TweetItem) -> Result<Self, Self::Error> {
        let label = EMOTION_NAMES.get(value.label).ok_or_else(|| DatasetError::UnknownLabel {
            label: value.label.to_string(),
        })?;

        Ok(Self::new(value.text, *label))
    }
}

/// The three pre-partitioned splits, each in dataset order.
#[derive(Debug, Clone, Default)]
pub struct EmotionSplits {
    pub train: Vec<LabelledText>,
    pub validation: Vec<LabelledText>,
    pub test: Vec<LabelledText>,
}

impl EmotionSplits {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[LabelledText])> {
        [
            ("train", self.train.as_slice()),
            ("validation", self.validation.as_slice()),
            ("test", self.test.as_slice()),
        ]
        .into_iter()
    }
}

/// Split a dataset into its texts and labels, preserving order.
pub fn get_tweets(split: &[LabelledText]) -> (Vec<&str>, Vec<&str>) {
    split.iter().map(|item| (item.text.as_str(), item.label.as_str())).unzip()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetSource {
    /// Named dataset resolved through the Hugging Face registry.
    HuggingFace { name: String },
    /// Directory containing `train.txt`, `val.txt` and `test.txt`, one `text;label` record per line.
    Local { dir: PathBuf },
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::HuggingFace {
            name: DEFAULT_DATASET.to_string(),
        }
    }
}

/// One of the three pre-partitioned splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetSplit {
    Train,
    Validation,
    Test,
}

impl DatasetSplit {
    /// Split name in the dataset registry.
    pub fn registry_name(self) -> &'static str {
        match self {
            DatasetSplit::Train => "train",
            DatasetSplit::Validation => "validation",
            DatasetSplit::Test => "test",
        }
    }

    /// File holding this split in a local dataset directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DatasetSplit::Train => "train.txt",
            DatasetSplit::Validation => "val.txt",
            DatasetSplit::Test => "test.txt",
        }
    }
}

impl DatasetSource {
    #[tracing::instrument]
    pub fn load(&self) -> Result<EmotionSplits, DatasetError> {
        let splits = EmotionSplits {
            train: self.load_split(DatasetSplit::Train)?,
            validation: self.load_split(DatasetSplit::Validation)?,
            test: self.load_split(DatasetSplit::Test)?,
        };

        for (name, split) in splits.iter() {
            tracing::debug!(split = name, records = split.len(), "Loaded split");
        }

        Ok(splits)
    }

    /// Load a single split, without touching the other two.
    pub fn load_split(&self, split: DatasetSplit) -> Result<Vec<LabelledText>, DatasetError> {
        match self {
            DatasetSource::HuggingFace { name } => load_registry_split(name, split.registry_name()),
            DatasetSource::Local { dir } => read_split_file(dir.join(split.file_name())),
        }
    }
}

fn load_registry_split(name: &str, split: &str) -> Result<Vec<LabelledText>, DatasetError> {
    fn fallible(name: &str, split: &str) -> eyre::Result<SqliteDataset<TweetItem>> {
        Ok(HuggingfaceDatasetLoader::new(name).dataset(split)?)
    }

    fallible(name, split)?.iter().map(LabelledText::try_from).collect()
}

/// Read a `text;label` file.
///
/// Blank lines are skipped, the label is everything after the *last* separator.
pub fn read_split_file(path: impl AsRef<Path> + Debug) -> Result<Vec<LabelledText>, DatasetError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    parse_split(&content, path)
}

fn parse_split(content: &str, path: &Path) -> Result<Vec<LabelledText>, DatasetError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let (text, label) = line.rsplit_once(';').ok_or_else(|| DatasetError::MalformedLine {
                path: path.to_path_buf(),
                line: i + 1,
            })?;
            let label = label.trim();
            if !EMOTION_NAMES.contains(&label) {
                return Err(DatasetError::UnknownLabel { label: label.to_string() });
            }

            Ok(LabelledText::new(text.trim(), label))
        })
        .collect()
}

/// Length and label distribution of a split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitStats {
    /// Word count -> number of texts with that count.
    pub lengths: BTreeMap<usize, usize>,
    /// Label name -> number of texts with that label.
    pub labels: BTreeMap<String, usize>,
    pub total: usize,
}

impl SplitStats {
    pub fn from_split(split: &[LabelledText]) -> Self {
        let mut stats = SplitStats::default();
        for item in split {
            // Counted on single spaces, consecutive spaces produce empty words.
            let length = item.text.split(' ').count();
            *stats.lengths.entry(length).or_default() += 1;
            *stats.labels.entry(item.label.clone()).or_default() += 1;
            stats.total += 1;
        }

        stats
    }

    pub fn max_length(&self) -> usize {
        self.lengths.keys().next_back().copied().unwrap_or_default()
    }

    /// Fraction of texts that fit in `max_len` words without truncation.
    pub fn coverage(&self, max_len: usize) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        let fitting: usize = self.lengths.range(..=max_len).map(|(_, count)| count).sum();

        fitting as f64 / self.total as f64
    }
}
