//! Freezing the vocabulary and class index on the train split and encoding every split with them.
use burn::data::dataset::InMemDataset;
use serde::{Deserialize, Serialize};
use crate::dataset::{EmotionSplits, LabelledText};
use crate::emotion_classifier::data::EmotionItem;
use crate::error::PrepareError;
use crate::labels::LabelEncoder;
use crate::sequence::SequenceShape;
use crate::tokenizer::{TokenizerConfig, TweetTokenizer, OOV_ID};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub tokenizer: TokenizerConfig,
    pub shape: SequenceShape,
}

/// Text to fixed-length ids: the fitted tokenizer followed by the sequence shaper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPipeline {
    pub tokenizer: TweetTokenizer,
    pub shape: SequenceShape,
}

impl TextPipeline {
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.shape.apply(&self.tokenizer.encode(text))
    }

    pub fn encode_all<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Vec<Vec<u32>> {
        texts.into_iter().map(|text| self.encode(text)).collect()
    }
}

/// One split after encoding. `texts[i]` is the source of `items[i]`.
#[derive(Debug, Clone, Default)]
pub struct EncodedSplit {
    pub texts: Vec<String>,
    pub items: Vec<EmotionItem>,
}

impl EncodedSplit {
    pub fn labels(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.label).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fraction of non-padding tokens which fell outside the vocabulary.
    pub fn oov_rate(&self) -> f64 {
        let (oov, total) = self
            .items
            .iter()
            .flat_map(|item| &item.tokens)
            .filter(|&&id| id != crate::tokenizer::PADDING_ID)
            .fold((0usize, 0usize), |(oov, total), &id| (oov + usize::from(id == OOV_ID), total + 1));

        if total == 0 { 0.0 } else { oov as f64 / total as f64 }
    }

    pub fn dataset(&self) -> InMemDataset<EmotionItem> {
        InMemDataset::new(self.items.clone())
    }
}

pub struct PreparedData {
    pub pipeline: TextPipeline,
    pub labels: LabelEncoder,
    pub train: EncodedSplit,
    pub validation: EncodedSplit,
    pub test: EncodedSplit,
}

impl PreparedData {
    /// Fit on `splits.train` only, then encode all three splits with the frozen result.
    #[tracing::instrument(skip_all)]
    pub fn fit(splits: &EmotionSplits, config: PrepareConfig) -> Result<Self, PrepareError> {
        if config.shape.max_len == 0 {
            return Err(PrepareError::EmptySequenceShape);
        }
        if config.tokenizer.num_words < 2 {
            return Err(PrepareError::VocabularyTooSmall {
                num_words: config.tokenizer.num_words,
            });
        }

        let tokenizer = config.tokenizer.fit(splits.train.iter().map(|item| item.text.as_str()));
        let labels = LabelEncoder::fit(splits.train.iter().map(|item| item.label.as_str()));
        let pipeline = TextPipeline {
            tokenizer,
            shape: config.shape,
        };

        let prepared = Self {
            train: encode_split(&pipeline, &labels, &splits.train)?,
            validation: encode_split(&pipeline, &labels, &splits.validation)?,
            test: encode_split(&pipeline, &labels, &splits.test)?,
            pipeline,
            labels,
        };

        tracing::info!(
            vocab_size = prepared.pipeline.tokenizer.vocab_size(),
            classes = ?prepared.labels.class_to_index(),
            validation_oov = prepared.validation.oov_rate(),
            "Prepared splits"
        );

        Ok(prepared)
    }
}

pub fn encode_split(pipeline: &TextPipeline, labels: &LabelEncoder, split: &[LabelledText]) -> Result<EncodedSplit, PrepareError> {
    let items = split
        .iter()
        .map(|item| -> Result<EmotionItem, PrepareError> {
            Ok(EmotionItem {
                tokens: pipeline.encode(&item.text),
                label: labels.encode(&item.label)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EncodedSplit {
        texts: split.iter().map(|item| item.text.clone()).collect(),
        items,
    })
}
