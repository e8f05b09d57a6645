use serde::{Deserialize, Serialize};
use crate::tokenizer::PADDING_ID;

/// Which end of a sequence gets cut or filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Pre,
    #[default]
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceShape {
    pub max_len: usize,
    pub padding: Side,
    pub truncating: Side,
    /// Filler id for padded positions.
    pub value: u32,
}

impl Default for SequenceShape {
    fn default() -> Self {
        Self {
            max_len: 50,
            padding: Side::Post,
            truncating: Side::Post,
            value: PADDING_ID,
        }
    }
}

impl SequenceShape {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            ..Default::default()
        }
    }

    /// Force `sequence` to exactly `max_len` ids.
    pub fn apply(&self, sequence: &[u32]) -> Vec<u32> {
        let kept = if sequence.len() > self.max_len {
            match self.truncating {
                Side::Post => &sequence[..self.max_len],
                Side::Pre => &sequence[sequence.len() - self.max_len..],
            }
        } else {
            sequence
        };
        let filler = std::iter::repeat_n(self.value, self.max_len - kept.len());

        match self.padding {
            Side::Post => kept.iter().copied().chain(filler).collect(),
            Side::Pre => filler.chain(kept.iter().copied()).collect(),
        }
    }
}

pub fn pad_sequences(sequences: &[Vec<u32>], shape: &SequenceShape) -> Vec<Vec<u32>> {
    sequences.iter().map(|seq| shape.apply(seq)).collect()
}
