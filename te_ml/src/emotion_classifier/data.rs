use burn::data::dataloader::batcher::Batcher;
use burn::prelude::{Backend, Int, Tensor, TensorData};
use serde::{Deserialize, Serialize};
use crate::error::InferError;

#[derive(Clone)]
pub struct EmotionBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> EmotionBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self {
            device,
        }
    }
}

/// A padded token sequence with its encoded class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionItem {
    pub tokens: Vec<u32>,
    pub label: usize,
}

#[derive(Clone, Debug)]
pub struct EmotionTrainingBatch<B: Backend> {
    /// Token ids, `[batch_size, seq_len]`
    pub tokens: Tensor<B, 2, Int>,
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct EmotionInferBatch<B: Backend> {
    pub tokens: Tensor<B, 2, Int>,
}

impl<B: Backend> Batcher<EmotionItem, EmotionTrainingBatch<B>> for EmotionBatcher<B> {
    fn batch(&self, items: Vec<EmotionItem>) -> EmotionTrainingBatch<B> {
        let labels = items.iter().map(|item| item.label as i64).collect::<Vec<_>>();
        let labels_len = labels.len();
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [labels_len]).convert::<B::IntElem>(),
            &self.device,
        );
        let tokens = tokens_to_tensor(items.iter().map(|item| item.tokens.as_slice()), &self.device);

        EmotionTrainingBatch { tokens, labels }
    }
}

impl<B: Backend> Batcher<Vec<u32>, EmotionInferBatch<B>> for EmotionBatcher<B> {
    fn batch(&self, items: Vec<Vec<u32>>) -> EmotionInferBatch<B> {
        let tokens = tokens_to_tensor(items.iter().map(Vec::as_slice), &self.device);

        EmotionInferBatch { tokens }
    }
}

/// Stack equally long token rows into a `[rows, seq_len]` tensor.
pub fn tokens_to_tensor<'a, B: Backend>(rows: impl IntoIterator<Item = &'a [u32]>, device: &B::Device) -> Tensor<B, 2, Int> {
    let mut seq_len = 0;
    let mut batch_size = 0;
    let mut flat = Vec::new();
    for row in rows {
        seq_len = row.len();
        batch_size += 1;
        flat.extend(row.iter().map(|&id| id as i64));
    }
    debug_assert_eq!(flat.len(), seq_len * batch_size, "Token rows must be padded to equal length");

    let data = TensorData::new(flat, [batch_size, seq_len]).convert::<B::IntElem>();
    Tensor::<B, 2, Int>::from_data(data, device)
}

pub(crate) fn float_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, InferError> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| InferError::TensorData { reason: format!("{e:?}") })
}

pub(crate) fn int_values<B: Backend, const D: usize>(tensor: Tensor<B, D, Int>) -> Result<Vec<i64>, InferError> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| InferError::TensorData { reason: format!("{e:?}") })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackend;

    #[test]
    fn batches_tokens_and_labels() {
        let batcher = EmotionBatcher::<CpuBackend>::new(Default::default());
        let batch: EmotionTrainingBatch<CpuBackend> = batcher.batch(vec![
            EmotionItem { tokens: vec![2, 3, 0], label: 1 },
            EmotionItem { tokens: vec![4, 0, 0], label: 5 },
        ]);

        assert_eq!(batch.tokens.dims(), [2, 3]);
        assert_eq!(int_values(batch.labels).unwrap(), vec![1, 5]);
        assert_eq!(int_values(batch.tokens).unwrap(), vec![2, 3, 0, 4, 0, 0]);
    }
}
