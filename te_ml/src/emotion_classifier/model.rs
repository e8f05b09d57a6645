use burn::config::Config;
use burn::module::Module;
use burn::nn::{BiLstm, BiLstmConfig, Embedding, EmbeddingConfig, Linear, LinearConfig};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::{Backend, Int, Tensor};
use burn::tensor::activation::softmax;
use burn::train::ClassificationOutput;
use crate::emotion_classifier::data::EmotionInferBatch;

#[derive(Module, Debug)]
pub struct EmotionModel<B: Backend> {
    embedding: Embedding<B>,
    /// Emits a state for every token.
    sequence_encoder: BiLstm<B>,
    /// Only its summary of the whole sequence is used.
    summary_encoder: BiLstm<B>,
    classifier: Linear<B>,
}

#[derive(Config, Debug)]
pub struct EmotionModelConfig {
    /// Number of rows in the embedding table, see [crate::tokenizer::TweetTokenizer::vocab_size].
    vocab_size: usize,
    /// Number of output classes
    num_classes: usize,
    #[config(default = 16)]
    embedding_dim: usize,
    /// Hidden size of a single direction of each recurrent layer.
    #[config(default = 20)]
    lstm_hidden: usize,
}

impl EmotionModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EmotionModel<B> {
        EmotionModel {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            sequence_encoder: BiLstmConfig::new(self.embedding_dim, self.lstm_hidden, true).init(device),
            summary_encoder: BiLstmConfig::new(2 * self.lstm_hidden, self.lstm_hidden, true).init(device),
            classifier: LinearConfig::new(2 * self.lstm_hidden, self.num_classes).init(device),
        }
    }
}

impl<B: Backend> EmotionModel<B> {
    /// # Shapes
    ///   - Tokens [batch_size, seq_len]
    ///   - Output [batch_size, num_classes], unnormalised logits
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let x = self.embedding.forward(tokens);
        let (x, _) = self.sequence_encoder.forward(x, None);
        let (x, _) = self.summary_encoder.forward(x, None);

        // Forward direction is summarised by its last step, the backward direction by its first.
        let [batch_size, seq_len, width] = x.dims();
        let hidden = width / 2;
        let forward_last = x.clone().slice([0..batch_size, seq_len - 1..seq_len, 0..hidden]);
        let backward_first = x.slice([0..batch_size, 0..1, hidden..width]);
        let summary = Tensor::cat(vec![forward_last, backward_first], 2).reshape([batch_size, width]);

        self.classifier.forward(summary)
    }

    pub fn forward_classification(&self, tokens: Tensor<B, 2, Int>, targets: Tensor<B, 1, Int>) -> ClassificationOutput<B> {
        let logits = self.forward(tokens);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets.clone());

        ClassificationOutput::new(loss, logits, targets)
    }

    /// Class probabilities for every row of the batch.
    pub fn infer(&self, batch: EmotionInferBatch<B>) -> Tensor<B, 2> {
        softmax(self.forward(batch.tokens), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CpuBackend;
    use crate::emotion_classifier::data::{float_values, tokens_to_tensor};

    #[test]
    fn produces_one_distribution_per_row() {
        let device = Default::default();
        let model = EmotionModelConfig::new(12, 6).with_lstm_hidden(4).init::<CpuBackend>(&device);
        let tokens: Tensor<CpuBackend, 2, Int> =
            tokens_to_tensor([[2u32, 5, 0, 0].as_slice(), [11, 1, 3, 0].as_slice()], &device);

        let probs = model.infer(EmotionInferBatch { tokens });
        assert_eq!(probs.dims(), [2, 6]);

        let values = float_values(probs).unwrap();
        for row in values.chunks(6) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        }
    }
}
