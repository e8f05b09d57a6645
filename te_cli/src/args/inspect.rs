use std::path::PathBuf;
use itertools::Itertools;
use te_ml::dataset::{get_tweets, DatasetSource, SplitStats};
use te_ml::labels::LabelEncoder;
use te_ml::report;
use te_ml::sequence::pad_sequences;
use crate::config::SharedConfig;

#[derive(clap::Args, Debug)]
pub struct InspectCommand {
    /// Read `train.txt`, `val.txt` and `test.txt` from this directory instead of the configured dataset.
    #[clap(long)]
    data_dir: Option<PathBuf>,
    /// Number of most frequent words to list
    #[clap(long, default_value_t = 10)]
    words: usize,
    /// Number of training examples to show encoded
    #[clap(long, default_value_t = 1)]
    examples: usize,
}

impl InspectCommand {
    #[tracing::instrument(skip_all)]
    pub fn run(self, conf: SharedConfig) -> eyre::Result<()> {
        let source = match &self.data_dir {
            Some(dir) => DatasetSource::Local { dir: dir.clone() },
            None => conf.dataset.source(),
        };
        let splits = source.load()?;
        for (name, split) in splits.iter() {
            println!("{name}: {} examples", split.len());
        }

        let stats = SplitStats::from_split(&splits.train);
        let max_len = conf.preprocessing.shape.max_len;
        println!("\n{}", report::histogram("Words per training tweet", stats.lengths.iter().map(|(len, count)| (len, *count))));
        println!(
            "Longest tweet: {} words, {:.1}% fit in {max_len} tokens",
            stats.max_length(),
            stats.coverage(max_len) * 100.0
        );
        println!("\n{}", report::histogram("Training labels", stats.labels.iter().map(|(label, count)| (label, *count))));

        let (texts, labels) = get_tweets(&splits.train);
        let tokenizer = conf.preprocessing.tokenizer.clone().fit(texts.iter().copied());
        println!(
            "Vocabulary: {} distinct words, embedding table of {}",
            tokenizer.num_distinct_words(),
            tokenizer.vocab_size()
        );
        println!(
            "Most frequent: {}",
            tokenizer.most_frequent(self.words).map(|(word, id)| format!("{word}={id}")).join(", ")
        );

        let encoded = tokenizer.texts_to_sequences(texts.iter().copied().take(self.examples));
        let padded = pad_sequences(&encoded, &conf.preprocessing.shape);
        for ((text, tokens), padded) in texts.iter().zip(&encoded).zip(&padded) {
            println!("\n{text}\n  tokens: {tokens:?}\n  padded: {padded:?}");
        }

        let classes = LabelEncoder::fit(labels);
        println!("\nClass index: {:?}", classes.class_to_index());

        Ok(())
    }
}
