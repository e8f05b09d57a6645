use burn::backend::Autodiff;
use burn::optim::AdamConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use te_ml::CpuBackend;
use te_ml::dataset::{DatasetSource, DatasetSplit, EmotionSplits};
use te_ml::emotion_classifier::EmotionClassifier;
use te_ml::emotion_classifier::model::EmotionModelConfig;
use te_ml::emotion_classifier::training::{self, TrainingConfig};
use te_ml::error::LoadError;
use te_ml::evaluation;
use te_ml::prepare::{encode_split, PrepareConfig, PreparedData};
use te_ml::sequence::SequenceShape;
use te_ml::tokenizer::TokenizerConfig;

const TRAIN: &str = "\
i feel so happy and cheerful today;joy
what a wonderful joyful morning;joy
i am delighted with the result;joy
i feel miserable and alone;sadness
everything feels hopeless and sad;sadness
i cried all night long;sadness
this makes me so angry;anger
i am furious at the delay;anger
stop annoying me right now;anger
";
const VAL: &str = "\
happy cheerful morning;joy
sad and alone;sadness
furious and angry;anger
";
const TEST: &str = "\
a joyful happy day;joy
hopeless night;sadness
angry at everything;anger
so delighted;joy
";

fn write_dataset(dir: &std::path::Path) -> eyre::Result<EmotionSplits> {
    std::fs::write(dir.join("train.txt"), TRAIN)?;
    std::fs::write(dir.join("val.txt"), VAL)?;
    std::fs::write(dir.join("test.txt"), TEST)?;

    Ok(DatasetSource::Local { dir: dir.to_path_buf() }.load()?)
}

fn small_config(data: &PreparedData, epochs: usize) -> TrainingConfig {
    let model = EmotionModelConfig::new(data.pipeline.tokenizer.vocab_size(), data.labels.num_classes())
        .with_embedding_dim(8)
        .with_lstm_hidden(6);

    TrainingConfig::new(model, AdamConfig::new())
        .with_num_epochs(epochs)
        .with_batch_size(4)
        .with_patience(2)
}

fn prepare(splits: &EmotionSplits) -> eyre::Result<PreparedData> {
    let config = PrepareConfig {
        tokenizer: TokenizerConfig {
            num_words: 40,
            ..Default::default()
        },
        shape: SequenceShape::new(8),
    };

    Ok(PreparedData::fit(splits, config)?)
}

#[test]
#[tracing_test::traced_test]
fn trains_saves_and_reloads() -> eyre::Result<()> {
    let data_dir = tempfile::tempdir()?;
    let artifact_dir = tempfile::tempdir()?;
    let splits = write_dataset(data_dir.path())?;
    let data = prepare(&splits)?;

    assert_eq!(data.labels.classes(), ["anger", "joy", "sadness"]);
    assert!(data.train.items.iter().all(|item| item.tokens.len() == 8));

    let trained = training::train::<Autodiff<CpuBackend>>(artifact_dir.path(), &data, small_config(&data, 3), Default::default())?;

    let epochs = trained.history.epochs_trained();
    assert!((1..=3).contains(&epochs));
    assert!(trained.history.epochs.iter().all(|m| m.train_loss.is_finite()));
    for file in ["config.json", "model.mpk", "pipeline.json", "labels.json", "history.csv"] {
        assert!(artifact_dir.path().join(file).exists(), "{file} missing");
    }

    let report = evaluation::evaluate(&trained.model, &data.test, data.labels.num_classes(), 2, &Default::default())?;
    assert_eq!(report.predictions.len(), data.test.len());
    assert_eq!(report.confusion.total(), data.test.len());
    assert!((report.confusion.accuracy() - report.accuracy).abs() < 1e-9);
    assert!(report.predictions.iter().all(|&p| p < 3));

    let classifier = EmotionClassifier::<CpuBackend>::load(artifact_dir.path(), Default::default())?;
    assert_eq!(classifier.labels(), &data.labels);

    let predictions = classifier.infer(["what a happy day", "i am so angry"])?;
    assert_eq!(predictions.len(), 2);
    for prediction in &predictions {
        assert!(data.labels.encode(&prediction.label).is_ok());
        assert!((prediction.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-3);
    }
    assert!(classifier.infer(std::iter::empty())?.is_empty());

    // A directory with only the test split is enough to re-evaluate stored artifacts
    let test_only = tempfile::tempdir()?;
    std::fs::write(test_only.path().join("test.txt"), TEST)?;
    let test = DatasetSource::Local { dir: test_only.path().to_path_buf() }.load_split(DatasetSplit::Test)?;
    let encoded = encode_split(classifier.pipeline(), classifier.labels(), &test)?;
    let reloaded = evaluation::evaluate(classifier.model(), &encoded, classifier.labels().num_classes(), 2, classifier.device())?;
    assert_eq!(reloaded.confusion.total(), 4);
    assert!((0.0..=1.0).contains(&reloaded.accuracy));

    let mut rng = StdRng::seed_from_u64(7);
    let sample = evaluation::sample_prediction(&classifier, &splits.test, &mut rng)?.expect("Test split is not empty");
    assert_eq!(splits.test[sample.index].text, sample.text);
    assert_eq!(splits.test[sample.index].label, sample.actual);

    Ok(())
}

#[test]
fn retraining_keeps_unrelated_files() -> eyre::Result<()> {
    let data_dir = tempfile::tempdir()?;
    let artifact_dir = tempfile::tempdir()?;
    let data = prepare(&write_dataset(data_dir.path())?)?;

    training::train::<Autodiff<CpuBackend>>(artifact_dir.path(), &data, small_config(&data, 1), Default::default())?;
    std::fs::write(artifact_dir.path().join("notes.txt"), "keep me")?;
    let trained = training::train::<Autodiff<CpuBackend>>(artifact_dir.path(), &data, small_config(&data, 1), Default::default())?;

    assert_eq!(trained.history.epochs_trained(), 1);
    assert_eq!(std::fs::read_to_string(artifact_dir.path().join("notes.txt"))?, "keep me");
    assert!(artifact_dir.path().join("model.mpk").exists());
    Ok(())
}

#[test]
fn training_refuses_a_directory_it_did_not_create() -> eyre::Result<()> {
    let data_dir = tempfile::tempdir()?;
    let artifact_dir = tempfile::tempdir()?;
    let data = prepare(&write_dataset(data_dir.path())?)?;
    std::fs::write(artifact_dir.path().join("thesis.txt"), "months of work")?;

    let result = training::train::<Autodiff<CpuBackend>>(artifact_dir.path(), &data, small_config(&data, 1), Default::default());

    assert!(result.is_err());
    assert_eq!(std::fs::read_to_string(artifact_dir.path().join("thesis.txt"))?, "months of work");
    assert!(!artifact_dir.path().join("config.json").exists());
    Ok(())
}

#[test]
fn loading_without_a_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = EmotionClassifier::<CpuBackend>::load(dir.path(), Default::default());

    assert!(matches!(result, Err(LoadError::ModelNotFound { .. })));
}
