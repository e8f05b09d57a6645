use std::fmt::Debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use te_ml::dataset::{DatasetSource, DEFAULT_DATASET};
use te_ml::prepare::PrepareConfig;

pub type SharedConfig = Arc<Config>;

static CONFIG_FILE: &str = "tweet_emotion.toml";
static ENV_PREFIX: &str = "TWEET_EMOTION";

pub fn get_app_dirs() -> eyre::Result<AppDirs> {
    AppDirs::new(Some("TweetEmotion"), false).ok_or_else(|| eyre::eyre!("Couldn't find a home directory for config!"))
}

/// Initialise the config file.
///
/// Creates a new config file if it doesn't yet exist, otherwise loads the existing one.
pub fn initialise_config() -> eyre::Result<Config> {
    let c_path = get_full_config_path()?;

    if !c_path.exists() {
        save_config(&Config::initial()?, &c_path)?;
    }

    load_config(&c_path)
}

/// Load the config at `path`, with environment variables (`TWEET_EMOTION__TRAINING__EPOCHS=5`) taking precedence.
pub fn load_config(path: impl AsRef<Path> + Debug) -> eyre::Result<Config> {
    let c = config::Config::builder()
        .add_source(config::File::from(path.as_ref()).required(true))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    Ok(c.try_deserialize()?)
}

/// Save the provided config to `path`, creating the parent directory if needed.
pub fn save_config(app_settings: &Config, path: &Path) -> eyre::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut config_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    let basic_output = toml::to_string_pretty(app_settings)?;

    config_file.write_all(basic_output.as_bytes())?;

    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Where the labelled tweets come from
    pub dataset: DatasetConfig,
    /// Tokenizer and sequence shaping
    pub preprocessing: PrepareConfig,
    /// Model and optimisation settings
    pub training: TrainingSettings,
    /// All directory related configs
    pub dirs: DirectoryConfig,
}

impl Config {
    /// Default settings, with directories under the platform's app directories.
    pub fn initial() -> eyre::Result<Self> {
        Ok(Self::with_dirs(&get_app_dirs()?))
    }

    fn with_dirs(dirs: &AppDirs) -> Self {
        Self {
            dataset: DatasetConfig::default(),
            preprocessing: PrepareConfig::default(),
            training: TrainingSettings::default(),
            dirs: DirectoryConfig::new(dirs),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DatasetConfig {
    /// Hugging Face dataset identifier, used when `local_dir` is not set.
    pub huggingface: String,
    /// Directory with `train.txt`, `val.txt` and `test.txt` in `text;label` format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<PathBuf>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            huggingface: DEFAULT_DATASET.to_string(),
            local_dir: None,
        }
    }
}

impl DatasetConfig {
    pub fn source(&self) -> DatasetSource {
        match &self.local_dir {
            Some(dir) => DatasetSource::Local { dir: dir.clone() },
            None => DatasetSource::HuggingFace {
                name: self.huggingface.clone(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ComputeBackend {
    #[default]
    Cpu,
    Gpu,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TrainingSettings {
    pub backend: ComputeBackend,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Epochs without validation accuracy improvement before stopping.
    pub patience: usize,
    pub seed: u64,
    pub num_workers: usize,
    pub embedding_dim: usize,
    pub lstm_hidden: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            backend: ComputeBackend::Cpu,
            epochs: 20,
            batch_size: 32,
            learning_rate: 1.0e-3,
            patience: 2,
            seed: 42,
            num_workers: 1,
            embedding_dim: 16,
            lstm_hidden: 20,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DirectoryConfig {
    /// Directory containing appdata managed by the application, namely trained models.
    pub appdata: PathBuf,
}

impl DirectoryConfig {
    fn new(dirs: &AppDirs) -> Self {
        Self {
            appdata: dirs.data_dir.join("appdata"),
        }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.appdata.join("emotion_classifier")
    }
}

/// Retrieve the *full* path to the config file.
///
/// This is just [get_config_directory] + [CONFIG_FILE]
pub fn get_full_config_path() -> eyre::Result<PathBuf> {
    Ok(get_config_directory()?.join(CONFIG_FILE))
}

/// Retrieve the directory which will be used to locate/save the config file.
pub fn get_config_directory() -> eyre::Result<PathBuf> {
    Ok(get_app_dirs()?.config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_dirs(root: &Path) -> AppDirs {
        AppDirs {
            cache_dir: root.join("cache"),
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            state_dir: root.join("state"),
        }
    }

    #[test]
    fn initial_config_has_training_defaults() {
        let root = Path::new("/tmp/tweet_emotion");
        let conf = Config::with_dirs(&app_dirs(root));

        assert_eq!(conf.training.epochs, 20);
        assert_eq!(conf.training.patience, 2);
        assert_eq!(conf.preprocessing.shape.max_len, 50);
        assert_eq!(conf.dataset.source(), DatasetSource::default());
        assert_eq!(conf.dirs.artifact_path(), root.join("data").join("appdata").join("emotion_classifier"));
    }

    #[test]
    fn saved_config_loads_back() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        let mut conf = Config::with_dirs(&app_dirs(dir.path()));
        conf.training.epochs = 3;
        conf.dataset.local_dir = Some(dir.path().join("data"));

        save_config(&conf, &path)?;
        let loaded = load_config(&path)?;

        assert_eq!(loaded.training.epochs, 3);
        assert_eq!(loaded.preprocessing, conf.preprocessing);
        assert_eq!(loaded.dataset.source(), DatasetSource::Local { dir: dir.path().join("data") });
        Ok(())
    }
}
