//! Configuration loading.
//!
//! Settings are layered, lowest priority first:
//! - built-in defaults
//! - a YAML config file (`--config`, `FAQBOT_CONFIG`, `./faqbot.yaml`, or
//!   `<config dir>/faqbot/config.yaml`)
//! - environment variables
//! - command-line flags (see [`AppConfig::with_overrides`])

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Question/answer dataset, `.csv` or `.json`
    pub dataset: PathBuf,

    /// Address the HTTP server binds to
    pub bind: String,

    /// Log filter, e.g. "info" or "faqbot=debug"
    pub log_level: Option<String>,

    pub no_color: bool,

    /// Return entities found in queries alongside answers
    pub extract_entities: bool,

    pub speech: SpeechConfig,

    pub tts: SpeakerConfig,
}

/// Speech-to-text service settings. No endpoint means recognition is off.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub endpoint: Option<String>,
    /// Environment variable holding the service's bearer token
    pub api_key_env: Option<String>,
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: None,
            language: "en-US".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Text-to-speech settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeakerConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "espeak".to_string(),
            args: Vec::new(),
        }
    }
}

/// On-disk layout of the YAML file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    dataset: Option<PathBuf>,
    extract_entities: Option<bool>,
    server: Option<ServerSection>,
    speech: Option<SpeechConfig>,
    tts: Option<SpeakerConfig>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    bind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data.csv"),
            bind: "127.0.0.1:5000".to_string(),
            log_level: None,
            no_color: false,
            extract_entities: true,
            speech: SpeechConfig::default(),
            tts: SpeakerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load defaults, then the config file, then environment variables.
    ///
    /// An explicitly named config file must exist; the fallback locations
    /// are only read when present.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let explicit = config_file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("FAQBOT_CONFIG").map(PathBuf::from));

        let mut config = Self::default();
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "config file does not exist: {:?}",
                        path
                    )));
                }
                config = config.merge_yaml(&path)?;
            }
            None => {
                if let Some(path) = Self::default_config_paths().into_iter().find(|p| p.exists()) {
                    config = config.merge_yaml(&path)?;
                }
            }
        }

        if let Ok(dataset) = std::env::var("FAQBOT_DATASET") {
            config.dataset = PathBuf::from(dataset);
        }
        if let Ok(bind) = std::env::var("FAQBOT_BIND") {
            config.bind = bind;
        }
        if let Ok(endpoint) = std::env::var("FAQBOT_SPEECH_ENDPOINT") {
            config.speech.endpoint = Some(endpoint);
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }
        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("faqbot.yaml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("faqbot").join("config.yaml"));
        }
        paths
    }

    /// Merge a YAML config file into this config.
    fn merge_yaml(mut self, path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {:?}: {}", path, e))
        })?;
        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            Error::Config(format!("failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(dataset) = file.dataset {
            self.dataset = dataset;
        }
        if let Some(extract) = file.extract_entities {
            self.extract_entities = extract;
        }
        if let Some(bind) = file.server.and_then(|s| s.bind) {
            self.bind = bind;
        }
        if let Some(speech) = file.speech {
            self.speech = speech;
        }
        if let Some(tts) = file.tts {
            self.tts = tts;
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        tracing::debug!(path = ?path, "merged config file");
        Ok(self)
    }

    /// Apply command-line flags, which take precedence over everything else.
    pub fn with_overrides(
        mut self,
        dataset: Option<PathBuf>,
        bind: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(dataset) = dataset {
            self.dataset = dataset;
        }
        if let Some(bind) = bind {
            self.bind = bind;
        }
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }
        if verbose && self.log_level.is_none() {
            self.log_level = Some("debug".to_string());
        }
        if no_color {
            self.no_color = true;
        }
        self
    }
}
