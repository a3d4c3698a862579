/// Application configuration
use anyhow::{Context, Result};
use cadence_playlist::ControllerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default = "default_resume_path")]
    pub resume_path: PathBuf,

    /// JSON track list, the built-in demo catalog when unset
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub controller: ControllerConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// `path` overrides the default `cadence.toml` in the working directory.
    /// Either file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        } else if path.is_some() {
            anyhow::bail!("Config file not found: {}", config_path.display());
        }

        // Override with environment variables (CADENCE_LOG_FILTER, CADENCE_CONTROLLER__AUTOPLAY)
        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        settings
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}

fn default_log_filter() -> String {
    "cadence_playlist=info,cadence_storage=info,cadence_cli=info".to_string()
}

fn default_resume_path() -> PathBuf {
    PathBuf::from("./data/resume.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            resume_path: default_resume_path(),
            catalog_path: None,
            controller: ControllerConfig::default(),
        }
    }
}
