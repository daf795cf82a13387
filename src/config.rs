use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classifier::{ModelConfig, OutputActivation};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,

    // Model artifacts
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub activation: OutputActivation,
    pub n_threads: usize,

    // Output
    pub output_format: OutputFormat,
    pub top_k: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            model_path: None,
            labels_path: None,
            activation: OutputActivation::Probabilities,
            n_threads: 1,
            output_format: OutputFormat::Table,
            top_k: None,
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            serde_json::from_str(&content)
                .context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, content)
            .context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Failed to get home directory")?;
        Ok(home.join(".speech-emotion"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }

    /// Get the default models directory
    pub fn default_models_dir() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("models"))
    }

    /// Get the classifier file path
    pub fn get_model_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.model_path {
            Ok(path.clone())
        } else {
            Ok(Self::default_models_dir()?.join(DEFAULT_MODEL_FILE))
        }
    }

    /// Get the label vocabulary path
    pub fn get_labels_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.labels_path {
            Ok(path.clone())
        } else {
            Ok(Self::default_models_dir()?.join(DEFAULT_LABELS_FILE))
        }
    }

    /// Resolve paths into a classifier load request
    pub fn model_config(&self) -> Result<ModelConfig> {
        Ok(ModelConfig {
            model_path: self.get_model_path()?,
            labels_path: self.get_labels_path()?,
            n_threads: self.n_threads,
            activation: self.activation,
        })
    }
}

const DEFAULT_MODEL_FILE: &str = "emotion.onnx";
const DEFAULT_LABELS_FILE: &str = "labels.json";

/// How predictions are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Table
    }
}
