//! Server configuration

use crate::cli::Cli;
use newscheck_classifiers::{ArtifactFiles, DeviceType, PatternCategory, PatternTaxonomy};
use newscheck_core::{DEFAULT_ABSTAIN_THRESHOLD, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory holding the exported model artifacts
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Artifact file names inside `artifacts_dir`
    #[serde(default)]
    pub artifact_files: ArtifactFiles,

    /// Scores strictly below this are flagged as abstentions
    #[serde(default = "default_abstain_threshold")]
    pub abstain_threshold: f64,

    /// Terms returned by the explain endpoint
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Shortest accepted input text, in characters
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    /// Extracted URL text is truncated to this many characters
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    #[serde(default)]
    pub fetch: FetchConfig,

    /// JSON-lines prediction log
    #[serde(default = "default_prediction_log")]
    pub prediction_log: PathBuf,

    /// Warm both model stacks at startup
    #[serde(default)]
    pub preload: bool,

    /// Encoder device: cpu, cuda[:N], mps
    #[serde(default = "default_device")]
    pub device: String,

    /// Replaces the built-in news taxonomy when set
    #[serde(default)]
    pub patterns: Option<Vec<PatternCategory>>,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(artifacts) = &cli.artifacts {
            config.artifacts_dir = artifacts.clone();
        }

        if let Some(log) = &cli.prediction_log {
            config.prediction_log = log.clone();
        }

        if let Some(device) = &cli.device {
            config.device = device.clone();
        }

        if cli.preload {
            config.preload = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the handlers cannot honour
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.abstain_threshold) {
            anyhow::bail!("abstain_threshold must be within [0, 1], got {}", self.abstain_threshold);
        }
        if self.min_text_chars > self.max_text_chars {
            anyhow::bail!(
                "min_text_chars ({}) exceeds max_text_chars ({})",
                self.min_text_chars,
                self.max_text_chars
            );
        }
        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be positive");
        }
        self.device_type()?;
        Ok(())
    }

    pub fn device_type(&self) -> anyhow::Result<DeviceType> {
        Ok(self.device.parse()?)
    }

    /// Configured taxonomy, or the built-in news taxonomy
    pub fn taxonomy(&self) -> PatternTaxonomy {
        match &self.patterns {
            Some(categories) => PatternTaxonomy::new(categories.clone()),
            None => PatternTaxonomy::news(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            artifact_files: ArtifactFiles::default(),
            abstain_threshold: default_abstain_threshold(),
            top_k: default_top_k(),
            min_text_chars: default_min_text_chars(),
            max_text_chars: default_max_text_chars(),
            fetch: FetchConfig::default(),
            prediction_log: default_prediction_log(),
            preload: false,
            device: default_device(),
            patterns: None,
        }
    }
}

/// Outbound HTTP settings for URL text extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

fn default_abstain_threshold() -> f64 {
    DEFAULT_ABSTAIN_THRESHOLD
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_min_text_chars() -> usize {
    30
}

fn default_max_text_chars() -> usize {
    20_000
}

fn default_prediction_log() -> PathBuf {
    PathBuf::from("./data/predictions.jsonl")
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_timeout_secs() -> u64 {
    12
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.abstain_threshold, 0.55);
        assert_eq!(config.top_k, 8);
        assert_eq!(config.min_text_chars, 30);
        assert_eq!(config.max_text_chars, 20_000);
        assert_eq!(config.fetch.timeout_secs, 12);
        assert_eq!(config.fetch.user_agent, "Mozilla/5.0");
        assert_eq!(config.artifact_files.lexical_pipeline, "model.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: ServerConfig = serde_yaml::from_str(
            r#"
artifacts_dir: /srv/newscheck
abstain_threshold: 0.6
fetch:
  timeout_secs: 5
patterns:
  - name: deporte
    keywords: [fútbol, partido]
"#,
        )
        .unwrap();

        assert_eq!(config.artifacts_dir, PathBuf::from("/srv/newscheck"));
        assert_eq!(config.abstain_threshold, 0.6);
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.fetch.user_agent, "Mozilla/5.0");
        assert_eq!(config.top_k, 8);
        assert_eq!(config.taxonomy().categories()[0].name, "deporte");
    }

    #[test]
    fn test_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "artifacts_dir: /from/file\ndevice: cpu\n").unwrap();

        let cli = Cli {
            artifacts: Some(PathBuf::from("/from/cli")),
            device: Some("cuda:1".to_string()),
            preload: true,
            ..Cli::default()
        };
        let config = ServerConfig::load(path.to_str().unwrap(), &cli).unwrap();

        assert_eq!(config.artifacts_dir, PathBuf::from("/from/cli"));
        assert_eq!(config.device_type().unwrap(), DeviceType::Cuda(1));
        assert!(config.preload);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load("/nonexistent/newscheck.yaml", &Cli::default()).unwrap();
        assert_eq!(config.artifacts_dir, PathBuf::from("./artifacts"));
    }

    #[test]
    fn test_validation() {
        let config = ServerConfig {
            abstain_threshold: 1.5,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            min_text_chars: 100,
            max_text_chars: 50,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            device: "tpu".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
