use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_SOURCE: &str = "/cdevents-cli";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProducerConfig {
    /// Default `context.source` for constructed events
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

impl CliConfig {
    /// Load config from file and environment variables
    /// Environment variables take precedence over file config
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Override fields from `CDEVENTS_*` variables resolved through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(source) = lookup("CDEVENTS_SOURCE") {
            self.producer.source = Some(source);
        }
        if let Some(pretty) = lookup("CDEVENTS_PRETTY") {
            self.output.pretty = matches!(pretty.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CDEVENTS_CONFIG") {
            return PathBuf::from(path);
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".cdevents/config.toml")
    }

    /// Get event source, with fallback
    pub fn source(&self) -> &str {
        self.producer.source.as_deref().unwrap_or(DEFAULT_SOURCE)
    }

    pub fn pretty(&self) -> bool {
        self.output.pretty
    }
}
