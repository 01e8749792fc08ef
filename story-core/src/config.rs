//! Engine configuration.

use crate::dispatch::GenerationSettings;
use std::path::PathBuf;
use thiserror::Error;

/// Default location of the snapshot file.
pub const DEFAULT_DATA_PATH: &str = "stories.json";

/// Errors from reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Configuration for opening a [`crate::StorySession`].
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Where the snapshot document lives.
    pub data_path: PathBuf,

    /// Model to request (defaults to the client's model).
    pub model: Option<String>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Maximum tokens per completion.
    pub max_tokens: Option<usize>,

    /// Optional JSON prompt catalog replacing the built-in one.
    pub catalog_path: Option<PathBuf>,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

impl StoryConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            model: None,
            temperature: None,
            max_tokens: None,
            catalog_path: None,
        }
    }

    /// Read configuration from the environment.
    ///
    /// - `STORY_DATA_PATH`: snapshot file (default `stories.json`)
    /// - `STORY_MODEL`: model name
    /// - `STORY_TEMPERATURE`: sampling temperature
    /// - `STORY_MAX_TOKENS`: completion token limit
    /// - `STORY_CATALOG_PATH`: prompt catalog JSON
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(get("STORY_DATA_PATH").unwrap_or_else(|| DEFAULT_DATA_PATH.into()));
        config.model = get("STORY_MODEL");
        config.catalog_path = get("STORY_CATALOG_PATH").map(PathBuf::from);

        if let Some(value) = get("STORY_TEMPERATURE") {
            let temperature = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "STORY_TEMPERATURE",
                value: value.clone(),
            })?;
            config.temperature = Some(temperature);
        }

        if let Some(value) = get("STORY_MAX_TOKENS") {
            let max_tokens = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "STORY_MAX_TOKENS",
                value: value.clone(),
            })?;
            config.max_tokens = Some(max_tokens);
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_builder() {
        let config = StoryConfig::new("/tmp/s.json")
            .with_model("gpt-4o-mini")
            .with_temperature(0.9)
            .with_max_tokens(512);

        assert_eq!(config.data_path, PathBuf::from("/tmp/s.json"));
        let settings = config.generation_settings();
        assert_eq!(settings.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(settings.temperature, Some(0.9));
        assert_eq!(settings.max_tokens, Some(512));
    }

    #[test]
    fn test_config_defaults() {
        let config = StoryConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert!(config.model.is_none());
        assert!(config.temperature.is_none());
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = StoryConfig::from_lookup(lookup(&[
            ("STORY_DATA_PATH", "saves/stories.json"),
            ("STORY_MODEL", "gpt-4o"),
            ("STORY_TEMPERATURE", " 0.7 "),
            ("STORY_MAX_TOKENS", "300"),
            ("STORY_CATALOG_PATH", ""),
        ]))
        .unwrap();

        assert_eq!(config.data_path, PathBuf::from("saves/stories.json"));
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.max_tokens, Some(300));
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_config_invalid_number() {
        let err = StoryConfig::from_lookup(lookup(&[("STORY_MAX_TOKENS", "lots")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "STORY_MAX_TOKENS",
                ..
            }
        ));
    }
}
