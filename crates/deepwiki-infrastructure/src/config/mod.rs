//! Configuration loading (§10.2): defaults, overlaid with an optional TOML
//! file, overlaid with `DEEPWIKI_`-prefixed environment variables.

use std::path::{Path, PathBuf};

use config::{Config as ConfigSource, Environment, File};
use deepwiki_domain::value_objects::Config;
use thiserror::Error as ThisError;
use tracing::{debug, warn};

const ENV_PREFIX: &str = "DEEPWIKI";
const DEFAULT_CONFIG_FILENAME: &str = "deepwiki.toml";

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    #[error("failed to serialize default configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Builds a `Config` from defaults, an optional file, and environment
/// overrides. Mirrors the teacher's loader shape but without its
/// multi-section validation, since this crate's config has no fields whose
/// zero value is invalid (every numeric field has a sane default already).
#[derive(Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        ConfigLoader { config_path: None }
    }

    pub fn with_config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut builder = ConfigSource::builder();

        builder = builder.add_source(File::from_str(
            &toml::to_string(&Config::default())?,
            config::FileFormat::Toml,
        ));

        match &self.config_path {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading configuration file");
                builder = builder.add_source(File::from(path.as_path()));
            }
            Some(path) => warn!(path = %path.display(), "configuration file not found, using defaults"),
            None => {
                if let Some(default_path) = Self::discover_default_path() {
                    debug!(path = %default_path.display(), "loading discovered configuration file");
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let built = builder.build()?;
        let config: Config = built.try_deserialize()?;
        validate(&config)?;
        Ok(config)
    }

    fn discover_default_path() -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        let candidates = [
            cwd.join(DEFAULT_CONFIG_FILENAME),
            cwd.join(".deepwiki").join(DEFAULT_CONFIG_FILENAME),
        ];
        candidates.into_iter().find(|p| p.exists())
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.llm_cache.ttl_seconds == 0 {
        return Err(ConfigError::Invalid("llm_cache.ttl_seconds cannot be 0".to_string()));
    }
    if config.deep_research.max_sub_questions == 0 {
        return Err(ConfigError::Invalid("deep_research.max_sub_questions cannot be 0".to_string()));
    }
    if config.chunking.class_split_threshold == 0 {
        return Err(ConfigError::Invalid("chunking.class_split_threshold cannot be 0".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_when_nothing_else_is_present() {
        let loader = ConfigLoader::new();
        let config = loader.load().expect("default config should load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn missing_explicit_path_falls_back_to_defaults() {
        let loader = ConfigLoader::new().with_config_path("/nonexistent/deepwiki.toml");
        let config = loader.load().expect("should fall back to defaults");
        assert_eq!(config.chunking.class_split_threshold, 200);
    }

    #[test]
    fn file_overrides_apply_on_top_of_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deepwiki.toml");
        std::fs::write(&path, "[chunking]\nclass_split_threshold = 50\n").unwrap();

        let loader = ConfigLoader::new().with_config_path(&path);
        let config = loader.load().unwrap();
        assert_eq!(config.chunking.class_split_threshold, 50);
        assert_eq!(config.deep_research.max_sub_questions, 4);
    }

    #[test]
    fn rejects_zero_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deepwiki.toml");
        std::fs::write(&path, "[llm_cache]\nttl_seconds = 0\n").unwrap();

        let loader = ConfigLoader::new().with_config_path(&path);
        assert!(loader.load().is_err());
    }
}
