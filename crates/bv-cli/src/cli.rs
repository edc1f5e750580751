//! CLI configuration: `bvt.toml` (or `--config`), then `BV_*` environment
//! variables, then command-line flags.

use crate::{CliError, Result};
use bv_core::TranslationOptions;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "bvt.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CliConfig {
    pub translation: TranslationOptions,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Leave failing procedures out instead of aborting the run.
    pub skip_failures: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Boogie-like text
    #[default]
    Pretty,
    Json,
}

impl CliConfig {
    /// Load configuration from `config_path`, or from `bvt.toml` in the working
    /// directory when it exists, then apply environment overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::load_from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config.with_env_overrides())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    pub fn with_env_overrides(mut self) -> Self {
        self.translation = self.translation.with_env_overrides();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
            [translation]
            model-exceptions = 0
            jobs = 4

            [output]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.translation.model_exceptions, 0);
        assert_eq!(config.translation.jobs, 4);
        assert!(!config.translation.get_me_here);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.skip_failures);
    }

    #[test]
    fn empty_file_is_the_default() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config, CliConfig::default());
    }
}
