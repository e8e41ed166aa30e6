//! Engine configuration

use crate::query::executor::OrderingStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config text is not valid YAML for [`EngineConfig`]
    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by every query created from an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Join ordering strategy
    pub ordering: OrderingStrategy,
    /// Pre-declare rdf, rdfs, xsd and owl
    pub builtin_prefixes: bool,
    /// Log constraint type mismatches
    pub verbose: bool,
    /// Base IRI used when a query declares none
    pub base_uri: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ordering: OrderingStrategy::default(),
            builtin_prefixes: true,
            verbose: false,
            base_uri: None,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
