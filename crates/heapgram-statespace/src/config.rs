//! Generator configuration, loadable from TOML.
//!
//! ```toml
//! exploration = "depth-first"
//! abstraction_distance = 2
//! max_states = 5000
//! ```
//!
//! Every field is optional; missing fields take their [`Default`] value.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Order in which unexplored states are taken from the worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExplorationOrder {
    #[default]
    BreadthFirst,
    DepthFirst,
}

/// Settings for one state-space generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub exploration: ExplorationOrder,
    /// Minimal number of concrete selector steps kept around variables.
    pub abstraction_distance: usize,
    /// Keep distance from constants such as `null` as well.
    pub protect_constants: bool,
    /// Fold successor heaps with the grammar.
    pub canonicalize: bool,
    /// Discard states whose heaps are included in a known state's heaps.
    pub subsumption: bool,
    /// Stop after this many states (0 = unlimited).
    pub max_states: usize,
    /// Stop once a heap grows beyond this size (0 = unlimited).
    pub max_state_size: usize,
    /// Collect aggressively abstracted final heaps.
    pub summarize_final_states: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            exploration: ExplorationOrder::BreadthFirst,
            abstraction_distance: 1,
            protect_constants: false,
            canonicalize: true,
            subsumption: false,
            max_states: 100_000,
            max_state_size: 0,
            summarize_final_states: true,
        }
    }
}

impl GeneratorConfig {
    /// Keep two concrete steps around variables and constants.
    pub fn precise() -> Self {
        Self {
            abstraction_distance: 2,
            protect_constants: true,
            ..Self::default()
        }
    }

    /// Parse and validate a configuration from TOML.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            let path = path.to_path_buf();
            match source.kind() {
                ErrorKind::NotFound => ConfigError::Missing { path },
                _ => ConfigError::Read { path, source },
            }
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings that cannot work together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subsumption && !self.canonicalize {
            return Err(ConfigError::Unsupported {
                setting: "subsumption",
                requirement: "canonicalize = true",
            });
        }
        if self.subsumption && self.abstraction_distance == 0 {
            return Err(ConfigError::Unsupported {
                setting: "subsumption",
                requirement: "abstraction_distance >= 1",
            });
        }
        Ok(())
    }
}
