use crate::constants::DEFAULT_STREAMING_SLOTS;
use crate::error::{CostError, Result};
use crate::pricing::{PricingEntry, PricingTable};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV_VAR: &str = "CONVO_COST_CONFIG";

// On-disk layout
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    pricing: Vec<PricingEntry>,
    #[serde(default)]
    streaming_slots: Option<usize>,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub pricing: PricingTable,
    pub streaming_slots: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pricing: PricingTable::builtin(),
            streaming_slots: DEFAULT_STREAMING_SLOTS,
        }
    }
}

impl Config {
    /// Load from `$CONVO_COST_CONFIG`, else `~/.config/convo-cost/config.json`,
    /// else fall back to defaults
    pub fn load() -> Result<Self> {
        let path = config_path(env::var(CONFIG_ENV_VAR).ok(), home::home_dir());
        match path {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("no config file found, using built-in pricing");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CostError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&content).map_err(|source| CostError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), overrides = file.pricing.len(), "loaded config");
        Self::from_config_file(file)
    }

    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut pricing = PricingTable::builtin();
        for entry in file.pricing {
            pricing.set(entry)?;
        }

        let streaming_slots = file.streaming_slots.unwrap_or(DEFAULT_STREAMING_SLOTS);
        if streaming_slots == 0 {
            return Err(CostError::NoStreamingSlots);
        }

        Ok(Self {
            pricing,
            streaming_slots,
        })
    }
}

/// An explicit path always wins; the home config is used only if it exists
fn config_path(explicit: Option<String>, home: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    home.map(|h| h.join(".config").join("convo-cost").join("config.json"))
        .filter(|p| p.exists())
}
