//! FILENAME: core/hypercube/src/config.rs
//! Pager tuning, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HyperCubeError, HyperCubeResult};
use crate::log_info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    /// Height of the full-width window used when streaming all rows.
    pub default_page_height: usize,
    /// Upper bound on width x height for windows the pager builds itself.
    pub max_page_cells: usize,
    /// Row cap of `Pager::collect_rows`.
    pub max_collected_rows: usize,
}

impl Default for PagerConfig {
    fn default() -> Self {
        PagerConfig {
            default_page_height: 10,
            max_page_cells: 10_000,
            max_collected_rows: 100_000,
        }
    }
}

impl PagerConfig {
    pub fn from_json_str(json: &str) -> HyperCubeResult<Self> {
        let config: PagerConfig = serde_json::from_str(json)
            .map_err(|e| HyperCubeError::Config(format!("malformed pager config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> HyperCubeResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            HyperCubeError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json_str(&json)?;
        log_info!("CONFIG", "loaded pager config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> HyperCubeResult<()> {
        if self.default_page_height == 0 {
            return Err(HyperCubeError::Config(
                "default_page_height must be positive".to_string(),
            ));
        }
        if self.max_page_cells == 0 {
            return Err(HyperCubeError::Config(
                "max_page_cells must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
