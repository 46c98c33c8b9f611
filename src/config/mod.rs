//! Weight configuration: the versioned policy table and how it is located.
//!
//! Resolution order:
//! 1. an explicit path (CLI `--weights`)
//! 2. `RIFT_WEIGHTS` from the environment (a `.env` file is honoured)
//! 3. the built-in demo table

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::RiskError;

pub mod weights;

pub use weights::*;

/// Environment variable naming a weight config file.
pub const WEIGHTS_ENV: &str = "RIFT_WEIGHTS";

/// Resolve and validate the weight config for this run.
pub fn load_weight_config(explicit: Option<&Path>) -> Result<WeightConfig, RiskError> {
    dotenvy::dotenv().ok();

    let path: Option<PathBuf> = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => std::env::var_os(WEIGHTS_ENV).map(PathBuf::from),
    };

    let config = match path {
        Some(p) => {
            debug!(path = %p.display(), "loading weight config");
            WeightConfig::from_path(&p)?
        }
        None => {
            let config = WeightConfig::default();
            config.validate()?;
            config
        }
    };

    info!(name = %config.name, version = %config.version, "weight config ready");
    Ok(config)
}
