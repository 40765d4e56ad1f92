//! Command handlers and the shared setup they need.

pub mod accessories;
pub mod config_cmd;
pub mod press;
pub mod remotes;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use irdeck_config::Config;
use irdeck_core::{Accessory, Bridge, FileHost};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file in effect: `--config` or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(irdeck_config::config_path)
}

/// Load config from file + environment.
pub fn load_config(global: &GlobalOpts) -> Result<(Config, PathBuf), CliError> {
    let path = config_file(global);
    let cfg = irdeck_config::load_config(Some(&path)).map_err(|e| CliError::from_config(e, &path))?;
    Ok((cfg, path))
}

/// Validate config, open the accessory cache and assemble a bridge.
///
/// Returns the cached accessories so long-running callers can restore
/// them; one-shot commands ignore them.
pub async fn connect(cfg: &Config, path: &Path) -> Result<(Bridge, Vec<Accessory>), CliError> {
    let bridge_config = cfg
        .to_bridge_config()
        .map_err(|e| CliError::from_config(e, path))?;

    let (host, cached) = FileHost::open(cfg.cache_path()).await?;
    let bridge = Bridge::connect(&bridge_config, Arc::new(host))?;
    Ok((bridge, cached))
}
