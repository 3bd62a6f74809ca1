//! `load_config` module: loads the YAML pipeline configuration into the
//! strongly-typed [`PipelineConfig`].
//!
//! Every field in the YAML is optional; omitted keys fall back to the
//! production defaults baked into the core config type. Secrets (the hub
//! token) never live in the file — they come from the environment at
//! wiring time.

use anyhow::Result;
use piper_rt_core::config::PipelineConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Load a YAML config file. Any failure reading or parsing surfaces as a
/// context-rich error at the CLI boundary.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    match serde_yaml::from_str::<PipelineConfig>(&content) {
        Ok(config) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(config)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}
