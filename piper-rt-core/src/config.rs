//! Pipeline configuration: repositories, URL prefixes and local paths.
//!
//! Every field has a default matching the production release setup, so a
//! bare `sync` run needs no config file at all.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upstream dataset listing trained checkpoints.
    pub checkpoints_repo: String,
    /// Destination dataset for streaming voice releases.
    pub rt_repo: String,
    /// URL prefix resolving files in the upstream dataset.
    pub checkpoints_url: String,
    /// URL prefix resolving files in the destination dataset.
    pub rt_url: String,
    /// Public catalog of standard voices, cross-referenced when deriving
    /// the streaming `voices.json`.
    pub public_catalog_url: String,
    /// Shared scratch directory. Cleared on entry and exit of every use;
    /// exactly one writer at a time.
    pub working_dir: PathBuf,
    /// Local piper checkout hosting the export tool.
    pub piper_dir: PathBuf,
    /// Repository the piper checkout is cloned from.
    pub piper_repo_url: String,
    /// Branch carrying the streaming export support.
    pub piper_branch: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checkpoints_repo: "rhasspy/piper-checkpoints".into(),
            rt_repo: "mush42/piper-rt".into(),
            checkpoints_url:
                "https://huggingface.co/datasets/rhasspy/piper-checkpoints/resolve/main".into(),
            rt_url: "https://huggingface.co/datasets/mush42/piper-rt/resolve/main".into(),
            public_catalog_url:
                "https://huggingface.co/rhasspy/piper-voices/resolve/main/voices.json".into(),
            working_dir: PathBuf::from("workspace"),
            piper_dir: PathBuf::from("piper"),
            piper_repo_url: "https://github.com/mush42/piper".into(),
            piper_branch: "streaming".into(),
        }
    }
}

impl PipelineConfig {
    /// Resolve a file path in the upstream checkpoints dataset to its URL.
    pub fn upstream_url(&self, path: &str) -> String {
        format!("{}/{}", self.checkpoints_url.trim_end_matches('/'), path)
    }

    /// Resolve a file path in the destination dataset to its URL.
    pub fn rt_file_url(&self, path: &str) -> String {
        format!("{}/{}", self.rt_url.trim_end_matches('/'), path)
    }

    /// URL of the published metadata index at the destination.
    pub fn metadata_url(&self) -> String {
        self.rt_file_url("metadata.json")
    }

    pub fn trace_loaded(&self) {
        info!(
            checkpoints_repo = %self.checkpoints_repo,
            rt_repo = %self.rt_repo,
            working_dir = %self.working_dir.display(),
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}
