//! # contract: interfaces to the pipeline's external collaborators
//!
//! The core drives two opaque capabilities: the hub hosting the upstream
//! and destination dataset repositories ([`HubClient`]) and the streaming
//! export toolchain ([`Exporter`]). Both are async traits implemented by
//! real clients ([`crate::hub::HfHubClient`], [`crate::export::PiperExporter`])
//! and by `mockall` mocks in tests.
//!
//! The concrete client is constructed once at the CLI boundary and passed
//! by reference into every component that needs it; nothing in the core
//! holds ambient global state.

use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{BootstrapError, ExportError, HubError};
use crate::voice::Voice;

/// Kind of hub repository addressed by an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    Dataset,
    Model,
}

impl RepoKind {
    /// Path segment used by the hub HTTP API.
    pub fn api_segment(self) -> &'static str {
        match self {
            RepoKind::Dataset => "datasets",
            RepoKind::Model => "models",
        }
    }
}

/// Client for the dataset hub: listing, per-file metadata, JSON documents,
/// blob transfer and overwrite-uploads.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HubClient: Send + Sync {
    /// Flat listing of all file paths in a dataset repository.
    async fn list_repo_files(&self, repo_id: &str) -> Result<Vec<String>, HubError>;

    /// Content fingerprint for a remote file, from a metadata-only request.
    async fn file_etag(&self, url: &str) -> Result<String, HubError>;

    /// Fetch a JSON document.
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, HubError>;

    /// Fetch the published voice index. `None` means nothing has been
    /// published yet, which callers treat as an empty baseline.
    async fn fetch_published_index(&self, url: &str) -> Result<Option<Vec<Voice>>, HubError>;

    /// Stream a remote file to `dest` without buffering it in memory.
    async fn download_file(&self, url: &str, dest: &Path) -> Result<(), HubError>;

    /// Overwrite-upload a local file into a hub repository.
    async fn upload_file(
        &self,
        local: &Path,
        path_in_repo: &str,
        repo_id: &str,
        repo_kind: RepoKind,
    ) -> Result<(), HubError>;
}

/// The opaque streaming-export capability.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Make sure the export toolchain is installed and usable. Called once
    /// per run, before any voice is processed; failure aborts the run.
    async fn ensure_ready(&self) -> Result<(), BootstrapError>;

    /// Export one checkpoint into streaming-capable model files under
    /// `export_dir`. Success is defined by the tool's exit status alone.
    async fn export_streaming(
        &self,
        checkpoint: &Path,
        export_dir: &Path,
    ) -> Result<(), ExportError>;
}
