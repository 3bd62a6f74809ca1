//! Error types for the pipeline.
//!
//! The split matters: [`VoiceError`] is the skip-and-continue class caught
//! at the per-voice processing boundary, while [`PipelineError`] aborts the
//! whole run. Everything the driver can hit outside the voice loop
//! (bootstrap, discovery, delta baseline fetch, final publication) converts
//! into [`PipelineError`].

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors from the hub client (listing, metadata, transfer, commits).
#[derive(Debug, Error)]
pub enum HubError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: reqwest::Error,
    },

    #[error("no etag header in response from {url}")]
    MissingEtag { url: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors from invoking the streaming export tool.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to run export tool: {0}")]
    Io(#[from] std::io::Error),

    #[error("export tool exited with {0}")]
    Exit(ExitStatus),
}

/// Errors from bootstrapping the export toolchain.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to run {command}: {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Exit { command: String, status: ExitStatus },
}

/// A failure confined to one voice. Caught at the processing loop; the
/// voice is logged and skipped, the run continues.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice name {name:?} is not language-name-quality")]
    InvalidName { name: String },

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("config document for {name} is not a JSON object")]
    ConfigShape { name: String },

    #[error("failed to render config for {name}: {source}")]
    Render {
        name: String,
        source: serde_json::Error,
    },

    #[error("failed to build archive {path}: {source}")]
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A failure that aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("the public voices catalog is not a JSON object")]
    CatalogShape,

    #[error("failed to serialise index document: {0}")]
    Serialise(#[from] serde_json::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
