//! Per-voice export and packaging: checkpoint download, streaming export,
//! config rewrite, tar.gz packaging and upload.
//!
//! All scratch I/O happens inside a [`ScratchDir`] scope over the shared
//! working directory, which is cleared on entry and again when the scope
//! ends — success or failure. The next voice therefore always starts from
//! an empty directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::contract::{Exporter, HubClient, RepoKind};
use crate::error::{BootstrapError, ExportError, VoiceError};
use crate::voice::{rewrite_config, rt_name, Voice};

/// Scoped handle on the shared working directory. Clearing on drop is
/// best-effort: a failed cleanup is logged, never an error.
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Ensure `root` exists and is empty.
    pub fn enter(root: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(root)?;
        clear_dir(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = clear_dir(&self.root) {
            warn!(error = %e, path = %self.root.display(), "Failed to clear working directory");
        }
    }
}

fn clear_dir(root: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Run the full transform for one voice and return the derived +RT name.
///
/// Every failure in here is a [`VoiceError`]: the caller logs it and moves
/// on to the next voice. The scratch scope guarantees the working
/// directory is cleared on both the success and the failure path.
pub async fn process_voice<C, E>(
    client: &C,
    exporter: &E,
    voice: &Voice,
    config: &PipelineConfig,
) -> Result<String, VoiceError>
where
    C: HubClient + ?Sized,
    E: Exporter + ?Sized,
{
    let rt = rt_name(&voice.name)?;
    let scratch = ScratchDir::enter(&config.working_dir).map_err(|e| VoiceError::Io {
        path: config.working_dir.clone(),
        source: e,
    })?;
    let export_dir = scratch.path().join("exported");
    fs::create_dir_all(&export_dir).map_err(|e| VoiceError::Io {
        path: export_dir.clone(),
        source: e,
    })?;

    info!(voice = %voice.name, "Downloading checkpoint");
    let checkpoint_path = scratch.path().join("checkpoint.ckpt");
    client
        .download_file(&config.upstream_url(&voice.checkpoint), &checkpoint_path)
        .await?;

    info!(voice = %voice.name, "Exporting streaming model");
    exporter
        .export_streaming(&checkpoint_path, &export_dir)
        .await?;

    info!(voice = %voice.name, "Preparing config");
    let document = client
        .fetch_json(&config.upstream_url(&voice.config))
        .await?;
    let document = rewrite_config(document, &rt)?;
    let config_path = export_dir.join(format!("{rt}.json"));
    let rendered = serde_json::to_string_pretty(&document).map_err(|e| VoiceError::Render {
        name: voice.name.clone(),
        source: e,
    })?;
    fs::write(&config_path, rendered).map_err(|e| VoiceError::Io {
        path: config_path.clone(),
        source: e,
    })?;

    info!(voice = %voice.name, "Packaging voice");
    let archive_name = format!("{rt}.tar.gz");
    let archive_path = scratch.path().join(&archive_name);
    pack_flat(&export_dir, &archive_path).map_err(|e| VoiceError::Archive {
        path: archive_path.clone(),
        source: e,
    })?;

    info!(voice = %voice.name, "Uploading voice");
    client
        .upload_file(&archive_path, &archive_name, &config.rt_repo, RepoKind::Dataset)
        .await?;
    Ok(rt)
}

/// Pack every file directly inside `dir` (non-recursive) into a
/// gzip-compressed tar archive, flattening entry names to base names.
fn pack_flat(dir: &Path, archive_path: &Path) -> std::io::Result<()> {
    let file = fs::File::create(archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        builder.append_path_with_name(&path, entry.file_name())?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

/// The real streaming exporter: shells out to the piper export tool from
/// the checkout's python directory. Paths are canonicalised because the
/// tool runs with a different working directory.
pub struct PiperExporter {
    piper_dir: PathBuf,
    repo_url: String,
    branch: String,
}

impl PiperExporter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            piper_dir: config.piper_dir.clone(),
            repo_url: config.piper_repo_url.clone(),
            branch: config.piper_branch.clone(),
        }
    }

    fn script_dir(&self) -> PathBuf {
        self.piper_dir.join("src").join("python")
    }
}

#[async_trait]
impl Exporter for PiperExporter {
    async fn ensure_ready(&self) -> Result<(), BootstrapError> {
        crate::bootstrap::ensure_toolchain(&self.piper_dir, &self.repo_url, &self.branch)
    }

    async fn export_streaming(
        &self,
        checkpoint: &Path,
        export_dir: &Path,
    ) -> Result<(), ExportError> {
        let checkpoint = fs::canonicalize(checkpoint)?;
        let export_dir = fs::canonicalize(export_dir)?;
        let status = Command::new("python3")
            .args(["-m", "piper_train.export_onnx_streaming", "--debug"])
            .arg(&checkpoint)
            .arg(&export_dir)
            .current_dir(self.script_dir())
            .status()?;
        if !status.success() {
            return Err(ExportError::Exit(status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use tempfile::tempdir;

    #[test]
    fn scratch_dir_is_empty_on_entry_and_after_drop() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("stale.txt"), b"old").unwrap();

        {
            let scratch = ScratchDir::enter(dir.path()).unwrap();
            assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
            fs::write(scratch.path().join("work.bin"), b"data").unwrap();
            fs::create_dir(scratch.path().join("exported")).unwrap();
        }

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn scratch_dir_creates_missing_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("workspace");
        let scratch = ScratchDir::enter(&root).unwrap();
        assert!(scratch.path().is_dir());
    }

    #[test]
    fn pack_flat_archives_only_top_level_files_with_flat_names() {
        let dir = tempdir().unwrap();
        let export_dir = dir.path().join("exported");
        fs::create_dir(&export_dir).unwrap();
        fs::write(export_dir.join("model.onnx"), b"onnx").unwrap();
        fs::write(export_dir.join("en-amy+RT-medium.json"), b"{}").unwrap();
        fs::create_dir(export_dir.join("nested")).unwrap();
        fs::write(export_dir.join("nested").join("skipped.txt"), b"no").unwrap();

        let archive_path = dir.path().join("en-amy+RT-medium.tar.gz");
        pack_flat(&export_dir, &archive_path).unwrap();

        let mut archive =
            tar::Archive::new(GzDecoder::new(fs::File::open(&archive_path).unwrap()));
        let mut names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|entry| {
                entry
                    .unwrap()
                    .path()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["en-amy+RT-medium.json", "model.onnx"]);
    }
}
