//! Bootstrap of the external export toolchain.
//!
//! Clones the piper repository, checks out the streaming branch and
//! installs the python dependencies the export tool needs. Idempotent:
//! when the checkout directory already exists the whole step is skipped.

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::BootstrapError;

/// Ensure the piper checkout and its python dependencies are present.
/// Any command failing here aborts the run before a single voice is
/// processed.
pub fn ensure_toolchain(
    piper_dir: &Path,
    repo_url: &str,
    branch: &str,
) -> Result<(), BootstrapError> {
    if piper_dir.is_dir() {
        info!(path = %piper_dir.display(), "Piper checkout already present, skipping bootstrap");
        return Ok(());
    }

    info!(repo = repo_url, "Cloning piper repository");
    run(
        "git clone",
        Command::new("git").args(["clone", repo_url]).arg(piper_dir),
    )?;
    run(
        "git checkout",
        Command::new("git")
            .args(["checkout", branch])
            .current_dir(piper_dir),
    )?;

    info!("Installing piper dependencies");
    let python_dir = piper_dir.join("src").join("python");
    run(
        "pip3 install",
        Command::new("pip3")
            .args(["install", "-r", "requirements.txt"])
            .current_dir(&python_dir),
    )?;
    run(
        "build_monotonic_align",
        Command::new("bash")
            .args(["-c", "source build_monotonic_align.sh"])
            .current_dir(&python_dir),
    )?;
    // Newer torch produces better streaming exports than the pinned
    // requirements.
    run(
        "pip3 upgrade",
        Command::new("pip3").args(["install", "--upgrade", "torch", "pytorch-lightning", "onnx"]),
    )?;
    Ok(())
}

fn run(description: &str, command: &mut Command) -> Result<(), BootstrapError> {
    let status = command.status().map_err(|e| BootstrapError::Io {
        command: description.to_string(),
        source: e,
    })?;
    if !status.success() {
        return Err(BootstrapError::Exit {
            command: description.to_string(),
            status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn existing_checkout_skips_bootstrap() {
        let dir = tempdir().unwrap();
        // The directory exists, so no subprocess is ever spawned and the
        // bogus URL is never touched.
        ensure_toolchain(dir.path(), "https://invalid.example/nowhere", "streaming").unwrap();
    }

    #[test]
    fn failing_command_surfaces_as_exit_error() {
        let err = run("false", &mut Command::new("false")).unwrap_err();
        assert!(matches!(err, BootstrapError::Exit { .. }));
    }
}
