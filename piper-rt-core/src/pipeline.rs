//! High-level pipeline: bootstrap → discovery → delta → per-voice
//! export/publish → index republication.
//!
//! This module owns the run state machine. Transitions are strictly
//! forward; the only state carried between runs is what sits in the
//! destination repository (`metadata.json`, `voices.json` and the voice
//! archives).
//!
//! # Failure model
//! - Errors inside the per-voice loop are [`VoiceError`]s: logged with
//!   full context, the voice is skipped, the run continues.
//! - Everything else ([`PipelineError`]) aborts the run.
//!
//! # What gets republished
//! The new index records every discovered voice that was either already
//! in the previous index or successfully exported in this run. A voice
//! whose transform failed is left out, so the next run picks it up as new
//! again. `voices.json` is derived from the same recorded set.
//!
//! # Callable from
//! The CLI crate and the integration tests; both inject the collaborators
//! through the [`HubClient`] and [`Exporter`] traits.
//!
//! [`VoiceError`]: crate::error::VoiceError

use std::fs;

use tracing::{error, info};

use crate::catalog::build_rt_catalog;
use crate::config::PipelineConfig;
use crate::contract::{Exporter, HubClient, RepoKind};
use crate::delta::resolve_delta;
use crate::discover::discover_voices;
use crate::error::PipelineError;
use crate::export::{process_voice, ScratchDir};
use crate::voice::Voice;

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Voices found upstream.
    pub discovered: usize,
    /// Subset not yet published.
    pub new: usize,
    /// Names of voices exported and uploaded in this run.
    pub published: Vec<String>,
    /// Names of voices that failed and will be retried next run.
    pub failed: Vec<String>,
}

/// Run the full pipeline once.
pub async fn run<C, E>(
    config: &PipelineConfig,
    client: &C,
    exporter: &E,
) -> Result<RunReport, PipelineError>
where
    C: HubClient + ?Sized,
    E: Exporter + ?Sized,
{
    info!("Starting voice synchronisation pipeline");

    exporter.ensure_ready().await?;

    let discovered = discover_voices(client, config).await?;

    let baseline = match client.fetch_published_index(&config.metadata_url()).await? {
        Some(index) => index,
        None => {
            info!("No existing metadata file. Starting from scratch...");
            Vec::new()
        }
    };
    let new_voices = resolve_delta(&discovered, &baseline);
    info!(count = new_voices.len(), "Found new voices");

    let mut succeeded: Vec<Voice> = Vec::new();
    let mut failed: Vec<String> = Vec::new();
    for voice in &new_voices {
        info!(voice = %voice.name, "Processing voice");
        match process_voice(client, exporter, voice, config).await {
            Ok(rt) => {
                info!(voice = %voice.name, package = %rt, "Voice published");
                succeeded.push(voice.clone());
            }
            Err(e) => {
                error!(voice = %voice.name, error = %e, "Failed to export and package voice");
                failed.push(voice.name.clone());
            }
        }
    }

    let recorded = recorded_index(&discovered, &baseline, &succeeded);
    publish_index(client, config, &recorded).await?;

    info!(
        published = succeeded.len(),
        failed = failed.len(),
        "Process done"
    );
    Ok(RunReport {
        discovered: discovered.len(),
        new: new_voices.len(),
        published: succeeded.into_iter().map(|v| v.name).collect(),
        failed,
    })
}

/// The index to republish: discovered voices that were already published,
/// plus this run's successes, in discovery order. Failed voices stay out;
/// voices that vanished upstream drop out with them.
fn recorded_index(discovered: &[Voice], baseline: &[Voice], succeeded: &[Voice]) -> Vec<Voice> {
    discovered
        .iter()
        .filter(|voice| {
            baseline.iter().any(|p| p.same_artifact(voice))
                || succeeded.iter().any(|s| s.same_artifact(voice))
        })
        .cloned()
        .collect()
}

/// Serialise and upload `metadata.json`, then derive and upload the
/// public streaming catalog. Runs whether or not any voice failed.
async fn publish_index<C>(
    client: &C,
    config: &PipelineConfig,
    recorded: &[Voice],
) -> Result<(), PipelineError>
where
    C: HubClient + ?Sized,
{
    let scratch = ScratchDir::enter(&config.working_dir).map_err(|e| PipelineError::Io {
        path: config.working_dir.clone(),
        source: e,
    })?;

    info!(count = recorded.len(), "Dumping voice metadata");
    let metadata_path = scratch.path().join("metadata.json");
    fs::write(&metadata_path, serde_json::to_string_pretty(recorded)?).map_err(|e| {
        PipelineError::Io {
            path: metadata_path.clone(),
            source: e,
        }
    })?;
    client
        .upload_file(&metadata_path, "metadata.json", &config.rt_repo, RepoKind::Dataset)
        .await?;

    let public = client.fetch_json(&config.public_catalog_url).await?;
    let catalog = build_rt_catalog(&public, recorded)?;
    let voices_path = scratch.path().join("voices.json");
    fs::write(&voices_path, serde_json::to_string_pretty(&catalog)?).map_err(|e| {
        PipelineError::Io {
            path: voices_path.clone(),
            source: e,
        }
    })?;
    client
        .upload_file(&voices_path, "voices.json", &config.rt_repo, RepoKind::Dataset)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, etag: &str) -> Voice {
        Voice {
            name: name.into(),
            config: format!("c/{name}/config.json"),
            checkpoint: format!("c/{name}/epoch=1.ckpt"),
            etag: etag.into(),
        }
    }

    #[test]
    fn recorded_index_keeps_baseline_and_successes_only() {
        let discovered = vec![voice("a-a-a", "1"), voice("b-b-b", "1"), voice("c-c-c", "1")];
        let baseline = vec![voice("a-a-a", "1")];
        let succeeded = vec![voice("c-c-c", "1")];
        let recorded = recorded_index(&discovered, &baseline, &succeeded);
        assert_eq!(
            recorded.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
            vec!["a-a-a", "c-c-c"]
        );
    }

    #[test]
    fn recorded_index_drops_voices_gone_from_upstream() {
        let discovered = vec![voice("a-a-a", "1")];
        let baseline = vec![voice("a-a-a", "1"), voice("gone-gone-gone", "1")];
        let recorded = recorded_index(&discovered, &baseline, &[]);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].name, "a-a-a");
    }

    #[test]
    fn recorded_index_prefers_fresh_etag_over_stale_baseline() {
        let discovered = vec![voice("a-a-a", "2")];
        let baseline = vec![voice("a-a-a", "1")];
        let succeeded = vec![voice("a-a-a", "2")];
        let recorded = recorded_index(&discovered, &baseline, &succeeded);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].etag, "2");
    }
}
