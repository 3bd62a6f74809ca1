//! Voice discovery over the upstream file listing.
//!
//! The upstream dataset is a flat set of POSIX-relative paths. A voice is
//! any directory grouping holding a file literally named `config.json` and
//! at least one `.ckpt` checkpoint; the voice name is the grouping path
//! with its leading collection segment dropped and the rest joined with
//! dashes (`checkpoints/en/amy/medium` → `en-amy-medium`).

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::contract::HubClient;
use crate::error::PipelineError;
use crate::voice::{name_parts, Voice};

/// Scan the upstream listing and build one [`Voice`] per qualifying
/// grouping, in listing order of the config files.
///
/// Groupings with a config but no checkpoint are skipped silently, as are
/// groupings whose derived name does not split into exactly three parts.
/// Listing and etag-fetch failures are fatal: discovery runs outside the
/// per-voice isolation boundary.
pub async fn discover_voices<C>(
    client: &C,
    config: &PipelineConfig,
) -> Result<Vec<Voice>, PipelineError>
where
    C: HubClient + ?Sized,
{
    let files = client.list_repo_files(&config.checkpoints_repo).await?;
    debug!(count = files.len(), repo = %config.checkpoints_repo, "Listed upstream files");

    let mut voices = Vec::new();
    for path in &files {
        let (grouping, file_name) = split_path(path);
        if file_name != "config.json" {
            continue;
        }

        let Some(checkpoint) = files.iter().find(|f| {
            let (parent, name) = split_path(f);
            parent == grouping && is_checkpoint_name(name)
        }) else {
            debug!(grouping, "Config without checkpoint, skipping grouping");
            continue;
        };

        let name = grouping_to_name(grouping);
        if name_parts(&name).is_none() {
            warn!(grouping, derived = %name, "Grouping does not map to a three-part voice name, skipping");
            continue;
        }

        let etag = client
            .file_etag(&config.upstream_url(checkpoint))
            .await?;
        voices.push(Voice {
            name,
            config: path.clone(),
            checkpoint: checkpoint.clone(),
            etag,
        });
    }

    info!(count = voices.len(), "Discovered upstream voices");
    Ok(voices)
}

/// Split a POSIX-relative path into (parent directory, file name).
fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

/// A checkpoint is any file with a non-empty stem and the `ckpt` extension.
fn is_checkpoint_name(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext == "ckpt")
}

/// Join the grouping's segments after the leading collection prefix.
fn grouping_to_name(grouping: &str) -> String {
    grouping
        .split('/')
        .skip(1)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockHubClient;

    fn listing(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn client_with(paths: Vec<String>) -> MockHubClient {
        let mut client = MockHubClient::new();
        client
            .expect_list_repo_files()
            .returning(move |_| Ok(paths.clone()));
        client
            .expect_file_etag()
            .returning(|_| Ok("etag-1".to_string()));
        client
    }

    #[tokio::test]
    async fn one_voice_per_complete_grouping() {
        let client = client_with(listing(&[
            "checkpoints/en/amy/medium/config.json",
            "checkpoints/en/amy/medium/epoch=2164.ckpt",
            "checkpoints/de/eva/high/config.json",
            "checkpoints/de/eva/high/epoch=500.ckpt",
        ]));
        let voices = discover_voices(&client, &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].name, "en-amy-medium");
        assert_eq!(voices[0].config, "checkpoints/en/amy/medium/config.json");
        assert_eq!(
            voices[0].checkpoint,
            "checkpoints/en/amy/medium/epoch=2164.ckpt"
        );
        assert_eq!(voices[0].etag, "etag-1");
        assert_eq!(voices[1].name, "de-eva-high");
    }

    #[tokio::test]
    async fn config_only_groupings_yield_nothing() {
        let client = client_with(listing(&[
            "checkpoints/en/amy/medium/config.json",
            "checkpoints/en/amy/medium/notes.txt",
            "checkpoints/de/eva/high/config.json",
            "checkpoints/de/eva/high/epoch=500.ckpt",
        ]));
        let voices = discover_voices(&client, &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "de-eva-high");
    }

    #[tokio::test]
    async fn name_drops_the_collection_prefix() {
        let client = client_with(listing(&[
            "collection/en/amy/medium/config.json",
            "collection/en/amy/medium/epoch=1.ckpt",
        ]));
        let voices = discover_voices(&client, &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(voices[0].name, "en-amy-medium");
    }

    #[tokio::test]
    async fn first_checkpoint_in_listing_order_wins() {
        let client = client_with(listing(&[
            "c/en/amy/medium/config.json",
            "c/en/amy/medium/epoch=1.ckpt",
            "c/en/amy/medium/epoch=2.ckpt",
        ]));
        let voices = discover_voices(&client, &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].checkpoint, "c/en/amy/medium/epoch=1.ckpt");
    }

    #[tokio::test]
    async fn malformed_groupings_are_skipped() {
        let client = client_with(listing(&[
            "shallow/config.json",
            "shallow/epoch=1.ckpt",
            "c/en/amy/medium/extra/config.json",
            "c/en/amy/medium/extra/epoch=1.ckpt",
            "c/de/eva/high/config.json",
            "c/de/eva/high/epoch=1.ckpt",
        ]));
        let voices = discover_voices(&client, &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].name, "de-eva-high");
    }

    #[test]
    fn checkpoint_name_rule() {
        assert!(is_checkpoint_name("epoch=2164.ckpt"));
        assert!(is_checkpoint_name("last.ckpt"));
        assert!(!is_checkpoint_name(".ckpt"));
        assert!(!is_checkpoint_name("model.onnx"));
        assert!(!is_checkpoint_name("ckpt"));
    }
}
