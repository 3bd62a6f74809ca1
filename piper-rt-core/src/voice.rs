//! Voice records and the streaming (+RT) rewrite.
//!
//! A [`Voice`] is the pipeline's unit of work: one logical text-to-speech
//! model in the upstream checkpoints dataset, identified by a three-part
//! `language-name-quality` key and carrying the paths of its config and
//! checkpoint files plus the checkpoint's remote content fingerprint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::VoiceError;

/// One logical voice found in the upstream checkpoints dataset.
///
/// Records are immutable once built: each run discovers a fresh set and
/// compares it against the previously published index, never merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Three dash-separated parts: language, base name, quality.
    pub name: String,
    /// Path of the voice's `config.json` in the upstream repository.
    pub config: String,
    /// Path of the voice's checkpoint file in the upstream repository.
    pub checkpoint: String,
    /// Remote content fingerprint of the checkpoint, used for change
    /// detection only.
    pub etag: String,
}

impl Voice {
    /// Whether two records point at the same artifact: exact match on
    /// config path, checkpoint path and etag. `name` is deliberately not
    /// compared, so a rename alone never triggers a re-export while a
    /// changed checkpoint always does.
    pub fn same_artifact(&self, other: &Voice) -> bool {
        self.config == other.config
            && self.checkpoint == other.checkpoint
            && self.etag == other.etag
    }
}

/// Split a voice name into its (language, base name, quality) parts.
/// Returns `None` unless there are exactly three non-empty parts.
pub(crate) fn name_parts(name: &str) -> Option<(&str, &str, &str)> {
    let mut it = name.split('-');
    match (it.next(), it.next(), it.next(), it.next()) {
        (Some(lang), Some(base), Some(quality), None)
            if !lang.is_empty() && !base.is_empty() && !quality.is_empty() =>
        {
            Some((lang, base, quality))
        }
        _ => None,
    }
}

/// Derive the streaming release name: `en_US-amy-medium` becomes
/// `en_US-amy+RT-medium`.
pub fn rt_name(name: &str) -> Result<String, VoiceError> {
    let (lang, base, quality) = name_parts(name).ok_or_else(|| VoiceError::InvalidName {
        name: name.to_string(),
    })?;
    Ok(format!("{lang}-{base}+RT-{quality}"))
}

/// Rewrite an upstream voice config for streaming use: set the streaming
/// flag and point the identity key at the derived name. Every other field
/// passes through untouched, in its original order.
pub fn rewrite_config(document: Value, rt_key: &str) -> Result<Value, VoiceError> {
    let Value::Object(mut fields) = document else {
        return Err(VoiceError::ConfigShape {
            name: rt_key.to_string(),
        });
    };
    fields.insert("streaming".to_string(), Value::Bool(true));
    fields.insert("key".to_string(), Value::String(rt_key.to_string()));
    Ok(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rt_name_appends_suffix_to_middle_part() {
        assert_eq!(rt_name("en_US-amy-medium").unwrap(), "en_US-amy+RT-medium");
        assert_eq!(rt_name("de-eva-high").unwrap(), "de-eva+RT-high");
    }

    #[test]
    fn rt_name_rejects_wrong_part_counts() {
        assert!(rt_name("amy").is_err());
        assert!(rt_name("en-amy").is_err());
        assert!(rt_name("en-amy-medium-extra").is_err());
        assert!(rt_name("en--medium").is_err());
        assert!(rt_name("").is_err());
    }

    #[test]
    fn rewrite_config_sets_streaming_and_key_only() {
        let input = json!({"key": "en-amy-medium", "other": 1});
        let rewritten = rewrite_config(input, "en-amy+RT-medium").unwrap();
        assert_eq!(
            serde_json::to_string(&rewritten).unwrap(),
            r#"{"key":"en-amy+RT-medium","other":1,"streaming":true}"#
        );
    }

    #[test]
    fn rewrite_config_preserves_unrelated_fields_and_order() {
        let input = json!({
            "audio": {"sample_rate": 22050},
            "key": "en-amy-medium",
            "num_speakers": 1,
            "espeak": {"voice": "en-us"}
        });
        let rewritten = rewrite_config(input, "en-amy+RT-medium").unwrap();
        assert_eq!(
            serde_json::to_string(&rewritten).unwrap(),
            concat!(
                r#"{"audio":{"sample_rate":22050},"key":"en-amy+RT-medium","#,
                r#""num_speakers":1,"espeak":{"voice":"en-us"},"streaming":true}"#
            )
        );
    }

    #[test]
    fn rewrite_config_rejects_non_object_documents() {
        let err = rewrite_config(json!([1, 2, 3]), "en-amy+RT-medium").unwrap_err();
        assert!(matches!(err, VoiceError::ConfigShape { .. }));
    }

    #[test]
    fn same_artifact_ignores_name() {
        let a = Voice {
            name: "en-amy-medium".into(),
            config: "c/en/amy/medium/config.json".into(),
            checkpoint: "c/en/amy/medium/epoch=1.ckpt".into(),
            etag: "x".into(),
        };
        let mut b = a.clone();
        b.name = "en-renamed-medium".into();
        assert!(a.same_artifact(&b));

        b.etag = "y".into();
        assert!(!a.same_artifact(&b));
    }
}
