//! Derivation of the public streaming catalog (`voices.json`).

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::PipelineError;
use crate::voice::{rt_name, Voice};

/// Cross-reference the public standard-voices catalog against the
/// published index and derive the streaming catalog: entries whose key
/// matches a published voice are kept, rewritten to point at the packaged
/// archive and re-keyed by their +RT name. Everything else in each entry
/// passes through untouched.
pub fn build_rt_catalog(public: &Value, published: &[Voice]) -> Result<Value, PipelineError> {
    let Value::Object(entries) = public else {
        return Err(PipelineError::CatalogShape);
    };
    let published_names: HashSet<&str> = published.iter().map(|v| v.name.as_str()).collect();

    let mut rt_entries = Map::new();
    for (key, data) in entries {
        if !published_names.contains(key.as_str()) {
            continue;
        }
        let rt = match rt_name(key) {
            Ok(rt) => rt,
            Err(e) => {
                warn!(voice = %key, error = %e, "Skipping catalog entry with malformed name");
                continue;
            }
        };
        let Value::Object(data) = data else {
            warn!(voice = %key, "Skipping non-object catalog entry");
            continue;
        };
        let mut entry = data.clone();
        let base = entry
            .get("key")
            .cloned()
            .unwrap_or_else(|| Value::String(key.clone()));
        entry.insert("base".to_string(), base);
        entry.insert("key".to_string(), Value::String(rt.clone()));
        entry.insert("streaming".to_string(), Value::Bool(true));
        entry.insert("files".to_string(), json!([format!("{rt}.tar.gz")]));
        rt_entries.insert(rt, Value::Object(entry));
    }
    Ok(Value::Object(rt_entries))
}
