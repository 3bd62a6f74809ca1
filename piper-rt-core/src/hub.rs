//! Hugging Face hub client: repository listings, file metadata, blob
//! transfer and commit uploads.
//!
//! One [`HfHubClient`] is constructed at startup and shared by reference;
//! it implements [`HubClient`] for the real hub. Everything here is
//! transport plumbing — the pipeline only consumes the trait.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::contract::{HubClient, RepoKind};
use crate::error::HubError;
use crate::voice::Voice;

const HUB_BASE: &str = "https://huggingface.co";

pub struct HfHubClient {
    http: reqwest::Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    #[serde(default)]
    siblings: Vec<RepoSibling>,
}

#[derive(Debug, Deserialize)]
struct RepoSibling {
    rfilename: String,
}

impl HfHubClient {
    /// A client optionally carrying a hub access token. Reads work without
    /// one; commits to the destination repository require it.
    pub fn new(token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
        }
    }

    fn authorised(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_checked(&self, url: &str) -> Result<reqwest::Response, HubError> {
        let response = self
            .authorised(self.http.get(url))
            .send()
            .await
            .map_err(|e| HubError::Request {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HubClient for HfHubClient {
    async fn list_repo_files(&self, repo_id: &str) -> Result<Vec<String>, HubError> {
        let url = format!("{HUB_BASE}/api/datasets/{repo_id}");
        let info: RepoInfo = self
            .get_checked(&url)
            .await?
            .json()
            .await
            .map_err(|e| HubError::Decode { url, source: e })?;
        Ok(info
            .siblings
            .into_iter()
            .map(|sibling| sibling.rfilename)
            .collect())
    }

    async fn file_etag(&self, url: &str) -> Result<String, HubError> {
        let response = self
            .authorised(self.http.head(url))
            .send()
            .await
            .map_err(|e| HubError::Request {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Status {
                url: url.to_string(),
                status,
            });
        }
        // Large files resolve through the CDN; the fingerprint of the
        // actual content is in x-linked-etag, with etag as the fallback.
        let headers = response.headers();
        let raw = headers
            .get("x-linked-etag")
            .or_else(|| headers.get(reqwest::header::ETAG))
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| HubError::MissingEtag {
                url: url.to_string(),
            })?;
        Ok(normalise_etag(raw))
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, HubError> {
        self.get_checked(url)
            .await?
            .json()
            .await
            .map_err(|e| HubError::Decode {
                url: url.to_string(),
                source: e,
            })
    }

    async fn fetch_published_index(&self, url: &str) -> Result<Option<Vec<Voice>>, HubError> {
        let response = self
            .authorised(self.http.get(url))
            .send()
            .await
            .map_err(|e| HubError::Request {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();
        // The hub answers 401 for files in repositories that do not exist
        // yet, so that status (and a plain 404) means "nothing published",
        // not an authentication failure.
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
            info!(url, "No published index at destination");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(HubError::Status {
                url: url.to_string(),
                status,
            });
        }
        let voices = response.json().await.map_err(|e| HubError::Decode {
            url: url.to_string(),
            source: e,
        })?;
        Ok(Some(voices))
    }

    async fn download_file(&self, url: &str, dest: &Path) -> Result<(), HubError> {
        let response = self.get_checked(url).await?;
        let mut file = File::create(dest).map_err(|e| HubError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| HubError::Request {
                url: url.to_string(),
                source: e,
            })?;
            file.write_all(&chunk).map_err(|e| HubError::Io {
                path: dest.to_path_buf(),
                source: e,
            })?;
        }
        debug!(url, path = %dest.display(), "Downloaded file");
        Ok(())
    }

    async fn upload_file(
        &self,
        local: &Path,
        path_in_repo: &str,
        repo_id: &str,
        repo_kind: RepoKind,
    ) -> Result<(), HubError> {
        let content = std::fs::read(local).map_err(|e| HubError::Io {
            path: local.to_path_buf(),
            source: e,
        })?;
        let url = format!(
            "{HUB_BASE}/api/{}/{repo_id}/commit/main",
            repo_kind.api_segment()
        );
        let body = commit_payload(path_in_repo, &content);
        let response = self
            .authorised(self.http.post(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| HubError::Request {
                url: url.clone(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Status { url, status });
        }
        info!(path = path_in_repo, repo = repo_id, "Uploaded file to hub");
        Ok(())
    }
}

/// Strip the weak-validator prefix and surrounding quotes from a raw etag
/// header value.
fn normalise_etag(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("W/")
        .trim_matches('"')
        .to_string()
}

/// Commit API payload: newline-delimited JSON with one header line and one
/// base64-encoded file line. The commit overwrites any existing file at
/// `path_in_repo`.
fn commit_payload(path_in_repo: &str, content: &[u8]) -> String {
    let header = serde_json::json!({
        "key": "header",
        "value": {"summary": format!("Upload {path_in_repo}"), "description": ""},
    });
    let file = serde_json::json!({
        "key": "file",
        "value": {
            "content": BASE64.encode(content),
            "path": path_in_repo,
            "encoding": "base64",
        },
    });
    format!("{header}\n{file}")
}
