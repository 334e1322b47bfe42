//! HTTP webhook client.
//!
//! Implements all three webhook stages over a shared JSON protocol. Each
//! service in a stage's list is called strictly in order with the staged
//! files; for mutation, every service sees the output of the previous one.
//!
//! Request body:
//!
//! ```json
//! { "parameters": { ... }, "files": [{ "name": "a.md", "content": "<base64>" }] }
//! ```
//!
//! Responses per stage:
//!
//! - Mutation: `{ "success": true, "files": [{ "name", "content" }] }` —
//!   returned files are rewritten in place in the workspace
//! - Validation: `{ "success": false, "messages": "..." }`
//! - Metadata: `{ "files": [{ "name", "metadata": { ... } }] }` — metadata
//!   is opaque and passed through untouched

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::asset::WebhookService;
use crate::error::{Error, Result};

use super::{FileMetadata, MetadataExtractor, Mutator, Validator, WebhookOutcome};

/// HTTP client for mutation, validation, and metadata webhooks.
///
/// Cheap to clone; safe for concurrent use. Timeouts are the caller's
/// responsibility, carried by the cancellation token.
#[derive(Debug, Clone, Default)]
pub struct HttpWebhook {
    client: reqwest::Client,
}

#[derive(Debug, Serialize, Deserialize)]
struct FilePayload {
    name: String,
    content: String,
}

#[derive(Serialize)]
struct WebhookRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a serde_json::Value>,
    files: &'a [FilePayload],
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    messages: String,
    #[serde(default)]
    files: Vec<FilePayload>,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    success: bool,
    #[serde(default)]
    messages: String,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    files: Vec<MetadataFilePayload>,
}

#[derive(Debug, Deserialize)]
struct MetadataFilePayload {
    name: String,
    metadata: serde_json::Value,
}

const fn default_success() -> bool {
    true
}

impl HttpWebhook {
    /// Creates a client with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client over a preconfigured `reqwest` client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read_files(base_path: &Path, filenames: &[String]) -> Result<Vec<FilePayload>> {
        let mut files = Vec::with_capacity(filenames.len());
        for name in filenames {
            let path = base_path.join(name);
            let data = tokio::fs::read(&path).await.map_err(|e| {
                Error::webhook_with_source(format!("while reading staged file {}", path.display()), e)
            })?;
            files.push(FilePayload {
                name: name.clone(),
                content: BASE64.encode(data),
            });
        }
        Ok(files)
    }

    /// Posts the staged files to one service and decodes the response.
    ///
    /// Honors cancellation both before and during the request.
    async fn post<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        service: &WebhookService,
        files: &[FilePayload],
    ) -> Result<T> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let body = WebhookRequest {
            parameters: service.parameters.as_ref(),
            files,
        };

        let request = async {
            let response = self
                .client
                .post(&service.url)
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    Error::webhook_with_source(format!("while calling service {}", service.url), e)
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::webhook(format!(
                    "service {} answered {status}",
                    service.url
                )));
            }

            response.json::<T>().await.map_err(|e| {
                Error::webhook_with_source(
                    format!("while decoding response from service {}", service.url),
                    e,
                )
            })
        };

        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = request => result,
        }
    }
}

/// Writes mutated file contents back into the workspace.
///
/// Only names from the canonical filename list are accepted; anything else
/// in the response is dropped with a warning so a misbehaving service
/// cannot grow the staged set.
async fn apply_mutations(
    base_path: &Path,
    filenames: &[String],
    mutated: Vec<FilePayload>,
) -> Result<()> {
    for file in mutated {
        if !filenames.contains(&file.name) {
            tracing::warn!(name = %file.name, "mutation service returned an unknown file");
            continue;
        }

        let data = BASE64.decode(file.content.as_bytes()).map_err(|e| {
            Error::webhook_with_source(format!("while decoding mutated file {}", file.name), e)
        })?;

        let path = base_path.join(&file.name);
        tokio::fs::write(&path, data).await.map_err(|e| {
            Error::webhook_with_source(format!("while rewriting staged file {}", path.display()), e)
        })?;
    }

    Ok(())
}

#[async_trait]
impl Mutator for HttpWebhook {
    async fn mutate(
        &self,
        cancel: &CancellationToken,
        base_path: &Path,
        filenames: &[String],
        services: &[WebhookService],
    ) -> Result<WebhookOutcome> {
        for service in services {
            // Re-read per service so chained services see prior rewrites.
            let files = Self::read_files(base_path, filenames).await?;
            let response: MutationResponse = self.post(cancel, service, &files).await?;

            if !response.success {
                return Ok(WebhookOutcome::rejected(response.messages));
            }

            apply_mutations(base_path, filenames, response.files).await?;
        }

        Ok(WebhookOutcome::accepted())
    }
}

#[async_trait]
impl Validator for HttpWebhook {
    async fn validate(
        &self,
        cancel: &CancellationToken,
        base_path: &Path,
        filenames: &[String],
        services: &[WebhookService],
    ) -> Result<WebhookOutcome> {
        let files = Self::read_files(base_path, filenames).await?;

        for service in services {
            let response: ValidationResponse = self.post(cancel, service, &files).await?;
            if !response.success {
                return Ok(WebhookOutcome::rejected(response.messages));
            }
        }

        Ok(WebhookOutcome::accepted())
    }
}

#[async_trait]
impl MetadataExtractor for HttpWebhook {
    async fn extract(
        &self,
        cancel: &CancellationToken,
        base_path: &Path,
        filenames: &[String],
        services: &[WebhookService],
    ) -> Result<Vec<FileMetadata>> {
        let files = Self::read_files(base_path, filenames).await?;

        // Later services override earlier ones per file.
        let mut merged: HashMap<String, serde_json::Value> = HashMap::new();
        for service in services {
            let response: MetadataResponse = self.post(cancel, service, &files).await?;
            for file in response.files {
                merged.insert(file.name, file.metadata);
            }
        }

        Ok(merged
            .into_iter()
            .map(|(name, metadata)| FileMetadata { name, metadata })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_workspace(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn read_files_encodes_contents() {
        let workspace = fix_workspace(&[("a.md", "alpha")]);
        let filenames = vec!["a.md".to_string()];

        let files = HttpWebhook::read_files(workspace.path(), &filenames)
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.md");
        assert_eq!(BASE64.decode(&files[0].content).unwrap(), b"alpha");
    }

    #[tokio::test]
    async fn apply_mutations_rewrites_known_files_only() {
        let workspace = fix_workspace(&[("a.md", "alpha")]);
        let filenames = vec!["a.md".to_string()];

        let mutated = vec![
            FilePayload {
                name: "a.md".into(),
                content: BASE64.encode("rewritten"),
            },
            FilePayload {
                name: "../escape.md".into(),
                content: BASE64.encode("nope"),
            },
        ];

        apply_mutations(workspace.path(), &filenames, mutated)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(workspace.path().join("a.md")).unwrap(),
            b"rewritten"
        );
        assert!(!workspace.path().join("../escape.md").exists());
    }

    #[tokio::test]
    async fn apply_mutations_rejects_invalid_base64() {
        let workspace = fix_workspace(&[("a.md", "alpha")]);
        let filenames = vec!["a.md".to_string()];

        let mutated = vec![FilePayload {
            name: "a.md".into(),
            content: "not base64!".into(),
        }];

        let err = apply_mutations(workspace.path(), &filenames, mutated)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Webhook { .. }));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_before_any_request() {
        let workspace = fix_workspace(&[("a.md", "alpha")]);
        let filenames = vec!["a.md".to_string()];
        let services = vec![WebhookService::new("http://127.0.0.1:1/unreachable")];

        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = HttpWebhook::new();
        let err = client
            .validate(&cancel, workspace.path(), &filenames, &services)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn mutation_response_defaults_to_success() {
        let response: MutationResponse = serde_json::from_str("{\"files\": []}").unwrap();
        assert!(response.success);
        assert!(response.messages.is_empty());
    }
}
