use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Committer, Settings};
use crate::transport::{HttpRequest, HttpResponse, Transport};

const ACCEPT: &str = "application/vnd.github.v3+json";
const README_PATH: &str = "README.md";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to create repository: {0}")]
    CollectionCreateFailed(String),
    #[error("Failed to create/update file: {0}")]
    UpsertFailed(String),
}

/// Where an upsert landed. `sha` is the fingerprint for the next update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub path: String,
    pub sha: String,
    pub created: bool,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    content: ContentEntry,
}

pub struct Publisher<'a, T> {
    transport: &'a T,
    api_url: &'a str,
    token: &'a str,
    user_agent: &'a str,
    committer: &'a Committer,
    settle_delay: Duration,
}

impl<'a, T: Transport> Publisher<'a, T> {
    pub fn new(transport: &'a T, settings: &'a Settings, token: &'a str) -> Self {
        Self {
            transport,
            api_url: settings.endpoints.github_api_url.trim_end_matches('/'),
            token,
            user_agent: &settings.client_id,
            committer: &settings.committer,
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Make sure `owner/name` exists, creating and seeding it on a definitive 404.
    pub async fn ensure_collection_exists(
        &self,
        owner: &str,
        name: &str,
        description: &str,
    ) -> Result<(), PublishError> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, name);
        match self.transport.send(self.authorized(HttpRequest::get(url))).await {
            Ok(r) if r.is_success() => {
                debug!("Repository {}/{} exists", owner, name);
                return Ok(());
            }
            Ok(r) if r.is_not_found() => {}
            Ok(r) => {
                warn!(
                    "Repository check for {}/{} failed ({}), assuming it exists",
                    owner,
                    name,
                    r.error_message()
                );
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "Repository check for {}/{} failed ({:#}), assuming it exists",
                    owner, name, e
                );
                return Ok(());
            }
        }

        info!("Creating repository {}/{}", owner, name);
        let body = json!({
            "name": name,
            "description": description,
            "private": false,
            "auto_init": true,
            "license_template": "mit",
        });
        let request = self.authorized(HttpRequest::post(format!("{}/user/repos", self.api_url), body));
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| PublishError::CollectionCreateFailed(format!("{:#}", e)))?;
        if !response.is_success() {
            return Err(PublishError::CollectionCreateFailed(response.error_message()));
        }

        tokio::time::sleep(self.settle_delay).await;

        if let Err(e) = self
            .create_or_update_artifact(owner, name, README_PATH, &seed_readme(name), README_PATH)
            .await
        {
            warn!("Failed to seed README.md, continuing: {}", e);
        }
        Ok(())
    }

    /// Look up the current fingerprint, then issue one PUT with create or
    /// update semantics.
    pub async fn create_or_update_artifact(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content: &str,
        subject: &str,
    ) -> Result<ArtifactRef, PublishError> {
        let url = format!("{}/repos/{}/{}/contents/{}", self.api_url, owner, repo, path);
        let existing = self.current_sha(&url, path).await;

        let verb = if existing.is_some() { "Update" } else { "Add" };
        let mut body = json!({
            "message": format!("{} {}", verb, subject),
            "content": BASE64.encode(content),
            "committer": {
                "name": self.committer.name,
                "email": self.committer.email,
            },
        });
        if let (Some(sha), Value::Object(map)) = (&existing, &mut body) {
            map.insert("sha".into(), Value::String(sha.clone()));
        }

        let response = self
            .transport
            .send(self.authorized(HttpRequest::put(url, body)))
            .await
            .map_err(|e| PublishError::UpsertFailed(format!("{:#}", e)))?;
        if !response.is_success() {
            return Err(PublishError::UpsertFailed(response.error_message()));
        }

        let sha = response
            .json::<UpsertResponse>()
            .map(|r| r.content.sha)
            .map_err(|e| PublishError::UpsertFailed(format!("{:#}", e)))?;
        info!("{} {} ({})", verb, path, short_sha(&sha));

        Ok(ArtifactRef {
            path: path.to_string(),
            sha,
            created: existing.is_none(),
        })
    }

    async fn current_sha(&self, url: &str, path: &str) -> Option<String> {
        let response: HttpResponse = match self.transport.send(self.authorized(HttpRequest::get(url))).await {
            Ok(r) => r,
            Err(e) => {
                warn!("File check for {} failed ({:#}), assuming new file", path, e);
                return None;
            }
        };
        if response.is_not_found() {
            return None;
        }
        if !response.is_success() {
            warn!(
                "File check for {} failed ({}), assuming new file",
                path,
                response.error_message()
            );
            return None;
        }
        match response.json::<ContentEntry>() {
            Ok(entry) => Some(entry.sha),
            Err(e) => {
                warn!("Unreadable contents entry for {}: {:#}", path, e);
                None
            }
        }
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT)
            .header("Content-Type", "application/json")
            .header("User-Agent", self.user_agent)
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Landing page written into a freshly created solutions repository.
pub fn seed_readme(repo_name: &str) -> String {
    format!(
        "# {repo_name}\n\n\
         Solutions to practice problems, synced automatically with leetsync.\n\n\
         ## Structure\n\n\
         Each problem lives in its own directory, named by zero-padded id and slug:\n\n\
         ```\n\
         solutions/\n\
         \x20 0001-two-sum/\n\
         \x20   README.md\n\
         \x20   solution.cpp\n\
         \x20 0002-add-two-numbers/\n\
         \x20   README.md\n\
         \x20   solution.py\n\
         ```\n\n\
         `README.md` holds the problem statement, the accepted solution, runtime and\n\
         memory figures and, when enabled, complexity analysis.\n"
    )
}
