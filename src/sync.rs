use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::Analyzer;
use crate::config::Settings;
use crate::extractor::graphql::RetryPolicy;
use crate::extractor::{ExtractionError, Extractor, PageContext};
use crate::identity::IdentitySource;
use crate::model::PublishTarget;
use crate::publisher::{PublishError, Publisher};
use crate::render::{render_document, RenderOptions};
use crate::transport::Transport;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Not authenticated with GitHub; run `leetsync login` or set LEETSYNC_GITHUB_TOKEN")]
    NotAuthenticated,
    #[error(transparent)]
    ExtractionFailed(#[from] ExtractionError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Outcome of one successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub owner: String,
    pub repo: String,
    pub question_id: String,
    pub title: String,
    pub path: String,
    pub sha: String,
    pub created: bool,
    /// Set only when the companion code file was published.
    pub code_path: Option<String>,
}

pub struct Syncer<'a, T, I> {
    transport: &'a T,
    settings: &'a Settings,
    identity: &'a I,
    retry: RetryPolicy,
}

impl<'a, T: Transport, I: IdentitySource> Syncer<'a, T, I> {
    pub fn new(transport: &'a T, settings: &'a Settings, identity: &'a I) -> Self {
        Self {
            transport,
            settings,
            identity,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn sync(&self, page: &PageContext) -> Result<SyncReport, SyncError> {
        let identity = self
            .identity
            .current_identity()
            .await
            .ok_or(SyncError::NotAuthenticated)?;
        let owner = identity.profile.login.as_str();

        let record = Extractor::new(self.transport, self.settings)
            .with_retry(self.retry)
            .extract(page)
            .await?;
        info!("Extracted {}. {} ({})", record.question_id, record.title, record.difficulty);

        let analysis = Analyzer::new(
            self.transport,
            &self.settings.endpoints.analyzer_url,
            Duration::from_secs(self.settings.analysis_timeout_secs),
        )
        .annotate(&record, self.settings.ai_features)
        .await;

        let publisher = Publisher::new(self.transport, self.settings, &identity.token);
        publisher
            .ensure_collection_exists(owner, &self.settings.repo_name, &self.settings.repo_description)
            .await?;

        let target = PublishTarget::for_record(owner, &self.settings.repo_name, &record);
        let document = render_document(
            &record,
            analysis.as_ref(),
            &RenderOptions::from_settings(self.settings),
            Utc::now(),
        );
        let artifact = publisher
            .create_or_update_artifact(
                &target.owner,
                &target.repo,
                &target.document_path,
                &document,
                &format!("solution: {}. {}", record.question_id, record.title),
            )
            .await?;

        let mut code_path = None;
        if let Some(code) = record.companion_code() {
            let subject = format!("{} solution for {}", record.language_name, record.title);
            match publisher
                .create_or_update_artifact(&target.owner, &target.repo, &target.code_path, code, &subject)
                .await
            {
                Ok(r) => code_path = Some(r.path),
                Err(e) => warn!("Failed to publish {}: {}", target.code_path, e),
            }
        }

        Ok(SyncReport {
            owner: target.owner,
            repo: target.repo,
            question_id: record.question_id,
            title: record.title,
            path: artifact.path,
            sha: artifact.sha,
            created: artifact.created,
            code_path,
        })
    }
}
