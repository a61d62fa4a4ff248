pub mod content;
pub mod graphql;
pub mod location;
pub mod sources;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::model::{
    CodeSource, Difficulty, ProblemRecord, NOT_AVAILABLE, UNKNOWN_LANGUAGE, UNKNOWN_LANGUAGE_NAME,
};
use crate::transport::Transport;
use graphql::{GraphqlClient, Question, RetryPolicy, SubmissionDetails};
use location::PageKind;
use sources::{editor_surfaces, first_code, CodeFile, CodeStrategy};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Not a problem or submission page: {0}")]
    WrongPage(String),
    #[error("Could not determine problem slug from {0}")]
    MissingSlug(String),
    #[error("Metadata query failed: {0}")]
    QueryFailed(String),
    #[error("No solution code found for '{0}'")]
    NoCodeFound(String),
}

/// The page being synced: its URL plus ranked fallbacks for the code text.
pub struct PageContext {
    pub url: String,
    pub strategies: Vec<Box<dyn CodeStrategy>>,
}

impl PageContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            strategies: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: impl CodeStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn with_code_file(self, path: impl Into<std::path::PathBuf>) -> Self {
        self.with_strategy(CodeFile::new(path))
    }

    /// Append every editor surface of a saved page snapshot, in priority order.
    pub fn with_snapshot(mut self, html: &str) -> Self {
        for surface in editor_surfaces(html) {
            self.strategies.push(Box::new(surface));
        }
        self
    }
}

pub struct Extractor<'a, T> {
    transport: &'a T,
    settings: &'a Settings,
    retry: RetryPolicy,
}

impl<'a, T: Transport> Extractor<'a, T> {
    pub fn new(transport: &'a T, settings: &'a Settings) -> Self {
        Self {
            transport,
            settings,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn extract(&self, page: &PageContext) -> Result<ProblemRecord, ExtractionError> {
        let location = location::parse(&page.url, &self.settings.endpoints.site_url)?;
        info!("Extracting data for problem: {}", location.slug);

        let client = GraphqlClient {
            transport: self.transport,
            endpoint: &self.settings.endpoints.graphql_url,
            referer: &page.url,
            csrf_token: self.settings.csrf_token.as_deref(),
            session: self.settings.leetcode_session.as_deref(),
            retry: self.retry,
        };

        let question = client
            .question(&location.slug)
            .await
            .map_err(|e| ExtractionError::QueryFailed(format!("{:#}", e)))?;

        let submission = match (location.kind, location.submission_id) {
            (PageKind::Submission, Some(id)) => match client.submission(id).await {
                Ok(details) => Some(details),
                Err(e) => {
                    warn!("Continuing without submission {}: {:#}", id, e);
                    None
                }
            },
            _ => None,
        };

        let record = assemble(question, submission, &page.strategies);
        check_key(&record)?;
        Ok(record)
    }
}

/// The id and slug name the remote directory, so both must be path-safe.
fn check_key(record: &ProblemRecord) -> Result<(), ExtractionError> {
    let id = &record.question_id;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ExtractionError::QueryFailed(format!(
            "'{}' has no numeric question id (got {:?})",
            record.title_slug, id
        )));
    }
    let slug = &record.title_slug;
    if slug.is_empty()
        || !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ExtractionError::QueryFailed(format!(
            "Unusable title slug {:?}",
            slug
        )));
    }
    Ok(())
}

fn assemble(
    question: Question,
    submission: Option<SubmissionDetails>,
    strategies: &[Box<dyn CodeStrategy>],
) -> ProblemRecord {
    let (code, code_source) = resolve_code(&question, submission.as_ref(), strategies);
    if code.is_empty() {
        warn!("{}; publishing an empty solution", ExtractionError::NoCodeFound(question.title_slug.clone()));
    }

    let acceptance_rate = question.stats.as_deref().and_then(|stats| {
        let rate = content::acceptance_rate(stats);
        if rate.is_none() {
            warn!("Could not compute acceptance rate from stats: {}", stats);
        }
        rate
    });
    let parsed = question
        .content
        .as_deref()
        .map(content::parse_content)
        .unwrap_or_default();

    let question_id = question
        .question_frontend_id
        .clone()
        .or_else(|| question.question_id.clone())
        .map(|id| id.trim().to_string())
        .unwrap_or_default();

    let lang = submission.as_ref().and_then(|s| s.lang.as_ref());
    let language = lang
        .map(|l| l.name.clone())
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());
    let language_name = lang
        .map(|l| l.verbose_name.clone().unwrap_or_else(|| l.name.clone()))
        .unwrap_or_else(|| UNKNOWN_LANGUAGE_NAME.to_string());

    let display = |v: Option<&String>| {
        v.filter(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    let runtime = display(submission.as_ref().and_then(|s| s.runtime_display.as_ref()));
    let memory = display(submission.as_ref().and_then(|s| s.memory_display.as_ref()));

    ProblemRecord {
        question_id,
        title_slug: question.title_slug.to_lowercase(),
        title: question.title,
        difficulty: Difficulty::parse(&question.difficulty),
        topic_tags: question
            .topic_tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name)
            .collect(),
        acceptance_rate,
        description: parsed.description,
        examples: parsed.examples,
        constraints: parsed.constraints,
        hints: question.hints.unwrap_or_default(),
        code,
        code_source,
        language,
        language_name,
        runtime,
        runtime_percentile: submission.as_ref().and_then(|s| s.runtime_percentile),
        memory,
        memory_percentile: submission.as_ref().and_then(|s| s.memory_percentile),
        submitted_at: submission
            .as_ref()
            .and_then(|s| s.timestamp)
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
    }
}

/// Submission code, then the ranked strategies, then the first template.
fn resolve_code(
    question: &Question,
    submission: Option<&SubmissionDetails>,
    strategies: &[Box<dyn CodeStrategy>],
) -> (String, CodeSource) {
    if let Some(code) = submission
        .and_then(|s| s.code.as_deref())
        .filter(|c| !c.trim().is_empty())
    {
        return (code.to_string(), CodeSource::Submission);
    }

    if let Some((name, code)) = first_code(strategies) {
        info!("Using code from {}", name);
        return (code, CodeSource::Strategy(name));
    }

    if let Some(snippet) = question
        .code_snippets
        .as_ref()
        .and_then(|snippets| snippets.first())
    {
        info!(
            "Falling back to the {} template",
            snippet.lang_slug.as_deref().unwrap_or("default")
        );
        return (snippet.code.clone(), CodeSource::Template);
    }

    (String::new(), CodeSource::None)
}
