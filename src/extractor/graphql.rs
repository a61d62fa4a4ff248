use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::transport::{HttpRequest, HttpResponse, Transport};

pub const QUESTION_QUERY: &str = r#"
query questionDetail($titleSlug: String!) {
    question(titleSlug: $titleSlug) {
        title
        titleSlug
        questionId
        questionFrontendId
        difficulty
        content
        stats
        topicTags {
            name
            slug
        }
        hints
        codeSnippets {
            lang
            langSlug
            code
        }
    }
}
"#;

pub const SUBMISSION_QUERY: &str = r#"
query submissionDetails($submissionId: Int!) {
    submissionDetails(submissionId: $submissionId) {
        runtimeDisplay
        runtimePercentile
        memoryDisplay
        memoryPercentile
        code
        timestamp
        lang {
            name
            verboseName
        }
    }
}
"#;

/// Sequential attempts with a linearly growing pause (`base_delay × attempt`).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionData {
    pub question: Option<Question>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub title: String,
    pub title_slug: String,
    pub question_id: Option<String>,
    pub question_frontend_id: Option<String>,
    pub difficulty: String,
    pub content: Option<String>,
    pub stats: Option<String>,
    pub topic_tags: Option<Vec<TopicTag>>,
    pub hints: Option<Vec<String>>,
    pub code_snippets: Option<Vec<CodeSnippet>>,
}

#[derive(Debug, Deserialize)]
pub struct TopicTag {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSnippet {
    pub lang_slug: Option<String>,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionData {
    pub submission_details: Option<SubmissionDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetails {
    pub runtime_display: Option<String>,
    pub runtime_percentile: Option<f64>,
    pub memory_display: Option<String>,
    pub memory_percentile: Option<f64>,
    pub code: Option<String>,
    pub timestamp: Option<i64>,
    pub lang: Option<SubmissionLang>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionLang {
    pub name: String,
    pub verbose_name: Option<String>,
}

/// Client for the practice site's metadata endpoint.
pub struct GraphqlClient<'a, T> {
    pub transport: &'a T,
    pub endpoint: &'a str,
    pub referer: &'a str,
    pub csrf_token: Option<&'a str>,
    pub session: Option<&'a str>,
    pub retry: RetryPolicy,
}

impl<T: Transport> GraphqlClient<'_, T> {
    pub async fn question(&self, slug: &str) -> Result<Question> {
        let data: QuestionData = self
            .query("questionDetail", QUESTION_QUERY, json!({ "titleSlug": slug }))
            .await?;
        data.question
            .ok_or_else(|| anyhow!("No question returned for '{}'", slug))
    }

    pub async fn submission(&self, submission_id: u64) -> Result<SubmissionDetails> {
        let data: SubmissionData = self
            .query(
                "submissionDetails",
                SUBMISSION_QUERY,
                json!({ "submissionId": submission_id }),
            )
            .await?;
        data.submission_details
            .ok_or_else(|| anyhow!("No details returned for submission {}", submission_id))
    }

    async fn query<D: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<D> {
        let body = json!({
            "operationName": operation,
            "query": query,
            "variables": variables,
        });
        let response = self.post_with_retry(operation, body).await?;
        let envelope: Envelope<D> = response.json()?;

        match (envelope.data, envelope.errors) {
            (Some(data), _) => Ok(data),
            (None, Some(errors)) if !errors.is_empty() => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
                bail!("{} returned errors: {}", operation, messages.join("; "))
            }
            _ => bail!("{} returned no data", operation),
        }
    }

    async fn post_with_retry(&self, operation: &str, body: Value) -> Result<HttpResponse> {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.post_once(body.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        "{} attempt {}/{} failed: {:#}",
                        operation, attempt, attempts, e
                    );
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                let backoff = self.retry.base_delay * attempt;
                debug!("Backing off {:.1}s", backoff.as_secs_f64());
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("{} was never attempted", operation)))
    }

    async fn post_once(&self, body: Value) -> Result<HttpResponse> {
        let mut request = HttpRequest::post(self.endpoint, body)
            .header("Content-Type", "application/json")
            .header("Referer", self.referer);
        if let Some(csrf) = self.csrf_token {
            request = request.header("X-CSRFToken", csrf);
        }
        if let Some(cookie) = self.cookie() {
            request = request.header("Cookie", cookie);
        }

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            bail!("HTTP {}", response.status);
        }
        Ok(response)
    }

    fn cookie(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(session) = self.session {
            parts.push(format!("LEETCODE_SESSION={}", session));
        }
        if let Some(csrf) = self.csrf_token {
            parts.push(format!("csrftoken={}", csrf));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}
