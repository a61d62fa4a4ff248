use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AiFeatures;
use crate::model::{Alternative, AnalysisAnnotation, Complexity, ProblemRecord};
use crate::transport::{HttpRequest, Transport};

const UNAVAILABLE: &str = "Analysis unavailable";
const AUTO_DETECT: &str = "auto-detect";

/// Generic approaches listed when the service offers none of its own.
const GENERAL_ALTERNATIVES: &[(&str, &str)] = &[
    (
        "Iterative Solution",
        "Converting recursive solution to iterative using explicit stack/queue",
    ),
    (
        "Space-Optimized",
        "Reducing space complexity by reusing variables or in-place modifications",
    ),
    (
        "Different Algorithm",
        "Alternative algorithmic approach (e.g., BFS vs DFS, sliding window, etc.)",
    ),
];

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis service unavailable: {0}")]
    Unavailable(String),
    #[error("analysis request failed: {0}")]
    Transport(String),
    #[error("analysis response unreadable: {0}")]
    Decode(String),
    #[error("analysis timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzerResponse {
    time_complexity: Option<String>,
    space_complexity: Option<String>,
    explanation: Option<String>,
    #[serde(default)]
    optimizations: Option<Vec<String>>,
    #[serde(default)]
    suggestions: Option<Vec<String>>,
    #[serde(default)]
    alternatives: Option<Vec<AlternativeJson>>,
}

#[derive(Debug, Deserialize)]
struct AlternativeJson {
    approach: String,
    description: String,
}

pub struct Analyzer<'a, T> {
    transport: &'a T,
    endpoint: &'a str,
    timeout: Duration,
}

impl<'a, T: Transport> Analyzer<'a, T> {
    pub fn new(transport: &'a T, endpoint: &'a str, timeout: Duration) -> Self {
        Self {
            transport,
            endpoint,
            timeout,
        }
    }

    /// Best-effort annotation. Never fails; `None` when nothing was produced.
    pub async fn annotate(
        &self,
        record: &ProblemRecord,
        features: AiFeatures,
    ) -> Option<AnalysisAnnotation> {
        if !features.any() {
            return None;
        }

        let wants_service = features.complexity || features.optimization;
        let response = if wants_service && !record.code.trim().is_empty() {
            info!("Requesting code analysis");
            match tokio::time::timeout(self.timeout, self.request(record)).await {
                Ok(Ok(r)) => Some(r),
                Ok(Err(e)) => {
                    warn!("{}", e);
                    None
                }
                Err(_) => {
                    warn!("{}", AnalysisError::TimedOut(self.timeout));
                    None
                }
            }
        } else {
            None
        };

        let annotation = build_annotation(response, features);
        if annotation.is_empty() {
            None
        } else {
            Some(annotation)
        }
    }

    async fn request(&self, record: &ProblemRecord) -> Result<AnalyzerResponse, AnalysisError> {
        let language = if record.has_known_language() {
            record.language.as_str()
        } else {
            AUTO_DETECT
        };
        let request = HttpRequest::post(
            self.endpoint,
            json!({ "code": record.code.trim(), "language": language }),
        )
        .header("Content-Type", "application/json");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| AnalysisError::Transport(format!("{:#}", e)))?;
        if !response.is_success() {
            return Err(AnalysisError::Unavailable(response.error_message()));
        }
        response
            .json()
            .map_err(|e| AnalysisError::Decode(format!("{:#}", e)))
    }
}

fn build_annotation(response: Option<AnalyzerResponse>, features: AiFeatures) -> AnalysisAnnotation {
    let mut annotation = AnalysisAnnotation::default();
    let reached_service = response.is_some();
    let mut response = response.unwrap_or_default();

    if features.complexity && reached_service {
        annotation.complexity = Some(Complexity {
            time: response.time_complexity.take().unwrap_or_else(|| UNAVAILABLE.into()),
            space: response.space_complexity.take().unwrap_or_else(|| UNAVAILABLE.into()),
            explanation: response.explanation.take().unwrap_or_default(),
        });
    }

    if features.optimization {
        annotation.optimizations = response.optimizations.take().unwrap_or_default();
        annotation.suggestions = response.suggestions.take().unwrap_or_default();
    }

    if features.alternatives {
        annotation.alternatives = match response.alternatives.take() {
            Some(alts) if !alts.is_empty() => alts
                .into_iter()
                .map(|a| Alternative {
                    approach: a.approach,
                    description: a.description,
                })
                .collect(),
            _ => GENERAL_ALTERNATIVES
                .iter()
                .map(|(approach, description)| Alternative {
                    approach: approach.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        };
    }

    annotation
}
