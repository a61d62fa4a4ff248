use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const UNKNOWN_LANGUAGE: &str = "unknown";
pub const UNKNOWN_LANGUAGE_NAME: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";

const SOLUTIONS_DIR: &str = "solutions";
const DOCUMENT_FILE: &str = "README.md";

const EXTENSIONS: &[(&str, &str)] = &[
    ("cpp", ".cpp"),
    ("java", ".java"),
    ("python", ".py"),
    ("python3", ".py"),
    ("javascript", ".js"),
    ("typescript", ".ts"),
    ("c", ".c"),
    ("csharp", ".cs"),
    ("go", ".go"),
    ("ruby", ".rb"),
    ("swift", ".swift"),
    ("kotlin", ".kt"),
    ("rust", ".rs"),
    ("php", ".php"),
    ("scala", ".scala"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Other(String),
}

impl Difficulty {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "Easy" => Difficulty::Easy,
            "Medium" => Difficulty::Medium,
            "Hard" => Difficulty::Hard,
            other => Difficulty::Other(other.to_string()),
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            Difficulty::Easy => "🟢",
            Difficulty::Medium => "🟡",
            Difficulty::Hard => "🔴",
            Difficulty::Other(_) => "⚪",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => f.write_str("Easy"),
            Difficulty::Medium => f.write_str("Medium"),
            Difficulty::Hard => f.write_str("Hard"),
            Difficulty::Other(s) => f.write_str(s),
        }
    }
}

/// Where the solution text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CodeSource {
    Submission,
    Strategy(String),
    Template,
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProblemRecord {
    pub question_id: String,
    pub title_slug: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub topic_tags: Vec<String>,
    pub acceptance_rate: Option<String>,
    pub description: String,
    pub examples: Vec<String>,
    pub constraints: Vec<String>,
    pub hints: Vec<String>,
    pub code: String,
    pub code_source: CodeSource,
    /// Language slug, `unknown` without a submission.
    pub language: String,
    pub language_name: String,
    pub runtime: String,
    pub runtime_percentile: Option<f64>,
    pub memory: String,
    pub memory_percentile: Option<f64>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ProblemRecord {
    pub fn has_performance(&self) -> bool {
        self.runtime != NOT_AVAILABLE && self.memory != NOT_AVAILABLE
    }

    pub fn has_known_language(&self) -> bool {
        self.language != UNKNOWN_LANGUAGE
    }

    /// Raw code body for the sibling `solution.<ext>` file, if one applies.
    pub fn companion_code(&self) -> Option<&str> {
        if self.code.trim().is_empty() || !self.has_known_language() {
            return None;
        }
        Some(&self.code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisAnnotation {
    pub complexity: Option<Complexity>,
    pub optimizations: Vec<String>,
    pub suggestions: Vec<String>,
    pub alternatives: Vec<Alternative>,
}

impl AnalysisAnnotation {
    pub fn is_empty(&self) -> bool {
        self.complexity.is_none()
            && self.optimizations.is_empty()
            && self.suggestions.is_empty()
            && self.alternatives.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Complexity {
    pub time: String,
    pub space: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    pub approach: String,
    pub description: String,
}

/// Remote location of one problem's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub owner: String,
    pub repo: String,
    pub document_path: String,
    pub code_path: String,
}

impl PublishTarget {
    pub fn for_record(owner: &str, repo: &str, record: &ProblemRecord) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            document_path: document_path(&record.question_id, &record.title_slug),
            code_path: code_path(&record.question_id, &record.title_slug, &record.language),
        }
    }
}

fn solution_dir(question_id: &str, title_slug: &str) -> String {
    format!(
        "{}/{:0>4}-{}",
        SOLUTIONS_DIR,
        question_id.trim(),
        title_slug.to_lowercase()
    )
}

pub fn document_path(question_id: &str, title_slug: &str) -> String {
    format!("{}/{}", solution_dir(question_id, title_slug), DOCUMENT_FILE)
}

pub fn code_path(question_id: &str, title_slug: &str, language: &str) -> String {
    format!(
        "{}/solution{}",
        solution_dir(question_id, title_slug),
        extension_for(language)
    )
}

pub fn extension_for(language: &str) -> &'static str {
    EXTENSIONS
        .iter()
        .find(|(slug, _)| *slug == language)
        .map(|(_, ext)| *ext)
        .unwrap_or(".txt")
}
