use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::model::{AnalysisAnnotation, ProblemRecord};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";
const ATTRIBUTION: &str = "**Generated by:** leetsync";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub include_description: bool,
    pub include_hints: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_description: true,
            include_hints: true,
        }
    }
}

impl RenderOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            include_description: settings.include_description,
            include_hints: settings.include_hints,
        }
    }
}

/// Render the README for one problem. Pure: the only varying input is
/// `generated_at`.
pub fn render_document(
    record: &ProblemRecord,
    analysis: Option<&AnalysisAnnotation>,
    options: &RenderOptions,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}. {}\n\n", record.question_id, record.title));
    out.push_str(&format!(
        "**Difficulty:** {} {}\n\n",
        record.difficulty.badge(),
        record.difficulty
    ));

    if !record.topic_tags.is_empty() {
        let tags: Vec<String> = record.topic_tags.iter().map(|t| format!("`{}`", t)).collect();
        out.push_str(&format!("**Topics:** {}\n\n", tags.join(", ")));
    }

    if let Some(rate) = &record.acceptance_rate {
        out.push_str(&format!("**Acceptance Rate:** {}\n\n", rate));
    }

    if options.include_description && !record.description.is_empty() {
        out.push_str(&format!("## Problem Description\n\n{}\n\n", record.description));
    }

    if !record.examples.is_empty() {
        out.push_str("## Examples\n\n");
        for (i, example) in record.examples.iter().enumerate() {
            let fence = fence_for(example);
            out.push_str(&format!("### Example {}\n{fence}\n{}\n{fence}\n\n", i + 1, example));
        }
    }

    if !record.constraints.is_empty() {
        out.push_str("## Constraints\n\n");
        for constraint in &record.constraints {
            out.push_str(&format!("- {}\n", constraint));
        }
        out.push('\n');
    }

    solution_section(&mut out, record);

    if record.has_performance() {
        out.push_str("## Performance\n\n");
        out.push_str(&format!(
            "- **Runtime:** {}{}\n",
            record.runtime,
            beats(record.runtime_percentile)
        ));
        out.push_str(&format!(
            "- **Memory:** {}{}\n\n",
            record.memory,
            beats(record.memory_percentile)
        ));
    }

    if let Some(analysis) = analysis.filter(|a| !a.is_empty()) {
        analysis_section(&mut out, analysis);
    }

    if options.include_hints && !record.hints.is_empty() {
        out.push_str("## Hints\n\n");
        for (i, hint) in record.hints.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, hint));
        }
        out.push('\n');
    }

    out.push_str("---\n\n");
    if let Some(submitted) = record.submitted_at {
        out.push_str(&format!("**Submitted:** {}\n", submitted.format(TIMESTAMP_FORMAT)));
    }
    out.push_str(&format!("**Generated:** {}\n", generated_at.format(TIMESTAMP_FORMAT)));
    out.push_str(ATTRIBUTION);
    out.push('\n');

    out
}

fn solution_section(out: &mut String, record: &ProblemRecord) {
    let info = if record.has_known_language() {
        record.language.as_str()
    } else {
        ""
    };
    out.push_str("## Solution\n\n");
    out.push_str(&format!("**Language:** {}\n\n", record.language_name));
    let ticks = fence_for(&record.code);
    out.push_str(&format!("{}{}\n", ticks, info));
    if !record.code.is_empty() {
        out.push_str(record.code.trim_end());
        out.push('\n');
    }
    out.push_str(&format!("{}\n\n", ticks));
}

/// A backtick fence longer than any backtick run inside `body`, at least three.
fn fence_for(body: &str) -> String {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat((longest + 1).max(3))
}

fn analysis_section(out: &mut String, analysis: &AnalysisAnnotation) {
    out.push_str("## Analysis\n\n");

    if let Some(c) = &analysis.complexity {
        out.push_str("### Complexity Analysis\n");
        out.push_str(&format!("- **Time Complexity:** {}\n", c.time));
        out.push_str(&format!("- **Space Complexity:** {}\n", c.space));
        if !c.explanation.is_empty() {
            out.push_str(&format!("\n{}\n", c.explanation));
        }
        out.push('\n');
    }

    bullet_block(out, "Optimization Suggestions", &analysis.optimizations);
    bullet_block(out, "Suggestions", &analysis.suggestions);

    if !analysis.alternatives.is_empty() {
        out.push_str("### Alternative Approaches\n");
        for alt in &analysis.alternatives {
            out.push_str(&format!("#### {}\n{}\n\n", alt.approach, alt.description));
        }
    }
}

fn bullet_block(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("### {}\n", heading));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

fn beats(percentile: Option<f64>) -> String {
    match percentile {
        Some(p) => format!(" (beats {}%)", trim_number(p)),
        None => String::new(),
    }
}

fn trim_number(v: f64) -> String {
    let s = format!("{:.2}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
