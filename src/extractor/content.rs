use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static PRE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").unwrap());
static LI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Example \d+:|Constraints:").unwrap());

// (accepted, total) JSON pointers, most specific first.
const STATS_KEYS: &[(&str, &str)] = &[
    ("/totalAcceptedRaw", "/totalSubmissionRaw"),
    ("/acSubmissionNum/0/count", "/totalSubmissionNum/0/count"),
    ("/accepted", "/total"),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemContent {
    pub description: String,
    pub examples: Vec<String>,
    pub constraints: Vec<String>,
}

/// Split the problem statement HTML into description, examples and constraints.
pub fn parse_content(html: &str) -> ProblemContent {
    let examples = PRE_RE
        .captures_iter(html)
        .map(|c| text_content(&c[1]).trim().to_string())
        .filter(|t| t.contains("Input:") || t.contains("Output:"))
        .collect();

    let constraints = LI_RE
        .captures_iter(html)
        .map(|c| text_content(&c[1]).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    ProblemContent {
        description: plain_description(html),
        examples,
        constraints,
    }
}

/// Whole text with whitespace collapsed, cut before the first example or
/// constraints header.
pub fn plain_description(html: &str) -> String {
    let text = collapse_whitespace(&text_content(html));
    let end = SECTION_RE.find(&text).map(|m| m.start()).unwrap_or(text.len());
    text[..end].trim().to_string()
}

/// Text of an HTML fragment: tags dropped, `<br>` kept as newlines, entities decoded.
pub fn text_content(html: &str) -> String {
    let with_breaks = BR_RE.replace_all(html, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    decode_entities(&stripped)
}

pub fn collapse_whitespace(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

pub fn decode_entities(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(name)
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "le" => Some('≤'),
        "ge" => Some('≥'),
        "ne" => Some('≠'),
        "times" => Some('×'),
        "minus" => Some('−'),
        _ => None,
    }
}

/// Acceptance rate from the serialized stats blob, e.g. `"22.5%"`.
pub fn acceptance_rate(stats: &str) -> Option<String> {
    let value: Value = serde_json::from_str(stats).ok()?;
    STATS_KEYS.iter().find_map(|(accepted, total)| {
        let accepted = count(value.pointer(accepted)?)?;
        let total = count(value.pointer(total)?)?;
        format_rate(accepted, total)
    })
}

pub fn format_rate(accepted: f64, total: f64) -> Option<String> {
    if total <= 0.0 {
        return None;
    }
    Some(format!("{:.1}%", accepted / total * 100.0))
}

fn count(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.replace(',', "").trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SUM: &str = "<p>Given an array of integers&nbsp;<code>nums</code>&nbsp;and an integer <code>target</code>, return <em>indices of the two numbers</em>.</p>\n\
<p>&nbsp;</p>\n\
<p><strong class=\"example\">Example 1:</strong></p>\n\
<pre><strong>Input:</strong> nums = [2,7,11,15], target = 9\n<strong>Output:</strong> [0,1]\n</pre>\n\
<p><strong class=\"example\">Example 2:</strong></p>\n\
<pre><strong>Input:</strong> nums = [3,2,4], target = 6\n<strong>Output:</strong> [1,2]</pre>\n\
<pre>not an example</pre>\n\
<p><strong>Constraints:</strong></p>\n\
<ul>\n\t<li><code>2 &lt;= nums.length &lt;= 10<sup>4</sup></code></li>\n\t<li>   </li>\n\t<li><strong>Only one valid answer exists.</strong></li>\n</ul>\n\
<p><strong>Follow-up:</strong> less than O(n<sup>2</sup>)?</p>";

    #[test]
    fn examples_need_input_or_output_marker() {
        let c = parse_content(TWO_SUM);
        assert_eq!(c.examples.len(), 2);
        assert_eq!(c.examples[0], "Input: nums = [2,7,11,15], target = 9\nOutput: [0,1]");
        assert!(c.examples[1].starts_with("Input: nums = [3,2,4]"));
    }

    #[test]
    fn constraints_are_list_items() {
        let c = parse_content(TWO_SUM);
        assert_eq!(
            c.constraints,
            vec!["2 <= nums.length <= 104", "Only one valid answer exists."]
        );
    }

    #[test]
    fn description_stops_at_first_section() {
        let c = parse_content(TWO_SUM);
        assert_eq!(
            c.description,
            "Given an array of integers nums and an integer target, return indices of the two numbers."
        );
    }

    #[test]
    fn description_without_sections_is_whole_text() {
        assert_eq!(plain_description("<p>a\n\n  b</p><div>c</div>"), "a bc");
    }

    #[test]
    fn constraints_header_before_examples_cuts_there() {
        assert_eq!(plain_description("<p>intro</p><p>Constraints:</p><p>Example 1:</p>"), "intro");
    }

    #[test]
    fn entities() {
        assert_eq!(decode_entities("a &lt;= b &amp;&amp; c &#39;x&#x27;"), "a <= b && c 'x'");
        assert_eq!(decode_entities("&bogus; stays"), "&bogus; stays");
    }

    #[test]
    fn br_becomes_newline() {
        assert_eq!(text_content("a<br/>b<BR>c"), "a\nb\nc");
    }

    #[test]
    fn acceptance_rate_from_raw_counts() {
        let stats = r#"{"totalAccepted": "45", "totalSubmission": "200", "totalAcceptedRaw": 45, "totalSubmissionRaw": 200}"#;
        assert_eq!(acceptance_rate(stats).as_deref(), Some("22.5%"));
    }

    #[test]
    fn acceptance_rate_from_submission_num_lists() {
        let stats = r#"{"acSubmissionNum": [{"count": 45}], "totalSubmissionNum": [{"count": 200}]}"#;
        assert_eq!(acceptance_rate(stats).as_deref(), Some("22.5%"));
    }

    #[test]
    fn acceptance_rate_plain_keys_and_strings() {
        assert_eq!(
            acceptance_rate(r#"{"accepted": "1,000", "total": "3,000"}"#).as_deref(),
            Some("33.3%")
        );
    }

    #[test]
    fn acceptance_rate_degenerate() {
        assert_eq!(acceptance_rate(r#"{"accepted": 1, "total": 0}"#), None);
        assert_eq!(acceptance_rate("not json"), None);
        assert_eq!(acceptance_rate("{}"), None);
    }
}
