use reqwest::Url;

use super::ExtractionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Problem,
    Submission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub kind: PageKind,
    pub slug: String,
    pub submission_id: Option<u64>,
}

/// Classify a page URL on the practice site.
///
/// `https://leetcode.com/problems/two-sum/` is a problem view,
/// `https://leetcode.com/problems/two-sum/submissions/1234567/` a submission
/// view with id `1234567`.
pub fn parse(page_url: &str, site_url: &str) -> Result<PageLocation, ExtractionError> {
    let url = Url::parse(page_url).map_err(|_| ExtractionError::WrongPage(page_url.to_string()))?;
    let site = Url::parse(site_url).map_err(|_| ExtractionError::WrongPage(page_url.to_string()))?;

    if !same_site(&url, &site) {
        return Err(ExtractionError::WrongPage(page_url.to_string()));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let is_submission = segments.contains(&"submissions");
    let is_problem = segments.contains(&"problems");
    if !is_submission && !is_problem {
        return Err(ExtractionError::WrongPage(page_url.to_string()));
    }

    let slug = segments
        .iter()
        .position(|s| *s == "problems")
        .and_then(|i| segments.get(i + 1))
        .filter(|s| **s != "submissions")
        .map(|s| s.to_lowercase())
        .ok_or_else(|| ExtractionError::MissingSlug(page_url.to_string()))?;

    let submission_id = if is_submission {
        segments.last().and_then(|s| s.parse::<u64>().ok())
    } else {
        None
    };

    Ok(PageLocation {
        kind: if is_submission {
            PageKind::Submission
        } else {
            PageKind::Problem
        },
        slug,
        submission_id,
    })
}

fn same_site(url: &Url, site: &Url) -> bool {
    let strip = |h: &str| h.trim_start_matches("www.").to_ascii_lowercase();
    match (url.host_str(), site.host_str()) {
        (Some(a), Some(b)) => strip(a) == strip(b),
        _ => false,
    }
}
