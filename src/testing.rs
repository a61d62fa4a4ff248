//! In-memory stand-in for every remote the tool talks to.
//!
//! Requests to [`API`] are answered by a small emulation of the repository
//! hosting REST surface (repos, contents, user). Everything else must be
//! scripted with [`FakeTransport::script`] / [`FakeTransport::fail`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use crate::model::{CodeSource, Difficulty, ProblemRecord};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

pub const API: &str = "https://api.github.test";
pub const GRAPHQL: &str = "https://leetcode.com/graphql/";
pub const ANALYZER: &str = "https://analyzer.test/api/analyze";
pub const RELAY: &str = "https://relay.test/api/auth/github";

type Scripted = (Method, String, VecDeque<Result<HttpResponse, String>>);

#[derive(Default)]
pub struct FakeTransport {
    scripted: Mutex<Vec<Scripted>>,
    host: Mutex<RepoHost>,
    requests: Mutex<Vec<HttpRequest>>,
}

#[derive(Default)]
struct RepoHost {
    users: BTreeMap<String, String>,
    repos: BTreeSet<String>,
    files: BTreeMap<(String, String), (String, String)>,
    next_sha: u32,
    fail_puts_matching: Vec<String>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next request whose URL starts with `prefix`.
    pub fn script(&self, method: Method, prefix: &str, response: HttpResponse) -> &Self {
        self.push(method, prefix, Ok(response));
        self
    }

    /// Queue a transport-level failure.
    pub fn fail(&self, method: Method, prefix: &str, message: &str) -> &Self {
        self.push(method, prefix, Err(message.to_string()));
        self
    }

    fn push(&self, method: Method, prefix: &str, item: Result<HttpResponse, String>) {
        let mut scripted = self.scripted.lock().unwrap();
        if let Some(route) = scripted
            .iter_mut()
            .find(|(m, p, _)| *m == method && p == prefix)
        {
            route.2.push_back(item);
        } else {
            scripted.push((method, prefix.to_string(), VecDeque::from([item])));
        }
    }

    pub fn with_user(self, token: &str, login: &str) -> Self {
        self.host
            .lock()
            .unwrap()
            .users
            .insert(token.to_string(), login.to_string());
        self
    }

    pub fn with_repo(self, full_name: &str) -> Self {
        self.host.lock().unwrap().repos.insert(full_name.to_string());
        self
    }

    pub fn with_file(self, full_name: &str, path: &str, content: &str) -> Self {
        self.host.lock().unwrap().store(full_name, path, content);
        self
    }

    /// Make every PUT to a path containing `fragment` fail with 500.
    pub fn failing_puts(self, fragment: &str) -> Self {
        self.host
            .lock()
            .unwrap()
            .fail_puts_matching
            .push(fragment.to_string());
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, fragment: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url.contains(fragment))
            .collect()
    }

    pub fn file(&self, full_name: &str, path: &str) -> Option<String> {
        self.host
            .lock()
            .unwrap()
            .files
            .get(&(full_name.to_string(), path.to_string()))
            .map(|(content, _)| content.clone())
    }

    pub fn has_repo(&self, full_name: &str) -> bool {
        self.host.lock().unwrap().repos.contains(full_name)
    }

    fn next_scripted(&self, request: &HttpRequest) -> Option<Result<HttpResponse, String>> {
        let mut scripted = self.scripted.lock().unwrap();
        scripted
            .iter_mut()
            .find(|(m, p, q)| *m == request.method && request.url.starts_with(p.as_str()) && !q.is_empty())
            .and_then(|(_, _, q)| q.pop_front())
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(item) = self.next_scripted(&request) {
            return item.map_err(|e| anyhow!(e));
        }
        if let Some(path) = request.url.strip_prefix(API) {
            let path = path.to_string();
            return Ok(self.host.lock().unwrap().handle(&request, &path));
        }
        Err(anyhow!("unscripted request: {} {}", request.method, request.url))
    }
}

impl RepoHost {
    fn store(&mut self, full_name: &str, path: &str, content: &str) -> String {
        self.next_sha += 1;
        let sha = format!("sha-{}", self.next_sha);
        self.files.insert(
            (full_name.to_string(), path.to_string()),
            (content.to_string(), sha.clone()),
        );
        sha
    }

    fn login_for(&self, request: &HttpRequest) -> Option<String> {
        let token = request.header_value("Authorization")?.strip_prefix("token ")?;
        self.users.get(token).cloned()
    }

    fn handle(&mut self, request: &HttpRequest, path: &str) -> HttpResponse {
        let Some(login) = self.login_for(request) else {
            return HttpResponse::new(401, r#"{"message":"Bad credentials"}"#);
        };
        let segments: Vec<&str> = path.trim_start_matches('/').splitn(5, '/').collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["user"]) => HttpResponse::new(
                200,
                json!({
                    "login": login,
                    "id": 7,
                    "name": "Test User",
                    "email": null,
                    "avatar_url": "https://avatars.test/7",
                    "html_url": format!("https://github.test/{}", login),
                })
                .to_string(),
            ),
            (Method::Post, ["user", "repos"]) => {
                let name = body_str(request, "name").unwrap_or_default();
                let full_name = format!("{}/{}", login, name);
                if !self.repos.insert(full_name.clone()) {
                    return HttpResponse::new(
                        422,
                        r#"{"message":"name already exists on this account"}"#,
                    );
                }
                if request.body.as_ref().and_then(|b| b.get("auto_init")) == Some(&json!(true)) {
                    self.store(&full_name, "README.md", &format!("# {}\n", name));
                }
                HttpResponse::new(201, json!({ "full_name": full_name }).to_string())
            }
            (Method::Get, ["repos", owner, repo]) => {
                let full_name = format!("{}/{}", owner, repo);
                if self.repos.contains(&full_name) {
                    HttpResponse::new(200, json!({ "full_name": full_name }).to_string())
                } else {
                    not_found()
                }
            }
            (Method::Get, ["repos", owner, repo, "contents", file]) => {
                let key = (format!("{}/{}", owner, repo), file.to_string());
                match self.files.get(&key) {
                    Some((content, sha)) => HttpResponse::new(
                        200,
                        json!({
                            "path": file,
                            "sha": sha,
                            "content": BASE64.encode(content),
                        })
                        .to_string(),
                    ),
                    None => not_found(),
                }
            }
            (Method::Put, ["repos", owner, repo, "contents", file]) => {
                let full_name = format!("{}/{}", owner, repo);
                if !self.repos.contains(&full_name) {
                    return not_found();
                }
                if self.fail_puts_matching.iter().any(|f| file.contains(f.as_str())) {
                    return HttpResponse::new(500, r#"{"message":"Server Error"}"#);
                }
                let key = (full_name.clone(), file.to_string());
                let existing = self.files.get(&key).map(|(_, sha)| sha.clone());
                let supplied = body_str(request, "sha");
                match (&existing, &supplied) {
                    (Some(_), None) => {
                        return HttpResponse::new(
                            422,
                            r#"{"message":"Invalid request.\n\n\"sha\" wasn't supplied."}"#,
                        )
                    }
                    (Some(current), Some(given)) if current != given => {
                        return HttpResponse::new(409, r#"{"message":"sha does not match"}"#)
                    }
                    (None, Some(_)) => {
                        return HttpResponse::new(422, r#"{"message":"sha given for new file"}"#)
                    }
                    _ => {}
                }
                let encoded = body_str(request, "content").unwrap_or_default();
                let content = BASE64
                    .decode(encoded)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
                    .unwrap_or_default();
                let sha = self.store(&full_name, file, &content);
                let status = if existing.is_some() { 200 } else { 201 };
                HttpResponse::new(
                    status,
                    json!({ "content": { "path": file, "sha": sha } }).to_string(),
                )
            }
            _ => not_found(),
        }
    }
}

fn body_str(request: &HttpRequest, key: &str) -> Option<String> {
    request
        .body
        .as_ref()
        .and_then(|b| b.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn not_found() -> HttpResponse {
    HttpResponse::new(404, r#"{"message":"Not Found"}"#)
}

/// A GraphQL `question` payload shaped like the real endpoint's.
pub fn question_json(difficulty: &str) -> Value {
    json!({
        "data": {
            "question": {
                "title": "Two Sum",
                "titleSlug": "two-sum",
                "questionId": "1",
                "questionFrontendId": "1",
                "difficulty": difficulty,
                "content": "<p>Given an array of integers&nbsp;<code>nums</code>&nbsp;and an integer <code>target</code>, return indices.</p>\n<p>&nbsp;</p>\n<p><strong class=\"example\">Example 1:</strong></p>\n<pre><strong>Input:</strong> nums = [2,7,11,15], target = 9\n<strong>Output:</strong> [0,1]\n</pre>\n<p><strong>Constraints:</strong></p>\n<ul>\n\t<li><code>2 &lt;= nums.length &lt;= 10<sup>4</sup></code></li>\n\t<li>Only one valid answer exists.</li>\n</ul>",
                "stats": "{\"totalAccepted\": \"45\", \"totalSubmission\": \"200\", \"totalAcceptedRaw\": 45, \"totalSubmissionRaw\": 200, \"acRate\": \"22.5%\"}",
                "topicTags": [{ "name": "Array", "slug": "array" }, { "name": "Hash Table", "slug": "hash-table" }],
                "hints": ["Try a hash map."],
                "codeSnippets": [
                    { "lang": "C++", "langSlug": "cpp", "code": "class Solution {\npublic:\n};" }
                ]
            }
        }
    })
}

pub fn submission_json() -> Value {
    json!({
        "data": {
            "submissionDetails": {
                "runtime": 3,
                "runtimeDisplay": "3 ms",
                "runtimePercentile": 91.5,
                "memory": 2100000,
                "memoryDisplay": "2.1 MB",
                "memoryPercentile": 40.0,
                "code": "impl Solution {\n    pub fn two_sum() {}\n}",
                "timestamp": 1700000000,
                "statusCode": 10,
                "lang": { "name": "rust", "verboseName": "Rust" }
            }
        }
    })
}

pub fn sample_record() -> ProblemRecord {
    ProblemRecord {
        question_id: "1".into(),
        title_slug: "two-sum".into(),
        title: "Two Sum".into(),
        difficulty: Difficulty::Easy,
        topic_tags: vec!["Array".into(), "Hash Table".into()],
        acceptance_rate: Some("22.5%".into()),
        description: "Given an array of integers nums and an integer target, return indices.".into(),
        examples: vec!["Input: nums = [2,7,11,15], target = 9\nOutput: [0,1]".into()],
        constraints: vec!["2 <= nums.length <= 104".into()],
        hints: vec!["Try a hash map.".into()],
        code: "fn main() {}".into(),
        code_source: CodeSource::Submission,
        language: "rust".into(),
        language_name: "Rust".into(),
        runtime: "3 ms".into(),
        runtime_percentile: Some(91.5),
        memory: "2.1 MB".into(),
        memory_percentile: None,
        submitted_at: chrono::DateTime::<chrono::Utc>::from_timestamp(1_700_000_000, 0),
    }
}
