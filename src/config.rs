use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "LEETSYNC";
const DEFAULT_CONFIG_FILE: &str = "leetsync";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub repo_name: String,
    pub repo_description: String,
    pub ai_features: AiFeatures,
    pub include_description: bool,
    pub include_hints: bool,
    pub endpoints: Endpoints,
    pub committer: Committer,
    /// Sent as `User-Agent` on every call.
    pub client_id: String,
    /// Public OAuth client id; the secret lives with the relay only.
    pub oauth_client_id: String,
    pub oauth_redirect_uri: String,
    /// Overrides the stored credential when set.
    pub github_token: Option<String>,
    pub leetcode_session: Option<String>,
    pub csrf_token: Option<String>,
    pub db_path: PathBuf,
    pub settle_delay_ms: u64,
    pub analysis_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AiFeatures {
    pub complexity: bool,
    pub optimization: bool,
    pub alternatives: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub site_url: String,
    pub graphql_url: String,
    pub github_api_url: String,
    pub oauth_authorize_url: String,
    pub auth_relay_url: String,
    pub analyzer_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repo_name: "leetcode-solutions".into(),
            repo_description: "My LeetCode solutions with AI analysis".into(),
            ai_features: AiFeatures::default(),
            include_description: true,
            include_hints: true,
            endpoints: Endpoints::default(),
            committer: Committer::default(),
            client_id: concat!("leetsync/", env!("CARGO_PKG_VERSION")).into(),
            oauth_client_id: "Ov23li2KzaXJqydhdmob".into(),
            oauth_redirect_uri: "https://gitsync-sept-gitoauth.vercel.app/callback".into(),
            github_token: None,
            leetcode_session: None,
            csrf_token: None,
            db_path: PathBuf::from("data/leetsync.sqlite"),
            settle_delay_ms: 2000,
            analysis_timeout_secs: 20,
        }
    }
}

impl Default for AiFeatures {
    fn default() -> Self {
        Self {
            complexity: true,
            optimization: true,
            alternatives: false,
        }
    }
}

impl AiFeatures {
    pub fn any(&self) -> bool {
        self.complexity || self.optimization || self.alternatives
    }

    pub fn none() -> Self {
        Self {
            complexity: false,
            optimization: false,
            alternatives: false,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            site_url: "https://leetcode.com".into(),
            graphql_url: "https://leetcode.com/graphql/".into(),
            github_api_url: "https://api.github.com".into(),
            oauth_authorize_url: "https://github.com/login/oauth/authorize".into(),
            auth_relay_url: "https://gitsync-sept-gitoauth.vercel.app/api/auth/github".into(),
            analyzer_url: "https://code-analyzer-six.vercel.app/api/analyze".into(),
        }
    }
}

impl Default for Committer {
    fn default() -> Self {
        Self {
            name: "LeetCode Sync Bot".into(),
            email: "noreply@leetcode-sync.com".into(),
        }
    }
}

/// Layer an optional TOML file under `LEETSYNC_*` environment variables.
/// Nested keys use `__`, e.g. `LEETSYNC_AI_FEATURES__ALTERNATIVES=true`.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let file = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let settings = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read configuration")?
        .try_deserialize::<Settings>()
        .context("Invalid configuration")?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_extension_defaults() {
        let s = Settings::default();
        assert_eq!(s.repo_name, "leetcode-solutions");
        assert!(s.ai_features.complexity);
        assert!(s.ai_features.optimization);
        assert!(!s.ai_features.alternatives);
        assert!(s.include_description && s.include_hints);
        assert!(s.github_token.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "repo_name = \"algo\"\ninclude_hints = false\n\n[ai_features]\nalternatives = true\n",
        )
        .unwrap();

        let s = load(Some(&path)).unwrap();
        assert_eq!(s.repo_name, "algo");
        assert!(!s.include_hints);
        assert!(s.ai_features.alternatives);
        // Untouched keys keep their defaults.
        assert!(s.ai_features.complexity);
        assert_eq!(s.endpoints.github_api_url, "https://api.github.com");
    }

    #[test]
    fn no_features_means_none() {
        assert!(!AiFeatures::none().any());
        assert!(AiFeatures::default().any());
    }
}
