//! Who the tool publishes as.
//!
//! A token from settings always wins. Otherwise the credential saved by
//! `login` is used, and is dropped as soon as the repository host rejects it.
//! The OAuth client secret never lives here: codes are exchanged by the
//! external relay, which holds it.

use std::future::Future;

use reqwest::Url;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::db::{self, StoredCredential};
use crate::transport::{HttpRequest, HttpResponse, Transport};

const SCOPE: &str = "repo user:email";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),
    #[error("Authorization rejected: {0}")]
    Rejected(String),
    #[error("Failed to fetch user information: {0}")]
    ProfileFailed(String),
    #[error("Failed to store credential: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub login: String,
    pub id: Option<u64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub token: String,
    pub profile: UserProfile,
}

/// Supplies the identity a sync runs as, if any.
pub trait IdentitySource {
    fn current_identity(&self) -> impl Future<Output = Option<Identity>>;
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

enum ProfileCheck {
    Valid(UserProfile),
    Rejected(String),
    Unreachable(String),
}

pub struct IdentityStore<'a, T> {
    transport: &'a T,
    settings: &'a Settings,
    conn: &'a Connection,
}

impl<'a, T: Transport> IdentityStore<'a, T> {
    pub fn new(transport: &'a T, settings: &'a Settings, conn: &'a Connection) -> Self {
        Self {
            transport,
            settings,
            conn,
        }
    }

    /// Browser URL that starts the OAuth flow. The code it yields goes to
    /// [`IdentityStore::authenticate`].
    pub fn authorize_url(&self, state: &str) -> anyhow::Result<Url> {
        let url = Url::parse_with_params(
            &self.settings.endpoints.oauth_authorize_url,
            &[
                ("client_id", self.settings.oauth_client_id.as_str()),
                ("redirect_uri", self.settings.oauth_redirect_uri.as_str()),
                ("scope", SCOPE),
                ("state", state),
            ],
        )?;
        Ok(url)
    }

    pub async fn authenticate(&self, code: &str) -> Result<Identity, AuthError> {
        info!("Exchanging authorization code for access token");
        let request = HttpRequest::post(&self.settings.endpoints.auth_relay_url, json!({ "code": code }))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("{:#}", e)))?;
        if !response.is_success() {
            return Err(AuthError::ExchangeFailed(response.error_message()));
        }

        let grant: TokenGrant = response
            .json()
            .map_err(|e| AuthError::ExchangeFailed(format!("{:#}", e)))?;
        let token = match (grant.access_token, grant.error) {
            (Some(token), _) if !token.is_empty() => token,
            (_, Some(error)) => {
                return Err(AuthError::Rejected(
                    grant.error_description.unwrap_or(error),
                ))
            }
            _ => return Err(AuthError::ExchangeFailed("no access token in response".into())),
        };

        let profile = match self.check(&token).await {
            ProfileCheck::Valid(p) => p,
            ProfileCheck::Rejected(m) | ProfileCheck::Unreachable(m) => {
                return Err(AuthError::ProfileFailed(m))
            }
        };

        db::save_credential(
            self.conn,
            &StoredCredential {
                token: token.clone(),
                login: profile.login.clone(),
                scope: grant.scope,
            },
        )
        .map_err(|e| AuthError::Storage(format!("{:#}", e)))?;
        info!("Authenticated as {}", profile.login);

        Ok(Identity { token, profile })
    }

    /// Forget the stored credential. Returns whether one existed.
    pub fn logout(&self) -> anyhow::Result<bool> {
        db::clear_credential(self.conn)
    }

    async fn resolve(&self) -> Option<Identity> {
        if let Some(token) = self.settings.github_token.as_deref().filter(|t| !t.is_empty()) {
            return match self.check(token).await {
                ProfileCheck::Valid(profile) => Some(Identity {
                    token: token.to_string(),
                    profile,
                }),
                ProfileCheck::Rejected(m) | ProfileCheck::Unreachable(m) => {
                    warn!("Configured token unusable: {}", m);
                    None
                }
            };
        }

        let stored = match db::load_credential(self.conn) {
            Ok(Some(c)) => c,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read stored credential: {:#}", e);
                return None;
            }
        };

        match self.check(&stored.token).await {
            ProfileCheck::Valid(profile) => Some(Identity {
                token: stored.token,
                profile,
            }),
            ProfileCheck::Rejected(m) => {
                warn!("Stored token rejected ({}), clearing it", m);
                if let Err(e) = db::clear_credential(self.conn) {
                    warn!("Failed to clear credential: {:#}", e);
                }
                None
            }
            ProfileCheck::Unreachable(m) => {
                warn!("Could not verify stored token ({}), using it anyway", m);
                Some(Identity {
                    token: stored.token,
                    profile: UserProfile {
                        login: stored.login,
                        ..Default::default()
                    },
                })
            }
        }
    }

    async fn check(&self, token: &str) -> ProfileCheck {
        let url = format!("{}/user", self.settings.endpoints.github_api_url.trim_end_matches('/'));
        let request = HttpRequest::get(url)
            .header("Authorization", format!("token {}", token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", self.settings.client_id.as_str());

        let response: HttpResponse = match self.transport.send(request).await {
            Ok(r) => r,
            Err(e) => return ProfileCheck::Unreachable(format!("{:#}", e)),
        };
        match response.status {
            401 | 403 => ProfileCheck::Rejected(response.error_message()),
            _ if response.is_success() => match response.json::<UserProfile>() {
                Ok(profile) => {
                    debug!("Token belongs to {}", profile.login);
                    ProfileCheck::Valid(profile)
                }
                Err(e) => ProfileCheck::Unreachable(format!("{:#}", e)),
            },
            _ => ProfileCheck::Unreachable(response.error_message()),
        }
    }
}

impl<T: Transport> IdentitySource for IdentityStore<'_, T> {
    async fn current_identity(&self) -> Option<Identity> {
        self.resolve().await
    }
}

/// A fixed identity, or none.
#[cfg(test)]
pub struct StaticIdentity(pub Option<Identity>);

#[cfg(test)]
impl IdentitySource for StaticIdentity {
    async fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}
