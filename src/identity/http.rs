//! Bearer-token "who am I" over HTTP.
//!
//! Speaks the GoTrue-style `GET /auth/v1/user` contract: the credential goes
//! in `Authorization: Bearer`, the project key (if any) in `apikey`, and the
//! response is the auth user with profile fields under `user_metadata`.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{IdentityError, IdentityService};
use crate::session::{Role, User};

pub const DEFAULT_USER_PATH: &str = "/auth/v1/user";

#[derive(Debug, Clone)]
pub struct HttpIdentityConfig {
    pub base_url: Url,
    pub user_path: String,
    /// Sent as the `apikey` header.
    pub api_key: Option<String>,
}

impl HttpIdentityConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            user_path: DEFAULT_USER_PATH.to_string(),
            api_key: None,
        }
    }
}

#[derive(Clone)]
pub struct HttpIdentityService {
    client: reqwest::Client,
    user_url: Url,
    api_key: Option<String>,
}

impl HttpIdentityService {
    pub fn new(config: HttpIdentityConfig) -> Result<Self, IdentityError> {
        let user_url = config
            .base_url
            .join(&config.user_path)
            .map_err(|e| IdentityError::Transport(format!("invalid user path: {e}")))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            user_url,
            api_key: config.api_key,
        })
    }

    pub fn user_url(&self) -> &Url {
        &self.user_url
    }
}

impl IdentityService for HttpIdentityService {
    async fn current_user(&self, credential: &str) -> Result<User, IdentityError> {
        let mut request = self
            .client
            .get(self.user_url.clone())
            .bearer_auth(credential);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(status = %status, url = %self.user_url, "Identity service answered");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(IdentityError::Unauthorized);
            }
            s if !s.is_success() => {
                return Err(IdentityError::Transport(format!("HTTP {s}")));
            }
            _ => {}
        }

        let record = response
            .json::<AuthUserRecord>()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;
        Ok(record.into_user())
    }
}

/// Wire shape of the auth user.
#[derive(Debug, Deserialize)]
struct AuthUserRecord {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    app_metadata: Metadata,
    #[serde(default)]
    user_metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

/// Roles the auth backend assigns to every session; they say nothing about
/// storefront permissions.
const TRANSPORT_ROLES: [&str; 3] = ["authenticated", "anon", "service_role"];

impl AuthUserRecord {
    fn into_user(self) -> User {
        let top_level_role = self
            .role
            .filter(|r| !TRANSPORT_ROLES.contains(&r.as_str()));
        let role = self
            .app_metadata
            .role
            .or(self.user_metadata.role)
            .or(top_level_role)
            .map(|r| Role::from_str(&r).as_str().to_string())
            .unwrap_or_else(|| Role::Customer.as_str().to_string());

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        User {
            id: self.id,
            email: self.email.unwrap_or_default(),
            role,
            created_at: self.created_at.unwrap_or_default(),
            full_name: non_empty(self.user_metadata.full_name),
            phone: non_empty(self.phone).or(non_empty(self.user_metadata.phone)),
            avatar_url: non_empty(self.user_metadata.avatar_url),
            address: non_empty(self.user_metadata.address),
        }
    }
}
