//! Selectel Authentication
//!
//! Decides between a pre-issued token and user/password/domain credentials,
//! validates the provider credentials before any network access, and performs
//! the identity round-trip that yields a session token plus service catalog.

use super::catalog::ServiceCatalog;
use super::context::RequestContext;
use super::http::{SelectelHttpClient, AUTH_TOKEN_HEADER, SUBJECT_TOKEN_HEADER};
use crate::error::{ProviderError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

/// Base of the resell API used when no endpoint is configured
pub const RESELL_API_BASE: &str = "https://api.selectel.ru/vpc/resell";

/// Resell API version appended to [`RESELL_API_BASE`]
pub const RESELL_API_VERSION: &str = "v2";

/// Identity service used when no auth URL is configured
pub const DEFAULT_AUTH_URL: &str = "https://cloud.api.selcloud.ru/identity/v3";

/// Region used for account-wide catalog lookups when none is configured
pub const DEFAULT_AUTH_REGION: &str = "ru-1";

/// Region codes accepted in provider configuration
pub const KNOWN_REGIONS: &[&str] = &[
    "ru-1", "ru-2", "ru-3", "ru-7", "ru-8", "ru-9", "gis-1", "gis-2", "kz-1", "uz-1", "nl-1",
];

/// Default resell API endpoint, `<base>/<version>`
pub fn default_endpoint() -> String {
    format!("{}/{}", RESELL_API_BASE, RESELL_API_VERSION)
}

/// Check a region code against [`KNOWN_REGIONS`]
pub fn is_known_region(region: &str) -> bool {
    KNOWN_REGIONS.contains(&region)
}

/// Provider credentials
///
/// Built once from configuration and treated as read-only after
/// [`Credentials::validate`] succeeds.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub username: String,
    pub password: String,
    pub domain_name: String,
    pub region: String,
    pub endpoint: String,
    pub auth_url: String,
    pub auth_region: String,
}

// Secrets never reach logs through Debug
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &redact(&self.token))
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("domain_name", &self.domain_name)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("auth_url", &self.auth_url)
            .field("auth_region", &self.auth_region)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "***"
    }
}

/// How requests authenticate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Present the pre-issued token
    Token,
    /// Authenticate with user, password and domain name
    Password,
}

impl Credentials {
    fn has_password_triple(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.domain_name.is_empty()
    }

    /// Check that enough information is present to authenticate.
    ///
    /// On success an empty `endpoint` is back-filled with [`default_endpoint`].
    pub fn validate(&mut self) -> Result<()> {
        if self.token.is_empty() && !self.has_password_triple() {
            return Err(ProviderError::Config(
                "token or credentials with domain name must be specified".to_string(),
            ));
        }

        if !self.region.is_empty() && !is_known_region(&self.region) {
            return Err(ProviderError::Config(format!(
                "region is invalid: {}",
                self.region
            )));
        }

        if self.endpoint.is_empty() {
            self.endpoint = default_endpoint();
        }

        Ok(())
    }

    /// Token auth is preferred unless the password triple is fully populated.
    ///
    /// Independent from [`Credentials::validate`]; both must be run.
    pub fn prefer_token(&self) -> bool {
        !self.has_password_triple()
    }

    pub fn auth_method(&self) -> AuthMethod {
        if self.prefer_token() {
            AuthMethod::Token
        } else {
            AuthMethod::Password
        }
    }

    /// Identity service base URL, without trailing slash
    pub fn effective_auth_url(&self) -> String {
        let url = if self.auth_url.is_empty() {
            DEFAULT_AUTH_URL
        } else {
            &self.auth_url
        };
        url.trim_end_matches('/').to_string()
    }

    /// Region for account-wide services: auth_region > region > default
    pub fn effective_auth_region(&self) -> String {
        [&self.auth_region, &self.region]
            .into_iter()
            .find(|r| !r.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_AUTH_REGION.to_string())
    }
}

/// Scope requested from the identity service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Account,
    Project(String),
}

/// Result of one successful authentication round-trip
#[derive(Clone)]
pub struct Session {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub project_id: Option<String>,
    pub catalog: ServiceCatalog,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &redact(&self.token))
            .field("expires_at", &self.expires_at)
            .field("project_id", &self.project_id)
            .field("catalog", &self.catalog.entries().len())
            .finish()
    }
}

impl Session {
    /// Check if the issued token is already past its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    project: Option<TokenProject>,
    #[serde(default)]
    catalog: ServiceCatalog,
}

#[derive(Debug, Deserialize)]
struct TokenProject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEnvelope {
    catalog: ServiceCatalog,
}

/// Build the `POST /auth/tokens` request body.
fn token_request(credentials: &Credentials, scope: &Scope) -> Value {
    let identity = match credentials.auth_method() {
        AuthMethod::Password => json!({
            "methods": ["password"],
            "password": {
                "user": {
                    "name": credentials.username,
                    "domain": {"name": credentials.domain_name},
                    "password": credentials.password,
                }
            }
        }),
        AuthMethod::Token => json!({
            "methods": ["token"],
            "token": {"id": credentials.token}
        }),
    };

    let scope = match scope {
        Scope::Project(project_id) => json!({"project": {"id": project_id}}),
        Scope::Account => json!({"domain": {"name": credentials.domain_name}}),
    };

    json!({"auth": {"identity": identity, "scope": scope}})
}

/// Identity rejections (bad credentials, unknown project, missing role) are auth errors.
fn map_identity_error(err: ProviderError, scope: &Scope) -> ProviderError {
    match err {
        ProviderError::Api { status, message } if matches!(status, 400 | 401 | 403 | 404) => {
            let target = match scope {
                Scope::Account => "account".to_string(),
                Scope::Project(id) => format!("project {}", id),
            };
            ProviderError::Auth(format!("{} rejected ({}): {}", target, status, message))
        }
        other => other,
    }
}

/// Authenticate against the identity service for `scope`.
///
/// Performs exactly one network round-trip. A pre-issued token used at
/// account scope is presented as-is and only the catalog is fetched.
pub async fn authenticate(
    http: &SelectelHttpClient,
    ctx: &RequestContext,
    credentials: &Credentials,
    scope: &Scope,
) -> Result<Session> {
    let auth_url = credentials.effective_auth_url();
    let method = credentials.auth_method();
    tracing::debug!("Authenticating: method={:?}, scope={:?}", method, scope);

    if method == AuthMethod::Token && *scope == Scope::Account {
        let url = format!("{}/auth/catalog", auth_url);
        let body = ctx
            .run(http.get(&url, &credentials.token))
            .await
            .map_err(|err| map_identity_error(err, scope))?;
        let envelope: CatalogEnvelope = serde_json::from_value(body)?;

        return Ok(Session {
            token: credentials.token.clone(),
            expires_at: None,
            project_id: None,
            catalog: envelope.catalog,
        });
    }

    let url = format!("{}/auth/tokens", auth_url);
    let body = token_request(credentials, scope);
    let token = match method {
        AuthMethod::Token => Some(credentials.token.as_str()),
        AuthMethod::Password => None,
    };

    let response = ctx
        .run(http.post(&url, token, Some(&body)))
        .await
        .map_err(|err| map_identity_error(err, scope))?;

    let issued = response
        .headers
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "identity response has no {} header",
                SUBJECT_TOKEN_HEADER
            ))
        })?;

    let envelope: TokenEnvelope = serde_json::from_value(response.body)?;
    let project_id = match scope {
        Scope::Project(requested) => {
            let granted = envelope.token.project.map(|p| p.id);
            if granted.as_deref().is_some_and(|id| id != requested) {
                return Err(ProviderError::Auth(format!(
                    "identity service scoped the token to another project than {}",
                    requested
                )));
            }
            Some(requested.clone())
        }
        Scope::Account => None,
    };

    if let Some(expires_at) = envelope.token.expires_at {
        tracing::debug!("Token issued, expires at {}", expires_at);
    }
    tracing::debug!(
        "Catalog received with {} services (header {} set on requests)",
        envelope.token.catalog.entries().len(),
        AUTH_TOKEN_HEADER
    );

    Ok(Session {
        token: issued,
        expires_at: envelope.token.expires_at,
        project_id,
        catalog: envelope.token.catalog,
    })
}
