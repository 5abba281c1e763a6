//! Selectel Client
//!
//! [`ClientFactory`] turns validated credentials into [`ScopedClient`]
//! handles. Every handle is the product of one authentication round-trip and
//! belongs to the operation that asked for it.

use super::auth::{self, Credentials, Scope, Session};
use super::catalog::ServiceCatalog;
use super::context::RequestContext;
use super::http::SelectelHttpClient;
use crate::error::{ProviderError, Result};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Validate a Selectel project ID: 32 hex digits, dashes allowed (UUID form)
pub fn validate_project_id(project_id: &str) -> Result<()> {
    if uuid::Uuid::try_parse(project_id).is_err() {
        return Err(ProviderError::Config(format!(
            "project_id is invalid: {}",
            project_id
        )));
    }
    Ok(())
}

/// Produces scoped clients from one immutable set of credentials
#[derive(Clone)]
pub struct ClientFactory {
    credentials: Arc<Credentials>,
    http: SelectelHttpClient,
}

impl ClientFactory {
    /// Validate `credentials` and build a factory around them.
    pub fn new(mut credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        Ok(Self {
            credentials: Arc::new(credentials),
            http: SelectelHttpClient::new()?,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Authenticate at account scope (routers, global zones, IAM entities).
    pub async fn account_client(&self, ctx: &RequestContext) -> Result<ScopedClient> {
        let session =
            auth::authenticate(&self.http, ctx, &self.credentials, &Scope::Account).await?;
        Ok(self.client(session))
    }

    /// Authenticate and scope the handle to `project_id`.
    pub async fn project_client(
        &self,
        ctx: &RequestContext,
        project_id: &str,
    ) -> Result<ScopedClient> {
        validate_project_id(project_id)?;
        let scope = Scope::Project(project_id.to_string());
        let session = auth::authenticate(&self.http, ctx, &self.credentials, &scope).await?;
        Ok(self.client(session))
    }

    fn client(&self, session: Session) -> ScopedClient {
        let region = (!self.credentials.region.is_empty()).then(|| self.credentials.region.clone());
        ScopedClient {
            http: self.http.clone(),
            credentials: Arc::clone(&self.credentials),
            session,
            region,
        }
    }
}

/// Authenticated handle bound to an account or project scope and optionally a region
#[derive(Clone)]
pub struct ScopedClient {
    http: SelectelHttpClient,
    credentials: Arc<Credentials>,
    session: Session,
    region: Option<String>,
}

impl ScopedClient {
    /// Project the handle is scoped to, `None` at account scope
    pub fn project_id(&self) -> Option<&str> {
        self.session.project_id.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.session.catalog
    }

    /// Resell API base URL from the validated credentials
    pub fn resell_endpoint(&self) -> &str {
        &self.credentials.endpoint
    }

    /// Region used for account-wide services
    pub fn auth_region(&self) -> String {
        self.credentials.effective_auth_region()
    }

    /// Bind the handle to `region`
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Catalog URL of `service_type` in `region`
    pub fn resolve_endpoint(&self, service_type: &str, region: &str) -> Result<Url> {
        self.session.catalog.endpoint(service_type, region)
    }

    /// Catalog URL of `service_type` in the bound region
    pub fn endpoint(&self, service_type: &str) -> Result<Url> {
        let Some(region) = self.region.as_deref() else {
            return Err(ProviderError::Config(format!(
                "region must be set to reach the {} service",
                service_type
            )));
        };
        self.resolve_endpoint(service_type, region)
    }

    /// Make a GET request with the session token
    pub async fn get(&self, ctx: &RequestContext, url: &str) -> Result<Value> {
        ctx.run(self.http.get(url, &self.session.token)).await
    }

    /// Make a PATCH request with the session token
    pub async fn patch(&self, ctx: &RequestContext, url: &str, body: &Value) -> Result<Value> {
        ctx.run(self.http.patch(url, &self.session.token, body)).await
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
