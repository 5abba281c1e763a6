//! Global Router
//!
//! List APIs for the account-wide global router entities that declarative
//! configurations reference by name: zones, services, zone groups and quotas.
//! The service only filters by `name` server-side; everything else is
//! re-checked by [`crate::resource::lookup`].

use super::catalog::join_path;
use super::client::ScopedClient;
use super::context::RequestContext;
use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Catalog service type of the global router API
pub const SERVICE_TYPE: &str = "global-router";

/// A zone a router can be attached to, offered by one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub service: String,
    #[serde(default)]
    pub visible_name: Option<String>,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub allow_create: bool,
    #[serde(default)]
    pub allow_delete: bool,
    #[serde(default)]
    pub options: Value,
}

/// A service the global router can connect (vpc, dedicated, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub extension: Option<String>,
}

/// A named group of zones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A global router quota, partitioned by scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterQuota {
    pub id: String,
    pub name: String,
    pub scope: String,
    #[serde(default)]
    pub scope_value: Option<String>,
    #[serde(default)]
    pub limit: i64,
}

/// Server-side list filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub name: Option<String>,
}

impl ListOptions {
    pub fn by_name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
        }
    }

    fn query(&self) -> String {
        match &self.name {
            Some(name) => format!("?name={}", urlencoding::encode(name)),
            None => String::new(),
        }
    }
}

/// List calls used by named lookups
#[async_trait]
pub trait GlobalRouterApi: Send + Sync {
    async fn list_zones(&self, ctx: &RequestContext, opts: &ListOptions) -> Result<Vec<Zone>>;
    async fn list_services(
        &self,
        ctx: &RequestContext,
        opts: &ListOptions,
    ) -> Result<Vec<Service>>;
    async fn list_zone_groups(
        &self,
        ctx: &RequestContext,
        opts: &ListOptions,
    ) -> Result<Vec<ZoneGroup>>;
    async fn list_quotas(
        &self,
        ctx: &RequestContext,
        opts: &ListOptions,
    ) -> Result<Vec<RouterQuota>>;
}

/// HTTP implementation of [`GlobalRouterApi`] over an account-scoped client
pub struct GlobalRouterClient {
    client: ScopedClient,
    region: String,
}

impl GlobalRouterClient {
    /// Use the bound region of `client`, or the account auth region
    pub fn new(client: ScopedClient) -> Self {
        let region = client
            .region()
            .map(str::to_string)
            .unwrap_or_else(|| client.auth_region());
        Self { client, region }
    }

    async fn list<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        collection: &str,
        opts: &ListOptions,
    ) -> Result<Vec<T>> {
        let base = self.client.resolve_endpoint(SERVICE_TYPE, &self.region)?;
        let url = format!("{}{}", join_path(&base, &[collection]), opts.query());
        let response = self.client.get(ctx, &url).await?;

        let items = response
            .get(collection)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let items: Vec<T> = serde_json::from_value(items)?;

        tracing::debug!("Listed {} {} (filter {:?})", items.len(), collection, opts.name);
        Ok(items)
    }
}

#[async_trait]
impl GlobalRouterApi for GlobalRouterClient {
    async fn list_zones(&self, ctx: &RequestContext, opts: &ListOptions) -> Result<Vec<Zone>> {
        self.list(ctx, "zones", opts).await
    }

    async fn list_services(
        &self,
        ctx: &RequestContext,
        opts: &ListOptions,
    ) -> Result<Vec<Service>> {
        self.list(ctx, "services", opts).await
    }

    async fn list_zone_groups(
        &self,
        ctx: &RequestContext,
        opts: &ListOptions,
    ) -> Result<Vec<ZoneGroup>> {
        self.list(ctx, "zone_groups", opts).await
    }

    async fn list_quotas(
        &self,
        ctx: &RequestContext,
        opts: &ListOptions,
    ) -> Result<Vec<RouterQuota>> {
        self.list(ctx, "quotas", opts).await
    }
}
