//! Selectel Projects
//!
//! Project listing through the resell API and per-region project quotas
//! through the quota manager service.

use super::catalog::join_path;
use super::client::ScopedClient;
use super::context::RequestContext;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Catalog service type of the quota manager
pub const QUOTA_MANAGER_SERVICE: &str = "quota-manager";

/// Project information
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

/// List all projects of the account
pub async fn list_projects(client: &ScopedClient, ctx: &RequestContext) -> Result<Vec<Project>> {
    let url = format!("{}/projects", client.resell_endpoint().trim_end_matches('/'));
    let response = client.get(ctx, &url).await?;

    let projects = response
        .get("projects")
        .cloned()
        .ok_or_else(|| {
            ProviderError::InvalidResponse("projects list has no 'projects' key".to_string())
        })?;

    Ok(serde_json::from_value(projects)?)
}

/// One `{zone, value}` pair of an update payload.
/// A missing value leaves the quota as-is; `Some(0)` sets it to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuotaOpts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
}

/// All zone quotas of one resource in one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaOpts {
    pub name: String,
    pub resource_quotas: Vec<ResourceQuotaOpts>,
}

/// Body of one per-region update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProjectQuotasOpts {
    pub quotas: Vec<QuotaOpts>,
}

/// Quota of one resource as reported by the quota manager
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectQuota {
    pub name: String,
    #[serde(default)]
    pub resource_quotas: Vec<ResourceQuotaState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceQuotaState {
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub value: Option<u64>,
    #[serde(default)]
    pub used: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProjectQuotasEnvelope {
    #[serde(default)]
    quotas: Vec<ProjectQuota>,
}

/// Per-region quota calls of a project
#[async_trait]
pub trait ProjectQuotaApi: Send + Sync {
    async fn get_project_quotas(
        &self,
        ctx: &RequestContext,
        project_id: &str,
        region: &str,
    ) -> Result<Vec<ProjectQuota>>;

    async fn update_project_quotas(
        &self,
        ctx: &RequestContext,
        project_id: &str,
        region: &str,
        opts: &UpdateProjectQuotasOpts,
    ) -> Result<Vec<ProjectQuota>>;
}

fn quotas_url(client: &ScopedClient, project_id: &str, region: &str) -> Result<String> {
    let base = client.resolve_endpoint(QUOTA_MANAGER_SERVICE, region)?;
    Ok(join_path(&base, &["projects", project_id, "quotas"]))
}

fn parse_quotas(body: Value) -> Result<Vec<ProjectQuota>> {
    if body.is_null() {
        return Ok(Vec::new());
    }
    let envelope: ProjectQuotasEnvelope = serde_json::from_value(body)?;
    Ok(envelope.quotas)
}

#[async_trait]
impl ProjectQuotaApi for ScopedClient {
    async fn get_project_quotas(
        &self,
        ctx: &RequestContext,
        project_id: &str,
        region: &str,
    ) -> Result<Vec<ProjectQuota>> {
        let url = quotas_url(self, project_id, region)?;
        parse_quotas(self.get(ctx, &url).await?)
    }

    async fn update_project_quotas(
        &self,
        ctx: &RequestContext,
        project_id: &str,
        region: &str,
        opts: &UpdateProjectQuotasOpts,
    ) -> Result<Vec<ProjectQuota>> {
        let url = quotas_url(self, project_id, region)?;
        let body = serde_json::to_value(opts)?;
        parse_quotas(self.patch(ctx, &url, &body).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unset_value_is_omitted() {
        let opts = UpdateProjectQuotasOpts {
            quotas: vec![QuotaOpts {
                name: "image_gigabytes".to_string(),
                resource_quotas: vec![
                    ResourceQuotaOpts {
                        zone: None,
                        value: None,
                    },
                    ResourceQuotaOpts {
                        zone: Some("ru-1a".to_string()),
                        value: Some(0),
                    },
                ],
            }],
        };

        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({
                "quotas": [{
                    "name": "image_gigabytes",
                    "resource_quotas": [{}, {"zone": "ru-1a", "value": 0}]
                }]
            })
        );
    }

    #[test]
    fn test_parse_quotas() {
        let quotas = parse_quotas(json!({
            "quotas": [{
                "name": "compute_cores",
                "resource_quotas": [{"zone": "ru-1b", "value": 4, "used": 2}]
            }]
        }))
        .unwrap();
        assert_eq!(quotas.len(), 1);
        assert_eq!(quotas[0].resource_quotas[0].used, Some(2));

        assert!(parse_quotas(Value::Null).unwrap().is_empty());
    }
}
