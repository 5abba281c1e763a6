//! Quota reconciliation
//!
//! Project quotas are declared as an unordered set of entries, one per
//! resource name, each carrying scattered `(region, zone, value)` tuples. The
//! quota manager accepts one batch of updates per region, so the declaration
//! is regrouped into a per-region payload and applied with one call per region.

use crate::error::{ProviderError, Result};
use crate::selectel::context::RequestContext;
use crate::selectel::projects::{
    ProjectQuota, ProjectQuotaApi, QuotaOpts, ResourceQuotaOpts, UpdateProjectQuotasOpts,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Quota value of one zone: left as-is, or set to an explicit amount (zero included)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Option<u64>", into = "Option<u64>")]
pub enum QuotaValue {
    #[default]
    Unset,
    Value(u64),
}

impl QuotaValue {
    pub fn as_option(self) -> Option<u64> {
        match self {
            Self::Unset => None,
            Self::Value(v) => Some(v),
        }
    }
}

impl From<Option<u64>> for QuotaValue {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(v) => Self::Value(v),
            None => Self::Unset,
        }
    }
}

impl From<QuotaValue> for Option<u64> {
    fn from(value: QuotaValue) -> Self {
        value.as_option()
    }
}

/// One `(region, zone, value)` tuple as read from a declaration
pub trait QuotaItem {
    fn region(&self) -> &str;
    fn zone(&self) -> Option<&str>;
    fn value(&self) -> QuotaValue;
}

/// Declared quota of one resource in one region/zone
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceQuota {
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default)]
    pub value: QuotaValue,
}

impl ResourceQuota {
    pub fn new(region: &str, zone: Option<&str>, value: u64) -> Self {
        Self {
            region: region.to_string(),
            zone: zone.map(str::to_string),
            value: QuotaValue::Value(value),
        }
    }
}

impl QuotaItem for ResourceQuota {
    fn region(&self) -> &str {
        &self.region
    }

    fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    fn value(&self) -> QuotaValue {
        self.value
    }
}

/// All declared quotas of one resource name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "Q: Deserialize<'de>"))]
pub struct QuotaEntry<Q = ResourceQuota> {
    #[serde(default)]
    pub resource_name: String,
    #[serde(default)]
    pub resource_quotas: Vec<Q>,
}

/// Declared quota set of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDeclaration {
    #[serde(default)]
    pub quotas: Vec<QuotaEntry>,
}

impl QuotaDeclaration {
    pub fn reconcile(&self) -> Result<RegionalQuotaUpdate> {
        reconcile(&self.quotas)
    }

    pub fn resource_names(&self) -> Vec<&str> {
        self.quotas.iter().map(|e| e.resource_name.as_str()).collect()
    }
}

/// `{zone, value}` pair inside a quota group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ZoneQuota {
    pub zone: Option<String>,
    pub value: QuotaValue,
}

/// All zone quotas of one resource within one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaGroup {
    pub resource_name: String,
    pub resource_quotas: Vec<ZoneQuota>,
}

/// Per-region update payloads: one backend call per key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RegionalQuotaUpdate {
    regions: BTreeMap<String, Vec<QuotaGroup>>,
}

impl RegionalQuotaUpdate {
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn groups(&self, region: &str) -> Option<&[QuotaGroup]> {
        self.regions.get(region).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[QuotaGroup])> {
        self.regions.iter().map(|(r, g)| (r.as_str(), g.as_slice()))
    }

    /// Number of update calls needed
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Wire payload for `region`
    pub fn opts(&self, region: &str) -> Option<UpdateProjectQuotasOpts> {
        let groups = self.regions.get(region)?;
        Some(UpdateProjectQuotasOpts {
            quotas: groups
                .iter()
                .map(|group| QuotaOpts {
                    name: group.resource_name.clone(),
                    resource_quotas: group
                        .resource_quotas
                        .iter()
                        .map(|q| ResourceQuotaOpts {
                            zone: q.zone.clone(),
                            value: q.value.as_option(),
                        })
                        .collect(),
                })
                .collect(),
        })
    }
}

/// Group declared quotas by region, then by resource name.
///
/// The whole declaration is validated before anything is returned. Regions
/// and resource names come out in lexicographic order and zone quotas sorted
/// by zone, so the result does not depend on declaration order.
pub fn reconcile<Q: QuotaItem>(entries: &[QuotaEntry<Q>]) -> Result<RegionalQuotaUpdate> {
    let mut buckets: BTreeMap<String, BTreeMap<String, Vec<ZoneQuota>>> = BTreeMap::new();
    let mut seen: HashSet<(&str, &str, Option<&str>)> = HashSet::new();

    for entry in entries {
        if entry.resource_name.is_empty() {
            return Err(ProviderError::Validation(
                "resource_name value isn't provided".to_string(),
            ));
        }
        if entry.resource_quotas.is_empty() {
            return Err(ProviderError::Validation(
                "resource_quotas value isn't provided".to_string(),
            ));
        }

        for quota in &entry.resource_quotas {
            let region = quota.region();
            if region.is_empty() {
                return Err(ProviderError::Validation(
                    "region value isn't provided".to_string(),
                ));
            }
            if !seen.insert((entry.resource_name.as_str(), region, quota.zone())) {
                return Err(ProviderError::Validation(format!(
                    "duplicate quota for {} in region {} zone {}",
                    entry.resource_name,
                    region,
                    quota.zone().unwrap_or("-")
                )));
            }

            buckets
                .entry(region.to_string())
                .or_default()
                .entry(entry.resource_name.clone())
                .or_default()
                .push(ZoneQuota {
                    zone: quota.zone().map(str::to_string),
                    value: quota.value(),
                });
        }
    }

    let regions = buckets
        .into_iter()
        .map(|(region, groups)| {
            let groups = groups
                .into_iter()
                .map(|(resource_name, mut resource_quotas)| {
                    resource_quotas.sort();
                    QuotaGroup {
                        resource_name,
                        resource_quotas,
                    }
                })
                .collect();
            (region, groups)
        })
        .collect();

    Ok(RegionalQuotaUpdate { regions })
}

/// A per-region update failed; earlier regions stay applied
#[derive(Debug, Error)]
#[error("failed to update quotas in region {failed_region} (already applied: {applied:?}): {source}")]
pub struct QuotaApplyError {
    pub applied: Vec<String>,
    pub failed_region: String,
    #[source]
    pub source: ProviderError,
}

/// Send one update call per region, in region order.
///
/// Not transactional: the first failure stops the run and is reported along
/// with the regions already updated. Re-applying converges.
pub async fn apply_quota_updates(
    api: &dyn ProjectQuotaApi,
    ctx: &RequestContext,
    project_id: &str,
    updates: &RegionalQuotaUpdate,
) -> std::result::Result<Vec<String>, QuotaApplyError> {
    let mut applied = Vec::with_capacity(updates.len());

    for (region, groups) in updates.iter() {
        let Some(opts) = updates.opts(region) else {
            continue;
        };
        tracing::info!(
            "Updating {} quota groups of project {} in {}",
            groups.len(),
            project_id,
            region
        );

        if let Err(source) = api.update_project_quotas(ctx, project_id, region, &opts).await {
            tracing::error!("Quota update failed in {}: {}", region, source);
            return Err(QuotaApplyError {
                applied,
                failed_region: region.to_string(),
                source,
            });
        }
        applied.push(region.to_string());
    }

    Ok(applied)
}

/// Turn per-region quota reads back into a declaration.
/// Entries come out sorted by resource name, tuples by region then zone.
pub fn flatten_quotas(per_region: &[(String, Vec<ProjectQuota>)]) -> QuotaDeclaration {
    let mut by_name: BTreeMap<String, Vec<ResourceQuota>> = BTreeMap::new();

    for (region, quotas) in per_region {
        for quota in quotas {
            let tuples = by_name.entry(quota.name.clone()).or_default();
            tuples.extend(quota.resource_quotas.iter().map(|state| ResourceQuota {
                region: region.clone(),
                zone: state.zone.clone(),
                value: state.value.into(),
            }));
        }
    }

    QuotaDeclaration {
        quotas: by_name
            .into_iter()
            .map(|(resource_name, mut resource_quotas)| {
                resource_quotas.sort_by(|a, b| (&a.region, &a.zone).cmp(&(&b.region, &b.zone)));
                QuotaEntry {
                    resource_name,
                    resource_quotas,
                }
            })
            .collect(),
    }
}
