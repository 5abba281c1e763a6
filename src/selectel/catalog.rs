//! Service catalog
//!
//! The identity service returns one catalog document per authenticated
//! handle. Each Selectel service (DNS, managed databases, Kubernetes,
//! quota manager, ...) advertises its region-specific base URL there.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Only publicly reachable endpoints are ever returned
const PUBLIC_INTERFACE: &str = "public";

/// One endpoint advertised by a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    #[serde(default)]
    pub id: Option<String>,
    pub interface: String,
    #[serde(default)]
    pub region_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub url: String,
}

impl CatalogEndpoint {
    fn region_name(&self) -> Option<&str> {
        self.region_id.as_deref().or(self.region.as_deref())
    }
}

/// One service with all of its endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

/// Directory mapping `(service type, region)` to a base URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog {
    entries: Vec<CatalogEntry>,
}

impl ServiceCatalog {
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Look up the public endpoint of `service_type` in `region`.
    pub fn endpoint(&self, service_type: &str, region: &str) -> Result<Url> {
        let found = self
            .entries
            .iter()
            .filter(|entry| entry.service_type == service_type)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| {
                endpoint.interface == PUBLIC_INTERFACE && endpoint.region_name() == Some(region)
            });

        let Some(endpoint) = found else {
            tracing::debug!(
                "No catalog entry for service={} region={} ({} services in catalog)",
                service_type,
                region,
                self.entries.len()
            );
            return Err(ProviderError::EndpointNotFound {
                service_type: service_type.to_string(),
                region: region.to_string(),
            });
        };

        Url::parse(&endpoint.url).map_err(|err| {
            ProviderError::InvalidResponse(format!(
                "catalog URL for {} in {} is not valid: {}",
                service_type, region, err
            ))
        })
    }

    /// Regions in which `service_type` has a public endpoint
    pub fn regions(&self, service_type: &str) -> Vec<String> {
        let mut regions: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.service_type == service_type)
            .flat_map(|entry| entry.endpoints.iter())
            .filter(|endpoint| endpoint.interface == PUBLIC_INTERFACE)
            .filter_map(|endpoint| endpoint.region_name().map(str::to_string))
            .collect();
        regions.sort();
        regions.dedup();
        regions
    }
}

/// Append path segments to a catalog base URL.
/// Catalog URLs come with or without a trailing slash; both are accepted.
pub fn join_path(base: &Url, segments: &[&str]) -> String {
    let mut url = base.as_str().trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(&urlencoding::encode(segment));
    }
    url
}
