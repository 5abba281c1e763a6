//! Named entity lookup
//!
//! Declarative configurations may reference a remote object by name (plus a
//! few discriminators) instead of by ID. The list APIs only filter by part of
//! those dimensions server-side, so the full filter is always re-checked here
//! and the "exactly one match" rule is enforced client-side.

use crate::error::{ProviderError, Result};
use crate::selectel::context::RequestContext;
use crate::selectel::global_router::{
    GlobalRouterApi, ListOptions, RouterQuota, Service, Zone, ZoneGroup,
};
use std::fmt::Debug;

/// Composite lookup filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub name: String,
    pub service: Option<String>,
    pub scope: Option<String>,
    pub scope_value: Option<String>,
}

impl FilterQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_scope_value(mut self, scope_value: impl Into<String>) -> Self {
        self.scope_value = Some(scope_value.into());
        self
    }

    fn list_options(&self) -> ListOptions {
        ListOptions::by_name(&self.name)
    }
}

/// How a lookup reports a non-unique result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Zero matches and several matches are distinct errors
    Distinct,
    /// Any count other than one reports "no results"
    Collapsed,
}

/// Entities that can be matched against a [`FilterQuery`]
pub trait Filterable: Debug {
    /// How this entity kind reports ambiguous lookups
    const CARDINALITY: Cardinality = Cardinality::Distinct;

    fn matches(&self, filter: &FilterQuery) -> bool;
}

/// Return the single element of `items` accepted by `predicate`.
pub fn resolve_one<T, P>(items: Vec<T>, predicate: P) -> Result<T>
where
    T: Debug,
    P: Fn(&T) -> bool,
{
    resolve_with(items, predicate, Cardinality::Distinct)
}

/// [`resolve_one`] with an explicit [`Cardinality`] policy.
pub fn resolve_with<T, P>(items: Vec<T>, predicate: P, cardinality: Cardinality) -> Result<T>
where
    T: Debug,
    P: Fn(&T) -> bool,
{
    let mut matched: Vec<T> = items.into_iter().filter(|item| predicate(item)).collect();

    match matched.len() {
        0 => Err(ProviderError::NoResults),
        1 => Ok(matched.remove(0)),
        count => {
            tracing::debug!("Lookup matched {} entities: {:?}", count, matched);
            match cardinality {
                Cardinality::Distinct => Err(ProviderError::MultipleResults),
                Cardinality::Collapsed => Err(ProviderError::NoResults),
            }
        }
    }
}

/// Resolve one [`Filterable`] entity using its kind's cardinality policy.
pub fn resolve_filtered<T: Filterable>(items: Vec<T>, filter: &FilterQuery) -> Result<T> {
    resolve_with(items, |item| item.matches(filter), T::CARDINALITY)
}

fn optional_eq(wanted: &Option<String>, actual: Option<&str>) -> bool {
    match wanted {
        Some(wanted) => actual == Some(wanted.as_str()),
        None => true,
    }
}

impl Filterable for Zone {
    // Zones are addressed by name + service; an ambiguous pair is reported
    // as "not found" rather than "more than one result".
    const CARDINALITY: Cardinality = Cardinality::Collapsed;

    fn matches(&self, filter: &FilterQuery) -> bool {
        self.name == filter.name && filter.service.as_deref() == Some(self.service.as_str())
    }
}

impl Filterable for Service {
    fn matches(&self, filter: &FilterQuery) -> bool {
        self.name == filter.name
    }
}

impl Filterable for ZoneGroup {
    fn matches(&self, filter: &FilterQuery) -> bool {
        self.name == filter.name
    }
}

impl Filterable for RouterQuota {
    fn matches(&self, filter: &FilterQuery) -> bool {
        self.name == filter.name
            && optional_eq(&filter.scope, Some(self.scope.as_str()))
            && optional_eq(&filter.scope_value, self.scope_value.as_deref())
    }
}

/// Find the zone named `filter.name` offered by `filter.service`.
pub async fn find_zone(
    api: &dyn GlobalRouterApi,
    ctx: &RequestContext,
    filter: &FilterQuery,
) -> Result<Zone> {
    if filter.service.as_deref().map_or(true, str::is_empty) {
        return Err(ProviderError::Validation(
            "service value isn't provided".to_string(),
        ));
    }
    let zones = api.list_zones(ctx, &filter.list_options()).await?;
    resolve_filtered(zones, filter)
}

pub async fn find_service(
    api: &dyn GlobalRouterApi,
    ctx: &RequestContext,
    filter: &FilterQuery,
) -> Result<Service> {
    let services = api.list_services(ctx, &filter.list_options()).await?;
    resolve_filtered(services, filter)
}

pub async fn find_zone_group(
    api: &dyn GlobalRouterApi,
    ctx: &RequestContext,
    filter: &FilterQuery,
) -> Result<ZoneGroup> {
    let groups = api.list_zone_groups(ctx, &filter.list_options()).await?;
    resolve_filtered(groups, filter)
}

/// Find a quota by name, narrowed by scope and scope value when given.
pub async fn find_quota(
    api: &dyn GlobalRouterApi,
    ctx: &RequestContext,
    filter: &FilterQuery,
) -> Result<RouterQuota> {
    let quotas = api.list_quotas(ctx, &filter.list_options()).await?;
    resolve_filtered(quotas, filter)
}
