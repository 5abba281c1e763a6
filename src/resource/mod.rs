//! Declarative-to-imperative layer
//!
//! This module turns what a configuration declares into the calls the
//! Selectel services expect.
//!
//! # Architecture
//!
//! - [`lookup`] - Resolves exactly one remote entity from a name-based filter
//! - [`quota`] - Regroups declared quotas into per-region update payloads and applies them
//! - [`manifest`] - Reads and writes quota declaration files
//!
//! # Example
//!
//! ```ignore
//! use selvpc::resource::quota::{apply_quota_updates, QuotaDeclaration};
//!
//! async fn apply(
//!     client: &ScopedClient,
//!     ctx: &RequestContext,
//!     declaration: &QuotaDeclaration,
//! ) -> anyhow::Result<()> {
//!     let updates = declaration.reconcile()?;
//!     apply_quota_updates(client, ctx, "a1b2c3d4e5f60718293a4b5c6d7e8f90", &updates).await?;
//!     Ok(())
//! }
//! ```

pub mod lookup;
pub mod manifest;
pub mod quota;

pub use lookup::{
    find_quota, find_service, find_zone, find_zone_group, resolve_one, Cardinality, FilterQuery,
    Filterable,
};
pub use quota::{
    apply_quota_updates, flatten_quotas, reconcile, QuotaApplyError, QuotaDeclaration, QuotaEntry,
    QuotaItem, QuotaValue, RegionalQuotaUpdate, ResourceQuota,
};
