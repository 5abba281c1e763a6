//! Selectel provider core
//!
//! Reusable pieces of a declarative Selectel provider:
//!
//! - credential validation and auth mode selection ([`selectel::auth`])
//! - account/project scoped clients with service catalog lookup ([`selectel::client`])
//! - "exactly one match" lookups of entities referenced by name ([`resource::lookup`])
//! - regrouping of declared quotas into per-region update calls ([`resource::quota`])

pub mod config;
pub mod error;
pub mod resource;
pub mod selectel;

pub use error::{ProviderError, Result};
