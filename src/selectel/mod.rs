//! Selectel API interaction module
//!
//! This module provides the core functionality for talking to Selectel
//! services: credential validation, authentication, service catalog lookup
//! and the narrow per-service APIs used by the reconciliation layer.
//!
//! # Module Structure
//!
//! - [`auth`] - Credential validation and the identity round-trip
//! - [`catalog`] - Service catalog and endpoint lookup
//! - [`client`] - Client factory and scoped client handles
//! - [`context`] - Per-operation deadlines
//! - [`http`] - HTTP utilities for REST API calls
//! - [`global_router`] - Listing of zones, services, zone groups and quotas
//! - [`projects`] - Projects and per-region project quotas
//!
//! # Example
//!
//! ```ignore
//! use selvpc::selectel::{client::ClientFactory, context::RequestContext};
//!
//! async fn example(factory: &ClientFactory) -> selvpc::error::Result<()> {
//!     let ctx = RequestContext::background();
//!     let client = factory.project_client(&ctx, "a1b2c3d4e5f60718293a4b5c6d7e8f90").await?;
//!     let url = client.resolve_endpoint("quota-manager", "ru-1")?;
//!     println!("{}", url);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod catalog;
pub mod client;
pub mod context;
pub mod global_router;
pub mod http;
pub mod projects;
