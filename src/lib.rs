//! # OData Relay Library
//!
//! Authenticating relay in front of a vendor OData API. Logs in with the
//! configured service credentials, keeps the bearer token fresh, and
//! resolves logical resource names against the vendor by trying candidate
//! paths until one answers.
//!
//! Modules:
//! - `config`: service configuration, loading and validation
//! - `cache`: bearer token and its refresh manager
//! - `sources`: outbound HTTP transport
//! - `parser`: login response and schema document parsing
//! - `resolver`: candidate paths, schema discovery, the attempt loop
//! - `server`: axum routes, shared-secret gate, diagnostics

pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod resolver;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
pub mod tests;

pub use crate::error::{ProxyError, ProxyResult};
