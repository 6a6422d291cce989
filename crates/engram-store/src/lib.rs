//! Remote store support for engram: the keyed-store service contract, an
//! HTTP transport, scope resolution, and the entry adapter.

pub mod adapter;
pub mod error;
pub mod http;
pub mod scope;
pub mod service;

/// Entry-level adapter over a remote memory service.
pub use adapter::RemoteStore;
/// Store error type.
pub use error::StoreError;
/// HTTP-backed service implementation.
pub use http::{DEFAULT_BASE_URL, HttpMemoryService};
/// Scope derivation between agent ids and remote identities.
pub use scope::{DEFAULT_SCOPE_PREFIX, PrefixScopeResolver, ScopeResolver};
/// Remote service contract and record shape.
pub use service::{MemoryService, ServiceRecord};
