//! Test doubles for the engram memory layer.

pub mod service;

/// In-memory stub service with failure injection and call counting.
pub use service::{StubCallCounts, StubMemoryService};
