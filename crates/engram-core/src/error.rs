//! Error types for the memory core.

/// Errors surfaced by explicit initialization.
///
/// Public orchestrator operations never return these; they report outcomes
/// through result structs instead.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The subsystem disabled itself over a configuration problem.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Remote store failure.
    #[error(transparent)]
    Store(#[from] engram_store::StoreError),
}
