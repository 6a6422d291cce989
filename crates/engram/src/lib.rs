//! Public surface for the engram memory layer.
//!
//! This crate re-exports the core building blocks and provides a small
//! initialization helper to keep consumer setup consistent.

/// Re-export for convenience.
pub use engram_core as core;
/// Re-export for convenience.
pub use engram_protocol as protocol;
/// Re-export for convenience.
pub use engram_store as store;
/// Re-export for convenience.
pub use engram_tools as tools;

/// Build an orchestrator from environment configuration and verify
/// connectivity.
///
/// Returns `None` when the connectivity check fails. A deliberately
/// disabled subsystem still returns the orchestrator, whose operations
/// short-circuit, so callers keep a single code path.
pub async fn initialize_memory_system(agent_id: &str) -> Option<engram_core::MemoryOrchestrator> {
    let config = engram_core::MemoryConfig::from_env();
    let memory = engram_core::MemoryOrchestrator::from_config(config, agent_id);
    match memory.initialize().await {
        Ok(()) => Some(memory),
        Err(err) => {
            log::warn!("failed to initialize memory system ({err})");
            None
        }
    }
}

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
