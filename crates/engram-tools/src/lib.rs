//! Caller-facing operation surface for the memory layer.

pub mod memory_tool;

/// The memory tool and its request/response envelope.
pub use memory_tool::{MemoryTool, MemoryToolRequest, MemoryToolResponse};
