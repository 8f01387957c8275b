use super::device_selection::AcceleratorMemory;

/// Domain interface for querying accelerator memory.
///
/// Returns `Ok(None)` when no accelerator is present.
pub trait MemoryProbe: Send + Sync {
    fn query(&self) -> Result<Option<AcceleratorMemory>, Box<dyn std::error::Error>>;
}

