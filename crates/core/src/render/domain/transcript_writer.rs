use std::path::Path;

/// Persists a rendered transcript.
///
/// Implementations must leave either the complete transcript or nothing
/// at `path`.
pub trait TranscriptWriter: Send {
    fn write(&self, path: &Path, contents: &str) -> Result<(), Box<dyn std::error::Error>>;
}
