use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeFormatError {
    #[error("cannot format negative offset {0}s")]
    Negative(f64),
    #[error("cannot format non-finite offset")]
    NotFinite,
}

/// Format a second offset as `HH:MM:SS.mmm`.
///
/// Milliseconds are truncated, never rounded. Hours are zero-padded to two
/// digits and simply grow wider past 99.
pub fn format_timestamp(seconds: f64) -> Result<String, TimeFormatError> {
    if !seconds.is_finite() {
        return Err(TimeFormatError::NotFinite);
    }
    if seconds < 0.0 {
        return Err(TimeFormatError::Negative(seconds));
    }

    let total_ms = (seconds * 1000.0).floor() as u64;
    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    Ok(format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}"))
}
