use std::fmt;

/// Access token for the gated diarization model. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct DiarizationCredential(String);

impl DiarizationCredential {
    /// Returns None for blank tokens.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DiarizationCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DiarizationCredential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let credential = DiarizationCredential::new("hf_secret").unwrap();
        let printed = format!("{credential:?}");
        assert!(!printed.contains("hf_secret"));
    }

    #[test]
    fn test_trims_token() {
        let credential = DiarizationCredential::new("  hf_abc\n").unwrap();
        assert_eq!(credential.expose(), "hf_abc");
    }

    #[test]
    fn test_blank_token_is_none() {
        assert!(DiarizationCredential::new("   ").is_none());
    }
}
