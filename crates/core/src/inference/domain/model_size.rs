use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown model size '{0}', expected one of: tiny, base, small, medium, large, large-v2, large-v3")]
pub struct ModelSizeParseError(pub String);

/// Recognition model sizes, smallest to largest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
    LargeV2,
    LargeV3,
}

impl ModelSize {
    pub const ALL: &[ModelSize] = &[
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
        ModelSize::LargeV2,
        ModelSize::LargeV3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
            ModelSize::LargeV2 => "large-v2",
            ModelSize::LargeV3 => "large-v3",
        }
    }

    /// The large family is multilingual only.
    pub fn has_english_variant(&self) -> bool {
        !matches!(
            self,
            ModelSize::Large | ModelSize::LargeV2 | ModelSize::LargeV3
        )
    }

    /// Model identifier, with the `.en` suffix when an English-only
    /// variant is requested and exists.
    pub fn model_id(&self, english_only: bool) -> String {
        let base = match self {
            ModelSize::Large => "large-v1",
            other => other.as_str(),
        };
        if english_only && self.has_english_variant() {
            format!("{base}.en")
        } else {
            base.to_string()
        }
    }

    pub fn ggml_filename(&self, english_only: bool) -> String {
        format!("ggml-{}.bin", self.model_id(english_only))
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = ModelSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ModelSize::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == needle)
            .ok_or_else(|| ModelSizeParseError(s.to_string()))
    }
}
