use std::fmt;

/// Why a segment has no speaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// Diarization produced no intervals at all.
    NoDiarization,
    /// No diarization interval overlaps the segment.
    NoOverlap,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnresolvedReason::NoDiarization => "no diarization output",
            UnresolvedReason::NoOverlap => "no overlapping speaker turn",
        })
    }
}

/// Outcome of resolving a segment's speaker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeakerAttribution {
    Resolved(String),
    Unresolved(UnresolvedReason),
}

impl SpeakerAttribution {
    pub fn speaker_label(&self) -> Option<&str> {
        match self {
            SpeakerAttribution::Resolved(label) => Some(label),
            SpeakerAttribution::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, SpeakerAttribution::Resolved(_))
    }
}

/// A timed word with the speaker it was attributed to, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributedWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub score: f32,
    pub speaker: Option<String>,
}

/// An aligned segment with its speaker resolved against diarization.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub words: Vec<AttributedWord>,
    pub speaker: SpeakerAttribution,
}

impl MergedSegment {
    pub fn speaker_label(&self) -> Option<&str> {
        self.speaker.speaker_label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_label() {
        let attribution = SpeakerAttribution::Resolved("SPEAKER_00".into());
        assert_eq!(attribution.speaker_label(), Some("SPEAKER_00"));
        assert!(attribution.is_resolved());
    }

    #[test]
    fn test_unresolved_has_no_label() {
        let attribution = SpeakerAttribution::Unresolved(UnresolvedReason::NoOverlap);
        assert_eq!(attribution.speaker_label(), None);
        assert!(!attribution.is_resolved());
    }
}
