use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::merge::domain::merged_segment::MergedSegment;
use crate::shared::constants::UNKNOWN_SPEAKER_LABEL;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown unresolved-speaker policy '{0}' (expected 'unknown' or 'skip')")]
pub struct UnresolvedPolicyParseError(pub String);

/// What both render modes do with a segment that has no speaker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnresolvedSpeakerPolicy {
    /// Render under the pseudo-speaker `UNKNOWN`.
    #[default]
    Unknown,
    /// Leave the segment out of the transcript.
    Skip,
}

impl UnresolvedSpeakerPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvedSpeakerPolicy::Unknown => "unknown",
            UnresolvedSpeakerPolicy::Skip => "skip",
        }
    }

    /// Speaker to render `segment` under, or None to leave it out.
    pub fn speaker_for<'a>(&self, segment: &'a MergedSegment) -> Option<&'a str> {
        match (segment.speaker_label(), self) {
            (Some(label), _) => Some(label),
            (None, UnresolvedSpeakerPolicy::Unknown) => Some(UNKNOWN_SPEAKER_LABEL),
            (None, UnresolvedSpeakerPolicy::Skip) => None,
        }
    }
}

impl fmt::Display for UnresolvedSpeakerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnresolvedSpeakerPolicy {
    type Err = UnresolvedPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(UnresolvedSpeakerPolicy::Unknown),
            "skip" => Ok(UnresolvedSpeakerPolicy::Skip),
            _ => Err(UnresolvedPolicyParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::domain::merged_segment::{SpeakerAttribution, UnresolvedReason};

    fn segment(speaker: SpeakerAttribution) -> MergedSegment {
        MergedSegment {
            start: 0.0,
            end: 1.0,
            text: " hi".into(),
            words: Vec::new(),
            speaker,
        }
    }

    #[test]
    fn test_resolved_speaker_is_kept_under_both_policies() {
        let seg = segment(SpeakerAttribution::Resolved("SPEAKER_01".into()));
        assert_eq!(UnresolvedSpeakerPolicy::Unknown.speaker_for(&seg), Some("SPEAKER_01"));
        assert_eq!(UnresolvedSpeakerPolicy::Skip.speaker_for(&seg), Some("SPEAKER_01"));
    }

    #[test]
    fn test_unresolved_speaker() {
        let seg = segment(SpeakerAttribution::Unresolved(UnresolvedReason::NoOverlap));
        assert_eq!(UnresolvedSpeakerPolicy::Unknown.speaker_for(&seg), Some("UNKNOWN"));
        assert_eq!(UnresolvedSpeakerPolicy::Skip.speaker_for(&seg), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Skip".parse(), Ok(UnresolvedSpeakerPolicy::Skip));
        assert_eq!("unknown".parse(), Ok(UnresolvedSpeakerPolicy::Unknown));
        assert!("drop".parse::<UnresolvedSpeakerPolicy>().is_err());
    }

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(UnresolvedSpeakerPolicy::default(), UnresolvedSpeakerPolicy::Unknown);
    }
}
