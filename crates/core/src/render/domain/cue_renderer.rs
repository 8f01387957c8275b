use std::fmt;

use thiserror::Error;

use crate::merge::domain::merged_segment::MergedSegment;
use crate::shared::time_format::{format_timestamp, TimeFormatError};

use super::unresolved_policy::UnresolvedSpeakerPolicy;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("segment {segment} has an unrenderable timestamp: {source}")]
    Timestamp {
        segment: usize,
        #[source]
        source: TimeFormatError,
    },
}

/// One numbered block of a cue transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cue {
    pub index: usize,
    pub start: String,
    pub end: String,
    pub speaker: String,
    pub text: String,
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n<v.{}>{}</v>\n\n",
            self.index, self.start, self.end, self.speaker, self.text
        )
    }
}

/// Build cues numbered from 1 with no gaps.
///
/// Segments the policy leaves out do not consume a number.
pub fn build_cues(
    segments: &[MergedSegment],
    policy: UnresolvedSpeakerPolicy,
) -> Result<Vec<Cue>, RenderError> {
    let mut cues = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let Some(speaker) = policy.speaker_for(segment) else {
            continue;
        };
        let timestamp = |t: f64| {
            format_timestamp(t).map_err(|source| RenderError::Timestamp { segment: i, source })
        };
        cues.push(Cue {
            index: cues.len() + 1,
            start: timestamp(segment.start)?,
            end: timestamp(segment.end)?,
            speaker: speaker.to_string(),
            text: segment.text.trim_start().to_string(),
        });
    }
    Ok(cues)
}

pub fn render_cues(
    segments: &[MergedSegment],
    policy: UnresolvedSpeakerPolicy,
) -> Result<String, RenderError> {
    Ok(build_cues(segments, policy)?
        .iter()
        .map(Cue::to_string)
        .collect())
}
