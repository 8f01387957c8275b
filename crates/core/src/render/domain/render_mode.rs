use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::merge::domain::merged_segment::MergedSegment;

use super::cue_renderer::{render_cues, RenderError};
use super::paragraph_renderer::render_paragraphs;
use super::unresolved_policy::UnresolvedSpeakerPolicy;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown output mode '{0}' (expected 'cue' or 'paragraph')")]
pub struct RenderModeParseError(pub String);

/// Transcript layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Numbered, time-coded cues with inline speaker markers.
    #[default]
    Cue,
    /// Speaker-grouped paragraphs.
    Paragraph,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Cue => "cue",
            RenderMode::Paragraph => "paragraph",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RenderMode::Cue => "vtt",
            RenderMode::Paragraph => "txt",
        }
    }

    pub fn render(
        &self,
        segments: &[MergedSegment],
        policy: UnresolvedSpeakerPolicy,
    ) -> Result<String, RenderError> {
        match self {
            RenderMode::Cue => render_cues(segments, policy),
            RenderMode::Paragraph => Ok(render_paragraphs(segments, policy)),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = RenderModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cue" | "vtt" => Ok(RenderMode::Cue),
            "paragraph" => Ok(RenderMode::Paragraph),
            _ => Err(RenderModeParseError(s.to_string())),
        }
    }
}

/// Transcript path for `audio_path`: the full input name plus the mode
/// extension, so `talk.mp3` becomes `talk.mp3.vtt`.
pub fn transcript_path(audio_path: &Path, mode: RenderMode) -> PathBuf {
    let mut name = audio_path.as_os_str().to_os_string();
    name.push(".");
    name.push(mode.extension());
    PathBuf::from(name)
}
