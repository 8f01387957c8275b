use std::fmt;

use crate::merge::domain::merged_segment::MergedSegment;

use super::unresolved_policy::UnresolvedSpeakerPolicy;

/// Consecutive segments by one speaker, text concatenated as recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paragraph {
    pub speaker: String,
    pub text: String,
}

impl fmt::Display for Paragraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n\n", self.speaker, self.text.trim_start())
    }
}

/// Paragraph grouping of a transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParagraphLayout {
    /// Nothing to render.
    Empty,
    /// One speaker throughout.
    SingleSpeaker(Paragraph),
    /// Speaker turns in order; the same speaker may appear in several.
    MultiSpeaker(Vec<Paragraph>),
}

impl ParagraphLayout {
    pub fn paragraphs(&self) -> &[Paragraph] {
        match self {
            ParagraphLayout::Empty => &[],
            ParagraphLayout::SingleSpeaker(p) => std::slice::from_ref(p),
            ParagraphLayout::MultiSpeaker(ps) => ps,
        }
    }

    pub fn render(&self) -> String {
        match self {
            ParagraphLayout::Empty => String::new(),
            ParagraphLayout::SingleSpeaker(p) => p.to_string(),
            ParagraphLayout::MultiSpeaker(ps) => ps.iter().map(Paragraph::to_string).collect(),
        }
    }
}

enum GroupState {
    Idle,
    Accumulating(Paragraph),
}

/// Group consecutive same-speaker segments into paragraphs.
pub fn layout_paragraphs(
    segments: &[MergedSegment],
    policy: UnresolvedSpeakerPolicy,
) -> ParagraphLayout {
    let mut flushed: Vec<Paragraph> = Vec::new();
    let mut state = GroupState::Idle;

    for segment in segments {
        let Some(speaker) = policy.speaker_for(segment) else {
            continue;
        };
        state = match state {
            GroupState::Accumulating(mut current) if current.speaker == speaker => {
                current.text.push_str(&segment.text);
                GroupState::Accumulating(current)
            }
            GroupState::Accumulating(current) => {
                flushed.push(current);
                GroupState::Accumulating(Paragraph {
                    speaker: speaker.to_string(),
                    text: segment.text.clone(),
                })
            }
            GroupState::Idle => GroupState::Accumulating(Paragraph {
                speaker: speaker.to_string(),
                text: segment.text.clone(),
            }),
        };
    }

    if let GroupState::Accumulating(current) = state {
        flushed.push(current);
    }

    match flushed.len() {
        0 => ParagraphLayout::Empty,
        1 => match flushed.pop() {
            Some(only) => ParagraphLayout::SingleSpeaker(only),
            None => ParagraphLayout::Empty,
        },
        _ => ParagraphLayout::MultiSpeaker(flushed),
    }
}

pub fn render_paragraphs(segments: &[MergedSegment], policy: UnresolvedSpeakerPolicy) -> String {
    layout_paragraphs(segments, policy).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::domain::merged_segment::{SpeakerAttribution, UnresolvedReason};

    fn seg(speaker: Option<&str>, text: &str) -> MergedSegment {
        MergedSegment {
            start: 0.0,
            end: 1.0,
            text: text.to_string(),
            words: Vec::new(),
            speaker: match speaker {
                Some(s) => SpeakerAttribution::Resolved(s.to_string()),
                None => SpeakerAttribution::Unresolved(UnresolvedReason::NoOverlap),
            },
        }
    }

    fn para(speaker: &str, text: &str) -> Paragraph {
        Paragraph {
            speaker: speaker.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_consecutive_speakers_grouped() {
        let segments = [seg(Some("A"), "hi "), seg(Some("A"), "there"), seg(Some("B"), "ok")];
        let layout = layout_paragraphs(&segments, UnresolvedSpeakerPolicy::Unknown);
        assert_eq!(
            layout,
            ParagraphLayout::MultiSpeaker(vec![para("A", "hi there"), para("B", "ok")])
        );
        assert_eq!(layout.render(), "A\nhi there\n\nB\nok\n\n");
    }

    #[test]
    fn test_uniform_speaker_is_single_paragraph() {
        let segments: Vec<MergedSegment> = (0..5).map(|i| seg(Some("A"), &format!(" w{i}"))).collect();
        let layout = layout_paragraphs(&segments, UnresolvedSpeakerPolicy::Unknown);
        assert_eq!(layout, ParagraphLayout::SingleSpeaker(para("A", " w0 w1 w2 w3 w4")));
        assert_eq!(layout.render(), "A\nw0 w1 w2 w3 w4\n\n");
    }

    #[test]
    fn test_returning_speaker_starts_new_paragraph() {
        let segments = [seg(Some("A"), " a"), seg(Some("B"), " b"), seg(Some("A"), " c")];
        let layout = layout_paragraphs(&segments, UnresolvedSpeakerPolicy::Unknown);
        let speakers: Vec<&str> = layout.paragraphs().iter().map(|p| p.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_final_paragraph_is_flushed() {
        let segments = [seg(Some("A"), " a"), seg(Some("B"), " b")];
        let rendered = render_paragraphs(&segments, UnresolvedSpeakerPolicy::Unknown);
        assert!(rendered.ends_with("B\nb\n\n"));
    }

    #[test]
    fn test_unresolved_grouped_under_unknown() {
        let segments = [seg(None, " x"), seg(None, " y"), seg(Some("A"), " z")];
        let layout = layout_paragraphs(&segments, UnresolvedSpeakerPolicy::Unknown);
        assert_eq!(
            layout,
            ParagraphLayout::MultiSpeaker(vec![para("UNKNOWN", " x y"), para("A", " z")])
        );
    }

    #[test]
    fn test_skip_policy_joins_across_gap() {
        let segments = [seg(Some("A"), " a"), seg(None, " lost"), seg(Some("A"), " b")];
        let layout = layout_paragraphs(&segments, UnresolvedSpeakerPolicy::Skip);
        assert_eq!(layout, ParagraphLayout::SingleSpeaker(para("A", " a b")));
    }

    #[test]
    fn test_empty_input() {
        let layout = layout_paragraphs(&[], UnresolvedSpeakerPolicy::Unknown);
        assert_eq!(layout, ParagraphLayout::Empty);
        assert_eq!(layout.render(), "");
        assert!(layout.paragraphs().is_empty());
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let segments = [seg(Some("A"), " a"), seg(None, " b"), seg(Some("B"), " c")];
        assert_eq!(
            render_paragraphs(&segments, UnresolvedSpeakerPolicy::Unknown),
            render_paragraphs(&segments, UnresolvedSpeakerPolicy::Unknown)
        );
    }
}
