use crate::inference::domain::segments::{AlignedSegment, DiarizationInterval};

use super::merged_segment::{AttributedWord, MergedSegment, SpeakerAttribution, UnresolvedReason};

/// Attributes aligned segments to speakers by temporal overlap.
///
/// Each segment (and each of its words) takes the speaker of the
/// diarization interval it overlaps most; on equal overlap the earlier
/// interval wins. Output has the same length and order as the input.
#[derive(Debug, Default, Clone, Copy)]
pub struct SegmentMerger;

impl SegmentMerger {
    pub fn merge(
        &self,
        aligned: Vec<AlignedSegment>,
        diarized: &[DiarizationInterval],
    ) -> Vec<MergedSegment> {
        aligned
            .into_iter()
            .map(|segment| {
                let speaker = if diarized.is_empty() {
                    SpeakerAttribution::Unresolved(UnresolvedReason::NoDiarization)
                } else {
                    match best_speaker(diarized, segment.start, segment.end) {
                        Some(label) => SpeakerAttribution::Resolved(label.to_string()),
                        None => SpeakerAttribution::Unresolved(UnresolvedReason::NoOverlap),
                    }
                };
                let words = segment
                    .words
                    .into_iter()
                    .map(|w| AttributedWord {
                        speaker: best_speaker(diarized, w.start, w.end).map(str::to_string),
                        word: w.word,
                        start: w.start,
                        end: w.end,
                        score: w.score,
                    })
                    .collect();
                MergedSegment {
                    start: segment.start,
                    end: segment.end,
                    text: segment.text,
                    words,
                    speaker,
                }
            })
            .collect()
    }
}

/// Speaker of the interval overlapping `[start, end]` the most.
///
/// A zero-length span takes the interval containing its instant.
fn best_speaker(intervals: &[DiarizationInterval], start: f64, end: f64) -> Option<&str> {
    if end <= start {
        return intervals
            .iter()
            .find(|i| i.start <= start && start < i.end)
            .map(|i| i.speaker.as_str());
    }

    let mut best: Option<(&DiarizationInterval, f64)> = None;
    for interval in intervals {
        let overlap = interval.overlap_with(start, end);
        if overlap > 0.0 && best.map_or(true, |(_, b)| overlap > b) {
            best = Some((interval, overlap));
        }
    }
    best.map(|(i, _)| i.speaker.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::domain::segments::WordTiming;

    fn segment(start: f64, end: f64, text: &str) -> AlignedSegment {
        AlignedSegment {
            start,
            end,
            text: text.to_string(),
            language: "en".to_string(),
            words: Vec::new(),
        }
    }

    fn interval(start: f64, end: f64, speaker: &str) -> DiarizationInterval {
        DiarizationInterval {
            start,
            end,
            speaker: speaker.to_string(),
        }
    }

    #[test]
    fn test_picks_interval_with_largest_overlap() {
        let merged = SegmentMerger.merge(
            vec![segment(10.0, 20.0, " hello")],
            &[interval(5.0, 12.0, "A"), interval(12.0, 25.0, "B")],
        );
        assert_eq!(merged[0].speaker_label(), Some("B"));
    }

    #[test]
    fn test_equal_overlap_goes_to_earlier_interval() {
        let merged = SegmentMerger.merge(
            vec![segment(0.0, 4.0, " x")],
            &[interval(0.0, 2.0, "A"), interval(2.0, 4.0, "B")],
        );
        assert_eq!(merged[0].speaker_label(), Some("A"));
    }

    #[test]
    fn test_empty_diarization_leaves_every_segment_unresolved() {
        let aligned = vec![segment(0.0, 1.0, " a"), segment(1.0, 2.0, " b"), segment(2.0, 3.0, " c")];
        let merged = SegmentMerger.merge(aligned, &[]);
        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|m| m.speaker
            == SpeakerAttribution::Unresolved(UnresolvedReason::NoDiarization)));
    }

    #[test]
    fn test_segment_outside_all_intervals_is_unresolved() {
        let merged = SegmentMerger.merge(
            vec![segment(0.0, 1.0, " a"), segment(30.0, 31.0, " b")],
            &[interval(0.0, 5.0, "A")],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].speaker_label(), Some("A"));
        assert_eq!(
            merged[1].speaker,
            SpeakerAttribution::Unresolved(UnresolvedReason::NoOverlap)
        );
    }

    #[test]
    fn test_order_and_text_preserved() {
        let aligned: Vec<AlignedSegment> = (0..10)
            .map(|i| segment(i as f64, i as f64 + 1.0, &format!(" s{i}")))
            .collect();
        let intervals = [interval(0.0, 4.5, "A"), interval(4.5, 10.0, "B")];
        let merged = SegmentMerger.merge(aligned.clone(), &intervals);
        assert_eq!(merged.len(), aligned.len());
        for (m, a) in merged.iter().zip(&aligned) {
            assert_eq!(m.text, a.text);
            assert_eq!(m.start, a.start);
        }
        assert_eq!(merged[4].speaker_label(), Some("A"));
        assert_eq!(merged[5].speaker_label(), Some("B"));
    }

    #[test]
    fn test_zero_length_segment_takes_containing_interval() {
        let merged = SegmentMerger.merge(
            vec![segment(6.0, 6.0, " uh")],
            &[interval(0.0, 5.0, "A"), interval(5.0, 8.0, "B")],
        );
        assert_eq!(merged[0].speaker_label(), Some("B"));
    }

    #[test]
    fn test_words_attributed_individually() {
        let mut seg = segment(0.0, 4.0, " yes no");
        seg.words = vec![
            WordTiming {
                word: "yes".into(),
                start: 0.2,
                end: 0.8,
                score: 0.9,
            },
            WordTiming {
                word: "no".into(),
                start: 3.0,
                end: 3.5,
                score: 0.8,
            },
        ];
        let merged = SegmentMerger.merge(
            vec![seg],
            &[interval(0.0, 1.0, "A"), interval(2.5, 4.0, "B")],
        );
        assert_eq!(merged[0].speaker_label(), Some("B"));
        assert_eq!(merged[0].words[0].speaker.as_deref(), Some("A"));
        assert_eq!(merged[0].words[1].speaker.as_deref(), Some("B"));
    }
}
