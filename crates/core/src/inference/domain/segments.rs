/// Length of the intersection of two time ranges, zero when disjoint.
pub fn overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

/// A time-stamped stretch of recognized text.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub language: String,
}

/// Output of the recognition stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Recognition {
    pub segments: Vec<RecognizedSegment>,
    /// Language the recognizer settled on; drives alignment model choice.
    pub language: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub score: f32,
}

/// A recognized segment with timing refined by forced alignment.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub language: String,
    pub words: Vec<WordTiming>,
}

impl AlignedSegment {
    /// Carry a segment through alignment unchanged, with no word timings.
    pub fn unaligned(segment: RecognizedSegment) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            text: segment.text,
            language: segment.language,
            words: Vec::new(),
        }
    }
}

/// A stretch of audio attributed to one speaker.
#[derive(Clone, Debug, PartialEq)]
pub struct DiarizationInterval {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
}

impl DiarizationInterval {
    pub fn overlap_with(&self, start: f64, end: f64) -> f64 {
        overlap(self.start, self.end, start, end)
    }
}
