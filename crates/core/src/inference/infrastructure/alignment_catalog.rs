/// How aligned text is broken into timed words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordSplit {
    /// Words are separated by whitespace; the model has a word delimiter.
    Whitespace,
    /// Scripts written without spaces; every character is its own word.
    Character,
}

/// A language with a CTC alignment model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignmentModel {
    pub language: &'static str,
    /// Upstream checkpoint the exported ONNX model was converted from.
    pub checkpoint: &'static str,
    pub word_split: WordSplit,
}

impl AlignmentModel {
    /// Cache-relative path of a file belonging to this model.
    pub fn file_name(&self, file: &str) -> String {
        format!("alignment/{}/{file}", self.language)
    }
}

const fn spaced(language: &'static str, checkpoint: &'static str) -> AlignmentModel {
    AlignmentModel {
        language,
        checkpoint,
        word_split: WordSplit::Whitespace,
    }
}

const fn unspaced(language: &'static str, checkpoint: &'static str) -> AlignmentModel {
    AlignmentModel {
        language,
        checkpoint,
        word_split: WordSplit::Character,
    }
}

pub const ALIGNMENT_MODELS: &[AlignmentModel] = &[
    spaced("en", "WAV2VEC2_ASR_BASE_960H"),
    spaced("fr", "VOXPOPULI_ASR_BASE_10K_FR"),
    spaced("de", "VOXPOPULI_ASR_BASE_10K_DE"),
    spaced("es", "VOXPOPULI_ASR_BASE_10K_ES"),
    spaced("it", "VOXPOPULI_ASR_BASE_10K_IT"),
    unspaced("ja", "jonatasgrosman/wav2vec2-large-xlsr-53-japanese"),
    unspaced("zh", "jonatasgrosman/wav2vec2-large-xlsr-53-chinese-zh-cn"),
    spaced("nl", "jonatasgrosman/wav2vec2-large-xlsr-53-dutch"),
    spaced("uk", "Yehor/wav2vec2-xls-r-300m-uk-with-small-lm"),
    spaced("pt", "jonatasgrosman/wav2vec2-large-xlsr-53-portuguese"),
    spaced("ar", "jonatasgrosman/wav2vec2-large-xlsr-53-arabic"),
    spaced("cs", "comodoro/wav2vec2-xls-r-300m-cs-250"),
    spaced("ru", "jonatasgrosman/wav2vec2-large-xlsr-53-russian"),
    spaced("pl", "jonatasgrosman/wav2vec2-large-xlsr-53-polish"),
    spaced("hu", "jonatasgrosman/wav2vec2-large-xlsr-53-hungarian"),
    spaced("fi", "jonatasgrosman/wav2vec2-large-xlsr-53-finnish"),
    spaced("fa", "jonatasgrosman/wav2vec2-large-xlsr-53-persian"),
    spaced("el", "jonatasgrosman/wav2vec2-large-xlsr-53-greek"),
    spaced("tr", "mpoyraz/wav2vec2-xls-r-300m-cv7-turkish"),
];

/// Look up the alignment model for a language code such as `fr` or `FR`.
pub fn alignment_model(language: &str) -> Option<&'static AlignmentModel> {
    let language = language.trim();
    ALIGNMENT_MODELS
        .iter()
        .find(|m| m.language.eq_ignore_ascii_case(language))
}
