use ndarray::{Array2, ArrayView2, Axis};

/// Frames one token of the transcript occupies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TokenSpan {
    /// Index into the token sequence passed to [`force_align`].
    pub token_index: usize,
    pub start_frame: usize,
    /// Exclusive.
    pub end_frame: usize,
    /// Mean token probability over the span.
    pub score: f32,
}

/// Log-softmax over the vocabulary axis of `[frames, vocab]` logits.
pub(crate) fn log_softmax(logits: ArrayView2<f32>) -> Array2<f32> {
    let mut out = logits.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let sum: f32 = row.iter().map(|v| (v - max).exp()).sum();
        let log_sum = max + sum.ln();
        row.mapv_inplace(|v| v - log_sum);
    }
    out
}

/// Viterbi forced alignment of `tokens` against CTC log-probabilities.
///
/// Each token is emitted on exactly one frame; every other frame is blank.
/// Returns one span per token in order, or None when the audio has fewer
/// frames than tokens or an id lies outside the vocabulary axis.
pub(crate) fn force_align(
    emissions: ArrayView2<f32>,
    tokens: &[usize],
    blank: usize,
) -> Option<Vec<TokenSpan>> {
    let frames = emissions.nrows();
    let width = emissions.ncols();
    let n = tokens.len();
    if n == 0 || frames < n {
        return None;
    }
    if blank >= width || tokens.iter().any(|&t| t >= width) {
        return None;
    }

    // trellis[[t, j]]: best score over frames 0..=t having emitted j tokens
    let mut trellis = Array2::<f32>::from_elem((frames, n + 1), f32::NEG_INFINITY);
    trellis[[0, 0]] = emissions[[0, blank]];
    trellis[[0, 1]] = emissions[[0, tokens[0]]];
    for t in 1..frames {
        trellis[[t, 0]] = trellis[[t - 1, 0]] + emissions[[t, blank]];
        for j in 1..=n {
            let stayed = trellis[[t - 1, j]] + emissions[[t, blank]];
            let changed = trellis[[t - 1, j - 1]] + emissions[[t, tokens[j - 1]]];
            trellis[[t, j]] = stayed.max(changed);
        }
    }
    if !trellis[[frames - 1, n]].is_finite() {
        return None;
    }

    let mut emitted_at = vec![0usize; n];
    let mut j = n;
    for t in (1..frames).rev() {
        if j == 0 {
            break;
        }
        let stayed = trellis[[t - 1, j]] + emissions[[t, blank]];
        let changed = trellis[[t - 1, j - 1]] + emissions[[t, tokens[j - 1]]];
        if changed > stayed {
            emitted_at[j - 1] = t;
            j -= 1;
        }
    }
    if j == 1 {
        emitted_at[0] = 0;
        j = 0;
    }
    if j != 0 {
        return None;
    }

    let spans = (0..n)
        .map(|k| {
            let token = tokens[k];
            let start = emitted_at[k];
            let limit = emitted_at.get(k + 1).copied().unwrap_or(frames);
            // Extend over frames where the token still beats blank
            let mut end = start + 1;
            while end < limit && emissions[[end, token]] > emissions[[end, blank]] {
                end += 1;
            }
            let score = (start..end)
                .map(|t| emissions[[t, token]].exp())
                .sum::<f32>()
                / (end - start) as f32;
            TokenSpan {
                token_index: k,
                start_frame: start,
                end_frame: end,
                score,
            }
        })
        .collect();
    Some(spans)
}
