//! Agglomerative clustering of speaker embeddings.
//!
//! Windows are first collapsed into runs of consecutive, near-identical
//! embeddings, then clusters are merged pairwise by cosine similarity of
//! their summed embeddings until the speaker range and similarity
//! threshold are both satisfied.
//!
//! Each live cluster remembers its most similar neighbour, so a merge
//! rescans one row instead of every pair and memory stays linear in the
//! number of windows.

use crate::inference::domain::speaker_range::SpeakerRange;

/// Consecutive windows at least this similar are treated as one turn
/// before clustering.
const CONSECUTIVE_MERGE_SIMILARITY: f64 = 0.85;

struct Cluster {
    members: Vec<usize>,
    sum: Vec<f32>,
    norm: f64,
}

impl Cluster {
    fn new(embeddings: &[Vec<f32>], members: Vec<usize>) -> Self {
        let sum = sum_of(embeddings, &members);
        let norm = norm_of(&sum);
        Self { members, sum, norm }
    }

    fn similarity(&self, other: &Cluster) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        dot(&self.sum, &other.sum) / (self.norm * other.norm)
    }

    fn absorb(&mut self, other: Cluster) {
        for (x, y) in self.sum.iter_mut().zip(&other.sum) {
            *x += y;
        }
        self.norm = norm_of(&self.sum);
        self.members.extend(other.members);
    }
}

/// Live clusters with each one's most similar live neighbour.
struct Agglomeration {
    clusters: Vec<Option<Cluster>>,
    nearest: Vec<Option<(usize, f64)>>,
    live: usize,
}

impl Agglomeration {
    fn new(clusters: Vec<Cluster>) -> Self {
        let live = clusters.len();
        let mut this = Self {
            nearest: vec![None; live],
            clusters: clusters.into_iter().map(Some).collect(),
            live,
        };
        for i in 0..live {
            this.nearest[i] = this.nearest_to(i);
        }
        this
    }

    fn nearest_to(&self, i: usize) -> Option<(usize, f64)> {
        let ci = self.clusters[i].as_ref()?;
        let mut best: Option<(usize, f64)> = None;
        for (j, cj) in self.clusters.iter().enumerate() {
            let Some(cj) = cj else { continue };
            if j == i {
                continue;
            }
            let s = ci.similarity(cj);
            if best.map_or(true, |(_, b)| s > b) {
                best = Some((j, s));
            }
        }
        best
    }

    /// The most similar live pair as `(lower, higher, similarity)`.
    fn best_pair(&self) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (i, n) in self.nearest.iter().enumerate() {
            let Some((j, s)) = *n else { continue };
            if best.map_or(true, |(_, _, b)| s > b) {
                best = Some((i.min(j), i.max(j), s));
            }
        }
        best
    }

    /// Fold cluster `b` into `a` and repair the neighbour list.
    fn merge(&mut self, a: usize, b: usize) {
        let Some(absorbed) = self.clusters[b].take() else {
            return;
        };
        let Some(target) = self.clusters[a].as_mut() else {
            self.clusters[b] = Some(absorbed);
            return;
        };
        target.absorb(absorbed);
        self.nearest[b] = None;
        self.live -= 1;

        let mut stale = Vec::new();
        for k in 0..self.clusters.len() {
            if k == a {
                continue;
            }
            let (Some(ck), Some(ca)) = (&self.clusters[k], &self.clusters[a]) else {
                continue;
            };
            let s = ck.similarity(ca);
            match self.nearest[k] {
                // The old neighbour changed or vanished; rescan only if
                // the merged cluster is now further away.
                Some((j, best)) if (j == a || j == b) && s < best => stale.push(k),
                Some((j, best)) if j != a && j != b && s <= best => {}
                _ => self.nearest[k] = Some((a, s)),
            }
        }
        self.nearest[a] = self.nearest_to(a);
        for k in stale {
            self.nearest[k] = self.nearest_to(k);
        }
    }
}

/// Assign a speaker index to every embedding.
///
/// Indices are numbered from 0 in order of first appearance. The number of
/// distinct indices lies within `speakers` whenever there are at least
/// `speakers.min()` embeddings.
pub fn cluster_embeddings(
    embeddings: &[Vec<f32>],
    speakers: SpeakerRange,
    threshold: f64,
) -> Vec<usize> {
    if embeddings.is_empty() {
        return Vec::new();
    }

    let mut groups = consecutive_runs(embeddings);
    if groups.len() < speakers.min() {
        groups = (0..embeddings.len()).map(|i| vec![i]).collect();
    }

    let mut agglomeration = Agglomeration::new(
        groups
            .into_iter()
            .map(|members| Cluster::new(embeddings, members))
            .collect(),
    );
    while agglomeration.live > speakers.min() {
        let Some((a, b, best)) = agglomeration.best_pair() else {
            break;
        };
        if agglomeration.live <= speakers.max() && best < threshold {
            break;
        }
        agglomeration.merge(a, b);
    }

    let mut cluster_of = vec![0usize; embeddings.len()];
    for (g, cluster) in agglomeration.clusters.iter().enumerate() {
        for &m in cluster.iter().flat_map(|c| &c.members) {
            cluster_of[m] = g;
        }
    }
    relabel_by_first_appearance(&cluster_of)
}

fn consecutive_runs(embeddings: &[Vec<f32>]) -> Vec<Vec<usize>> {
    let mut runs: Vec<Vec<usize>> = Vec::new();
    for i in 0..embeddings.len() {
        if i > 0
            && cosine_similarity(&embeddings[i - 1], &embeddings[i]) >= CONSECUTIVE_MERGE_SIMILARITY
        {
            if let Some(run) = runs.last_mut() {
                run.push(i);
                continue;
            }
        }
        runs.push(vec![i]);
    }
    runs
}

fn sum_of(embeddings: &[Vec<f32>], members: &[usize]) -> Vec<f32> {
    let dim = embeddings[members[0]].len();
    let mut sum = vec![0.0f32; dim];
    for &m in members {
        for (acc, v) in sum.iter_mut().zip(&embeddings[m]) {
            *acc += v;
        }
    }
    sum
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum()
}

fn norm_of(v: &[f32]) -> f64 {
    dot(v, v).sqrt()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (norm_a, norm_b) = (norm_of(a), norm_of(b));
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

fn relabel_by_first_appearance(clusters: &[usize]) -> Vec<usize> {
    let mut seen: Vec<usize> = Vec::new();
    clusters
        .iter()
        .map(|c| match seen.iter().position(|s| s == c) {
            Some(label) => label,
            None => {
                seen.push(*c);
                seen.len() - 1
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn speaker(axis: usize, jitter: f32) -> Vec<f32> {
        let mut v = vec![jitter; 4];
        v[axis] = 1.0;
        v
    }

    fn distinct(labels: &[usize]) -> usize {
        let mut l = labels.to_vec();
        l.sort_unstable();
        l.dedup();
        l.len()
    }

    #[test]
    fn test_two_speakers_interleaved() {
        let embeddings = vec![
            speaker(0, 0.0),
            speaker(0, 0.05),
            speaker(1, 0.0),
            speaker(1, 0.05),
            speaker(0, 0.02),
        ];
        let labels = cluster_embeddings(&embeddings, SpeakerRange::new(1, 2).unwrap(), 0.5);
        assert_eq!(labels, vec![0, 0, 1, 1, 0]);
    }

    #[test]
    fn test_single_voice_collapses_to_one_speaker() {
        let embeddings = vec![speaker(2, 0.0); 6];
        let labels = cluster_embeddings(&embeddings, SpeakerRange::new(1, 3).unwrap(), 0.5);
        assert_eq!(labels, vec![0; 6]);
    }

    #[test]
    fn test_minimum_speaker_count_respected() {
        let embeddings = vec![speaker(2, 0.0); 4];
        let labels = cluster_embeddings(&embeddings, SpeakerRange::new(2, 3).unwrap(), 0.5);
        assert_eq!(distinct(&labels), 2);
    }

    #[test]
    fn test_maximum_speaker_count_forces_merges() {
        let embeddings = vec![speaker(0, 0.0), speaker(1, 0.0), speaker(2, 0.0), speaker(3, 0.0)];
        let labels = cluster_embeddings(&embeddings, SpeakerRange::new(1, 2).unwrap(), 0.5);
        assert_eq!(distinct(&labels), 2);
    }

    #[test]
    fn test_labels_follow_first_appearance() {
        let embeddings = vec![speaker(3, 0.0), speaker(1, 0.0), speaker(3, 0.0)];
        let labels = cluster_embeddings(&embeddings, SpeakerRange::new(1, 4).unwrap(), 0.5);
        assert_eq!(labels, vec![0, 1, 0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster_embeddings(&[], SpeakerRange::new(1, 2).unwrap(), 0.5).is_empty());
    }

    /// Deterministic pseudo-random values in [-1, 1).
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> f32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((self.0 >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        }

        fn vector(&mut self, dim: usize) -> Vec<f32> {
            (0..dim).map(|_| self.next()).collect()
        }
    }

    /// Exhaustive pairwise search over every live pair after each merge.
    fn exhaustive_clusters(embeddings: &[Vec<f32>], speakers: SpeakerRange, threshold: f64) -> Vec<usize> {
        let mut groups = consecutive_runs(embeddings);
        if groups.len() < speakers.min() {
            groups = (0..embeddings.len()).map(|i| vec![i]).collect();
        }
        let mut sums: Vec<Vec<f32>> = groups.iter().map(|g| sum_of(embeddings, g)).collect();
        while groups.len() > speakers.min() {
            let mut best = (0, 1, f64::NEG_INFINITY);
            for i in 0..groups.len() {
                for j in (i + 1)..groups.len() {
                    let s = cosine_similarity(&sums[i], &sums[j]);
                    if s > best.2 {
                        best = (i, j, s);
                    }
                }
            }
            let (a, b, s) = best;
            if groups.len() <= speakers.max() && s < threshold {
                break;
            }
            let absorbed = groups.remove(b);
            groups[a].extend(absorbed);
            let absorbed_sum = sums.remove(b);
            for (x, y) in sums[a].iter_mut().zip(absorbed_sum) {
                *x += y;
            }
        }
        let mut cluster_of = vec![0; embeddings.len()];
        for (g, members) in groups.iter().enumerate() {
            for &m in members {
                cluster_of[m] = g;
            }
        }
        relabel_by_first_appearance(&cluster_of)
    }

    #[test]
    fn test_matches_exhaustive_search_on_random_voices() {
        for seed in 1..=6u64 {
            let mut rng = Lcg(seed);
            let voices: Vec<Vec<f32>> = (0..4).map(|_| rng.vector(16)).collect();
            let embeddings: Vec<Vec<f32>> = (0..60)
                .map(|_| {
                    let voice = &voices[((rng.next() + 1.0) * 2.0) as usize % 4];
                    voice.iter().map(|v| v + 0.6 * rng.next()).collect()
                })
                .collect();
            for (min, max) in [(1, 2), (2, 4), (3, 3), (1, 6)] {
                let range = SpeakerRange::new(min, max).unwrap();
                assert_eq!(
                    cluster_embeddings(&embeddings, range, 0.5),
                    exhaustive_clusters(&embeddings, range, 0.5),
                    "seed {seed}, speakers {min}..{max}"
                );
            }
        }
    }

    #[test]
    fn test_long_recording_alternating_speakers() {
        let mut rng = Lcg(42);
        // Twenty minutes of 0.75 s windows
        let embeddings: Vec<Vec<f32>> = (0..1600)
            .map(|i| {
                let mut v: Vec<f32> = (0..16).map(|_| 0.1 * rng.next()).collect();
                v[i % 2] += 1.0;
                v
            })
            .collect();
        let labels = cluster_embeddings(&embeddings, SpeakerRange::new(1, 3).unwrap(), 0.5);
        assert_eq!(labels.len(), 1600);
        assert!(labels.iter().enumerate().all(|(i, &l)| l == i % 2));
    }

    #[test]
    fn test_cosine_similarity_of_zero_vector() {
        assert_relative_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
