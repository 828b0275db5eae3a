use crate::functions;
use crate::table::Table;
use rand::seq::SliceRandom as _;
use rand::Rng;

/// A chosen `(feature, threshold)` pair and the summed child RSS it scored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitPoint {
    pub feature: usize,
    pub threshold: f64,
    pub rss: f64,
}

/// Partitions rows into `value <= threshold` (left) and `value > threshold` (right).
pub fn split_masks(xs: impl Iterator<Item = f64>, threshold: f64) -> (Vec<bool>, Vec<bool>) {
    xs.map(|x| (x <= threshold, x > threshold)).unzip()
}

/// Summed RSS of the two children produced by splitting `table` on `feature <= threshold`.
pub fn split_rss(table: &Table, feature: usize, threshold: f64) -> f64 {
    let (left, right) = split_masks(table.feature(feature), threshold);
    masked_rss(table, &left) + masked_rss(table, &right)
}

fn masked_rss(table: &Table, mask: &[bool]) -> f64 {
    functions::rss(
        table
            .target()
            .zip(mask.iter())
            .filter(|(_, keep)| **keep)
            .map(|(y, _)| y),
    )
}

/// The number of features sampled per node when none is configured: `ceil(p / 3)`.
pub fn default_max_features(features_len: usize) -> usize {
    (features_len + 2) / 3
}

/// Draws `max_features` distinct feature indices out of `features_len`.
pub fn sample_features<R: Rng + ?Sized>(
    rng: &mut R,
    features_len: usize,
    max_features: usize,
) -> Vec<usize> {
    let features = (0..features_len).collect::<Vec<_>>();
    features
        .choose_multiple(rng, std::cmp::min(features_len, max_features))
        .copied()
        .collect()
}

/// Scores every distinct observed value of every feature in `features` as a
/// threshold and returns the lowest-scoring pair.
///
/// Candidates are visited feature by feature in the given order, thresholds in
/// ascending order; on an exact tie the first candidate is kept. One-sided
/// candidates are not filtered here. `None` means there was no candidate at all.
pub fn best_split_among(table: &Table, features: &[usize]) -> Option<SplitPoint> {
    let mut best: Option<SplitPoint> = None;
    for &feature in features {
        for threshold in table.thresholds(feature) {
            let rss = split_rss(table, feature, threshold);
            if best.as_ref().map_or(true, |b| rss < b.rss) {
                best = Some(SplitPoint {
                    feature,
                    threshold,
                    rss,
                });
            }
        }
    }
    best
}

/// Samples a fresh feature subset and searches it for the best split.
pub fn best_split<R: Rng + ?Sized>(
    rng: &mut R,
    table: &Table,
    max_features: usize,
) -> Option<SplitPoint> {
    let features = sample_features(rng, table.features_len(), max_features);
    best_split_among(table, &features)
}
