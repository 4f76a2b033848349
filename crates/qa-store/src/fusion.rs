//! Rank fusion for combining prefetch results.

use std::collections::HashMap;

/// RRF constant. Qdrant uses 2; the literature default is 60.
/// Higher values flatten the gap between top and lower ranks.
pub const DEFAULT_RRF_K: f32 = 2.0;

/// Fuse multiple ranked lists using Reciprocal Rank Fusion.
///
/// RRF score = Σ 1 / (k + rank_i), with rank starting at 0, the same
/// position scoring Qdrant applies server-side.
///
/// # Arguments
/// * `results` - Ranked lists of (id, original_score) pairs, best first
/// * `k` - RRF constant
/// * `limit` - Maximum number of results to return
///
/// # Returns
/// (id, fused_score) pairs sorted by fused score descending; ties keep the
/// smaller id first.
pub fn reciprocal_rank_fusion(results: Vec<Vec<(u64, f32)>>, k: f32, limit: usize) -> Vec<(u64, f32)> {
    let mut scores: HashMap<u64, f32> = HashMap::new();

    for result_list in results {
        for (rank, (id, _original_score)) in result_list.into_iter().enumerate() {
            *scores.entry(id).or_default() += 1.0 / (k + rank as f32);
        }
    }

    sort_and_truncate(scores, limit)
}

/// Fuse multiple scored lists using Distribution-Based Score Fusion.
///
/// Each list is normalized to [0, 1] using mean ± 3 standard deviations as
/// the bounds, clamped, then scores are summed per id.
pub fn distribution_based_fusion(results: Vec<Vec<(u64, f32)>>, limit: usize) -> Vec<(u64, f32)> {
    let mut scores: HashMap<u64, f32> = HashMap::new();

    for result_list in results {
        if result_list.is_empty() {
            continue;
        }

        let n = result_list.len() as f32;
        let mean = result_list.iter().map(|(_, s)| s).sum::<f32>() / n;
        let variance = result_list.iter().map(|(_, s)| (s - mean).powi(2)).sum::<f32>() / n;
        let std_dev = variance.sqrt();

        let low = mean - 3.0 * std_dev;
        let high = mean + 3.0 * std_dev;
        let range = high - low;

        for (id, score) in result_list {
            let normalized = if range > 0.0 {
                ((score - low) / range).clamp(0.0, 1.0)
            } else {
                0.5
            };
            *scores.entry(id).or_default() += normalized;
        }
    }

    sort_and_truncate(scores, limit)
}

fn sort_and_truncate(scores: HashMap<u64, f32>, limit: usize) -> Vec<(u64, f32)> {
    let mut fused: Vec<_> = scores.into_iter().collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    fused.truncate(limit);
    fused
}
