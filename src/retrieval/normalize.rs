//! Score normalization
//!
//! Maps subsystem-native scores onto a shared relevance scale in [0, 1],
//! higher is better. Every function here is pure.

use crate::core::{NativeScore, NormalizedHit, RawHit, Subsystem};

/// Invert a vector distance into relevance: `1 / (1 + d)`.
///
/// Negative distances are treated as zero and NaN maps to zero relevance.
pub fn normalize_vector_score(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    if distance <= 0.0 {
        return 1.0;
    }
    1.0 / (1.0 + distance)
}

/// Clamp a single memory relevance score into [0, 1].
///
/// Zero comes back as `+0.0` so `total_cmp` sees every zero as equal.
pub fn normalize_memory_score(score: f32) -> f32 {
    if score.is_nan() || score <= 0.0 {
        0.0
    } else {
        score.min(1.0)
    }
}

/// Normalize a batch of memory scores.
///
/// When any finite score has a magnitude above `threshold`, the batch is
/// min-max rescaled against `[min(0, batch_min), batch_max]` so relative
/// order survives. Otherwise each score is clamped on its own.
pub fn normalize_memory_batch(scores: &[f32], threshold: f32) -> Vec<f32> {
    let finite = || scores.iter().copied().filter(|s| s.is_finite());

    let needs_rescale = finite().any(|s| s.abs() > threshold);
    if !needs_rescale {
        return scores.iter().map(|&s| normalize_memory_score(s)).collect();
    }

    let max = finite().fold(f32::NEG_INFINITY, f32::max);
    let lo = finite().fold(0.0_f32, f32::min);
    let range = max - lo;
    if range <= 0.0 {
        return scores.iter().map(|&s| normalize_memory_score(s)).collect();
    }

    scores
        .iter()
        .map(|&s| normalize_memory_score((s - lo) / range))
        .collect()
}

/// Normalize one subsystem's hits.
///
/// Relevance-scored hits are normalized as a batch, distance-scored hits one
/// at a time. Output order matches input order.
pub fn normalize_hits(hits: &[RawHit], source: Subsystem, threshold: f32) -> Vec<NormalizedHit> {
    let relevance_scores: Vec<f32> = hits
        .iter()
        .filter_map(|h| match h.score {
            NativeScore::Relevance(r) => Some(r),
            NativeScore::Distance(_) => None,
        })
        .collect();
    let mut rescaled = normalize_memory_batch(&relevance_scores, threshold).into_iter();

    hits.iter()
        .map(|hit| {
            let relevance = match hit.score {
                NativeScore::Distance(d) => normalize_vector_score(d),
                NativeScore::Relevance(r) => rescaled
                    .next()
                    .unwrap_or_else(|| normalize_memory_score(r)),
            };
            NormalizedHit {
                hit: hit.clone(),
                relevance,
                source,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergeConfig;
    use crate::retrieval::merge::merge_hits;
    use chrono::{TimeZone, Utc};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_vector_score_inverts_distance() {
        assert_eq!(normalize_vector_score(0.0), 1.0);
        assert!(approx(normalize_vector_score(1.0), 0.5));
        assert!(approx(normalize_vector_score(0.05), 0.952_38));

        let mut previous = normalize_vector_score(0.0);
        for step in 1..=40 {
            let current = normalize_vector_score(step as f32 * 0.05);
            assert!(current < previous, "not strictly decreasing at {}", step);
            assert!(current > 0.0);
            previous = current;
        }
    }

    #[test]
    fn test_vector_score_degenerate_inputs() {
        assert_eq!(normalize_vector_score(-0.3), 1.0);
        assert_eq!(normalize_vector_score(f32::NAN), 0.0);
        assert_eq!(normalize_vector_score(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_memory_score_bounded() {
        for s in [-3.0, -1.0, -0.2, 0.0, 0.4, 1.0, 1.7, 250.0, f32::INFINITY, f32::NEG_INFINITY] {
            let r = normalize_memory_score(s);
            assert!((0.0..=1.0).contains(&r), "{} -> {}", s, r);
        }
        assert_eq!(normalize_memory_score(f32::NAN), 0.0);
    }

    #[test]
    fn test_memory_score_idempotent_in_unit_range() {
        for s in [0.0, 0.1, 0.5, 0.9, 1.0] {
            assert_eq!(normalize_memory_score(s), s);
            assert_eq!(normalize_memory_batch(&[s], 1.0), vec![s]);
        }

        let once = normalize_memory_batch(&[0.2, 0.7, 0.95], 1.0);
        assert_eq!(normalize_memory_batch(&once, 1.0), once);
    }

    #[test]
    fn test_memory_batch_rescales_large_magnitudes() {
        let scores = [4.0, 2.0, 0.5];
        let normalized = normalize_memory_batch(&scores, 1.0);

        assert_eq!(normalized[0], 1.0);
        assert!(approx(normalized[1], 0.5));
        assert!(approx(normalized[2], 0.125));
    }

    #[test]
    fn test_memory_batch_preserves_order() {
        let scores = [-2.5, 7.0, 0.3, 3.1, -0.4];
        let normalized = normalize_memory_batch(&scores, 1.0);

        for i in 0..scores.len() {
            assert!((0.0..=1.0).contains(&normalized[i]));
            for j in 0..scores.len() {
                if scores[i] < scores[j] {
                    assert!(normalized[i] <= normalized[j]);
                }
            }
        }
    }

    #[test]
    fn test_memory_batch_negative_only_outliers() {
        let normalized = normalize_memory_batch(&[-5.0, -5.0], 1.0);
        assert_eq!(normalized, vec![0.0, 0.0]);
    }

    #[test]
    fn test_memory_batch_threshold_is_configurable() {
        let scores = [1.5, 0.75];
        assert_eq!(normalize_memory_batch(&scores, 2.0), vec![1.0, 0.75]);
        assert_eq!(normalize_memory_batch(&scores, 1.0), vec![1.0, 0.5]);
    }

    #[test]
    fn test_normalize_hits_by_score_kind() {
        let hits = vec![
            RawHit::with_relevance("a", 0.9),
            RawHit::with_distance("b", 1.0),
            RawHit::with_relevance("c", 1.4),
        ];

        let normalized = normalize_hits(&hits, Subsystem::Memory, 1.0);
        assert_eq!(normalized.len(), 3);
        assert!(normalized.iter().all(|n| n.source == Subsystem::Memory));
        assert_eq!(normalized[0].hit, hits[0]);

        // relevance scores rescaled together: lo = 0, max = 1.4
        assert!(approx(normalized[0].relevance, 0.9 / 1.4));
        assert!(approx(normalized[1].relevance, 0.5));
        assert_eq!(normalized[2].relevance, 1.0);
    }

    #[test]
    fn test_normalize_hits_is_pure() {
        let hits = vec![RawHit::with_relevance("a", 3.0), RawHit::with_relevance("b", 1.0)];
        let first = normalize_hits(&hits, Subsystem::Memory, 1.0);
        let second = normalize_hits(&hits, Subsystem::Memory, 1.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_negative_zero_ties_with_zero() {
        let r = normalize_memory_score(-0.0);
        assert_eq!(r, 0.0);
        assert!(r.is_sign_positive());
        assert!(normalize_memory_batch(&[-0.0, 0.5], 1.0)[0].is_sign_positive());

        // equal relevance falls through to recency
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let hits = vec![
            RawHit::with_relevance("old note", 0.0).at(older),
            RawHit::with_relevance("new note", -0.0).at(newer),
        ];

        let normalized = normalize_hits(&hits, Subsystem::Memory, 1.0);
        let merged = merge_hits(normalized, &MergeConfig::default());
        assert_eq!(merged[0].text, "new note");
        assert_eq!(merged[1].text, "old note");
    }
}
