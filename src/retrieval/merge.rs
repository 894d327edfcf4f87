//! Deduplication and merging
//!
//! Hits from both subsystems are grouped by trimmed, case-sensitive text.
//! Each group collapses into one `MergedResult` whose winner is picked by the
//! ranking chain below, and the merged list is sorted with the same chain:
//!
//! 1. higher relevance
//! 2. more recent timestamp (a missing timestamp ranks oldest)
//! 3. subsystem priority from `MergeConfig::prefer`

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::MergeConfig;
use crate::core::{MergedResult, NormalizedHit, ProvenanceEntry, Subsystem};

/// Ordering where `Less` means `a` ranks ahead of `b`
fn rank(
    a: (f32, Option<DateTime<Utc>>, Subsystem),
    b: (f32, Option<DateTime<Utc>>, Subsystem),
    policy: &MergeConfig,
) -> Ordering {
    b.0.total_cmp(&a.0)
        .then_with(|| b.1.cmp(&a.1))
        .then_with(|| policy.priority_rank(a.2).cmp(&policy.priority_rank(b.2)))
}

fn hit_key(hit: &NormalizedHit) -> (f32, Option<DateTime<Utc>>, Subsystem) {
    (hit.relevance, hit.hit.timestamp, hit.source)
}

fn result_key(result: &MergedResult) -> (f32, Option<DateTime<Utc>>, Subsystem) {
    (result.relevance, result.timestamp, result.source)
}

/// Compare two hits by the ranking chain
pub fn compare_hits(a: &NormalizedHit, b: &NormalizedHit, policy: &MergeConfig) -> Ordering {
    rank(hit_key(a), hit_key(b), policy)
}

/// Compare two merged results by the ranking chain
pub fn compare_results(a: &MergedResult, b: &MergedResult, policy: &MergeConfig) -> Ordering {
    rank(result_key(a), result_key(b), policy)
}

/// Collapse duplicates and return results in ranked order.
///
/// Every distinct key yields exactly one result, so the output is never
/// longer than the input.
pub fn merge_hits(hits: Vec<NormalizedHit>, policy: &MergeConfig) -> Vec<MergedResult> {
    let mut groups: Vec<Vec<NormalizedHit>> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for hit in hits {
        let key = hit.hit.dedup_key().to_string();
        match by_key.get(&key) {
            Some(&idx) => groups[idx].push(hit),
            None => {
                by_key.insert(key, groups.len());
                groups.push(vec![hit]);
            }
        }
    }

    let mut merged: Vec<MergedResult> = groups
        .into_iter()
        .filter_map(|mut group| {
            group.sort_by(|a, b| compare_hits(a, b, policy));
            collapse(&group)
        })
        .collect();

    merged.sort_by(|a, b| compare_results(a, b, policy));
    merged
}

/// Build one result from a group sorted winner-first
fn collapse(group: &[NormalizedHit]) -> Option<MergedResult> {
    let (winner, rest) = group.split_first()?;

    let mut metadata = winner.hit.metadata.clone();
    for loser in rest {
        for (key, value) in &loser.hit.metadata {
            metadata.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    let provenance = group
        .iter()
        .map(|h| ProvenanceEntry {
            source: h.source,
            native_score: h.hit.score,
            relevance: h.relevance,
            metadata: h.hit.metadata.clone(),
        })
        .collect();

    Some(MergedResult {
        text: winner.hit.dedup_key().to_string(),
        relevance: winner.relevance,
        source: winner.source,
        timestamp: winner.hit.timestamp,
        metadata,
        provenance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NativeScore, RawHit};
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashSet;

    fn hit(raw: RawHit, relevance: f32, source: Subsystem) -> NormalizedHit {
        NormalizedHit {
            hit: raw,
            relevance,
            source,
        }
    }

    #[test]
    fn test_duplicate_keys_collapse() {
        let hits = vec![
            hit(RawHit::with_relevance("deadline is March 1", 0.9), 0.9, Subsystem::Memory),
            hit(RawHit::with_distance("  deadline is March 1 ", 0.05), 0.952, Subsystem::Vector),
            hit(RawHit::with_distance("Deadline is March 1", 0.5), 0.667, Subsystem::Vector),
        ];

        let merged = merge_hits(hits, &MergeConfig::default());

        // case-sensitive: "Deadline" stays separate
        assert_eq!(merged.len(), 2);
        let texts: HashSet<_> = merged.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts.len(), merged.len());

        let deadline = &merged[0];
        assert_eq!(deadline.text, "deadline is March 1");
        assert_eq!(deadline.relevance, 0.952);
        assert_eq!(deadline.source, Subsystem::Vector);
        assert_eq!(deadline.sources(), vec![Subsystem::Vector, Subsystem::Memory]);
        assert_eq!(deadline.provenance[1].native_score, NativeScore::Relevance(0.9));
    }

    #[test]
    fn test_results_sorted_descending() {
        let hits = vec![
            hit(RawHit::with_relevance("a", 0.2), 0.2, Subsystem::Memory),
            hit(RawHit::with_distance("b", 0.1), 0.9, Subsystem::Vector),
            hit(RawHit::with_relevance("c", 0.6), 0.6, Subsystem::Memory),
            hit(RawHit::with_distance("d", 2.0), 0.33, Subsystem::Vector),
        ];

        let merged = merge_hits(hits, &MergeConfig::default());
        let order: Vec<_> = merged.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "d", "a"]);
        assert!(merged.windows(2).all(|w| w[0].relevance >= w[1].relevance));
    }

    #[test]
    fn test_tie_broken_by_recency() {
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let hits = vec![
            hit(RawHit::with_relevance("same", 0.5).at(older), 0.5, Subsystem::Memory),
            hit(RawHit::with_distance("same", 1.0).at(newer), 0.5, Subsystem::Vector),
            hit(RawHit::with_relevance("undated", 0.5), 0.5, Subsystem::Memory),
        ];

        let merged = merge_hits(hits, &MergeConfig::default());
        assert_eq!(merged[0].text, "same");
        assert_eq!(merged[0].source, Subsystem::Vector);
        assert_eq!(merged[0].timestamp, Some(newer));
        assert_eq!(merged[1].text, "undated");
    }

    #[test]
    fn test_tie_broken_by_priority() {
        let hits = vec![
            hit(RawHit::with_distance("same", 1.0), 0.5, Subsystem::Vector),
            hit(RawHit::with_relevance("same", 0.5), 0.5, Subsystem::Memory),
        ];

        let merged = merge_hits(hits.clone(), &MergeConfig::default());
        assert_eq!(merged[0].source, Subsystem::Memory);

        let prefer_vector = MergeConfig {
            prefer: Subsystem::Vector,
            ..MergeConfig::default()
        };
        let merged = merge_hits(hits, &prefer_vector);
        assert_eq!(merged[0].source, Subsystem::Vector);
    }

    #[test]
    fn test_metadata_union_prefers_winner() {
        let hits = vec![
            hit(
                RawHit::with_relevance("note", 0.4)
                    .with_meta("origin", "chat")
                    .with_meta("thread", 7),
                0.4,
                Subsystem::Memory,
            ),
            hit(
                RawHit::with_distance("note", 0.2)
                    .with_meta("origin", "docs")
                    .with_meta("path", "notes.md"),
                0.833,
                Subsystem::Vector,
            ),
        ];

        let merged = merge_hits(hits, &MergeConfig::default());
        let metadata = &merged[0].metadata;
        assert_eq!(metadata["origin"], json!("docs"));
        assert_eq!(metadata["thread"], json!(7));
        assert_eq!(metadata["path"], json!("notes.md"));

        // each contributor keeps its own view
        assert_eq!(merged[0].provenance[1].metadata["origin"], json!("chat"));
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_hits(vec![], &MergeConfig::default()).is_empty());
    }
}
