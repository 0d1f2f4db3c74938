//! Result merging and deduplication.

use std::collections::HashSet;

use crate::providers::{SearchEngine, SearchHit};

/// Global cap on deduplicated results per request.
pub const MAX_MERGED_RESULTS: usize = 20;

/// Interleave two ranked hit lists element-wise (A[0], B[0], A[1], B[1], ...)
/// and continue with the longer list's remainder. Untagged hits get their
/// originating engine's name. Position-based fairness: neither engine's
/// results can dominate by list-order bias, and no relevance score is
/// available uniformly.
pub fn interleave_results(
    a: Vec<SearchHit>,
    b: Vec<SearchHit>,
    a_engine: SearchEngine,
    b_engine: SearchEngine,
) -> Vec<SearchHit> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter();
    let mut b = b.into_iter();
    loop {
        let next_a = a.next();
        let next_b = b.next();
        if next_a.is_none() && next_b.is_none() {
            break;
        }
        if let Some(hit) = next_a {
            merged.push(tag_provider(hit, a_engine));
        }
        if let Some(hit) = next_b {
            merged.push(tag_provider(hit, b_engine));
        }
    }
    merged
}

fn tag_provider(mut hit: SearchHit, engine: SearchEngine) -> SearchHit {
    if hit.provider.is_empty() {
        hit.provider = engine.as_str().to_string();
    }
    hit
}

/// Deduplicate by URL, first occurrence wins, then truncate. Hits without a
/// URL are dropped. Single pass, no re-sorting: the same input order always
/// produces the same output.
pub fn dedupe_results(hits: Vec<SearchHit>, max_items: usize) -> Vec<SearchHit> {
    let mut seen = HashSet::<String>::new();
    let mut unique = Vec::new();
    for hit in hits {
        let url = hit.url.trim();
        if url.is_empty() || !seen.insert(url.to_string()) {
            continue;
        }
        unique.push(hit);
        if unique.len() == max_items {
            break;
        }
    }
    unique
}
