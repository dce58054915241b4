//! Vector similarity and candidate ranking

use std::cmp::Ordering;

use super::CacheEntry;

/// Calculate cosine similarity between two vectors
///
/// Mismatched lengths, empty or zero vectors score 0.0. The result is
/// clamped to [-1, 1] so rounding never pushes identical vectors past 1.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// A candidate entry with its similarity to the query
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: CacheEntry,
    pub similarity: f32,
}

impl ScoredEntry {
    pub fn new(entry: CacheEntry, similarity: f32) -> Self {
        Self { entry, similarity }
    }
}

/// Ordering used to pick the best candidate
///
/// Higher similarity wins; equal scores prefer the most recently created
/// entry, then the greater id, so the choice never depends on scan order.
fn rank(a: &ScoredEntry, b: &ScoredEntry) -> Ordering {
    a.similarity
        .partial_cmp(&b.similarity)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.entry.created_at().cmp(&b.entry.created_at()))
        .then_with(|| a.entry.id().cmp(b.entry.id()))
}

/// Select the single best entry for a query embedding
///
/// Entries without an embedding, or whose embedding came from another model
/// or has another dimensionality, are skipped. The threshold is not applied
/// here: the caller decides whether the best score is good enough.
pub fn best_match<I>(query: &[f32], model: &str, entries: I) -> Option<ScoredEntry>
where
    I: IntoIterator<Item = CacheEntry>,
{
    entries
        .into_iter()
        .filter_map(|entry| {
            let similarity = {
                let embedding = entry.embedding()?;

                if !embedding.is_comparable(model, query.len()) {
                    return None;
                }

                cosine_similarity(query, embedding.vector())
            };

            if similarity.is_nan() {
                return None;
            }

            Some(ScoredEntry::new(entry, similarity))
        })
        .max_by(rank)
}

/// Select the entry to serve for an exact prompt match
pub fn most_recent<I>(entries: I) -> Option<CacheEntry>
where
    I: IntoIterator<Item = CacheEntry>,
{
    entries
        .into_iter()
        .max_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        })
}
