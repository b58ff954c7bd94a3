//! Similarity kernel: sorted-vector cosine, Jaccard from intersection, and
//! the weighted combined score.

use crate::article::Article;
use crate::config::Weights;

/// Dot product of two id-sorted vectors via a two-pointer walk. For
/// L2-normalised inputs this is the cosine similarity, in [0, 1].
pub fn cosine(a_ids: &[u32], a_scores: &[f32], b_ids: &[u32], b_scores: &[f32]) -> f64 {
    let mut result = 0f64;
    let mut i = 0;
    let mut j = 0;
    while i < a_ids.len() && j < b_ids.len() {
        match a_ids[i].cmp(&b_ids[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                result += f64::from(a_scores[i]) * f64::from(b_scores[j]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}

/// Jaccard similarity of two sorted, unique id sets. The intersection size
/// is the dot product with all scores 1.0.
pub fn jaccard(a: &[u32], b: &[u32]) -> f64 {
    let ones_a = vec![1f32; a.len()];
    let ones_b = vec![1f32; b.len()];
    let intersection = cosine(a, &ones_a, b, &ones_b);
    let union = a.len() as f64 + b.len() as f64 - intersection;
    if union == 0.0 {
        return 0.0;
    }
    intersection / union
}

/// The combined similarity of two articles:
/// `alpha * cos(text) + beta * cos(locations) + gamma * jaccard(categories)`.
/// A component with zero weight is not computed at all.
pub fn combined(a: &Article, b: &Article, weights: &Weights) -> f64 {
    let mut score = 0f64;
    if weights.tf_idf > 0.0 {
        score += weights.tf_idf
            * cosine(&a.tf_idf.ids, &a.tf_idf.scores, &b.tf_idf.ids, &b.tf_idf.scores);
    }
    if weights.named_locations > 0.0 {
        score += weights.named_locations
            * cosine(
                &a.named_locations.ids,
                &a.named_locations.scores,
                &b.named_locations.ids,
                &b.named_locations.scores,
            );
    }
    if weights.categories > 0.0 {
        score += weights.categories * jaccard(&a.category_ids, &b.category_ids);
    }
    score
}
