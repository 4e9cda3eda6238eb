//! Cosine similarity and best-match nearest-neighbour classification

use serde::{Deserialize, Serialize};

/// Outcome of a single classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult<L> {
    /// Label of the best reference when it clears the threshold
    pub label: Option<L>,
    /// Similarity of the best reference, or 0.0 when nothing matched
    pub score: f32,
    /// Position of the matching reference in the corpus
    pub matched_index: Option<usize>,
}

impl<L> ClassificationResult<L> {
    /// The "no match" outcome
    pub fn none() -> Self {
        Self {
            label: None,
            score: 0.0,
            matched_index: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.label.is_some()
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Compute cosine similarity between two embeddings
///
/// Returns 0.0 for empty, mismatched or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Best-match classification of `query` against labelled references.
///
/// Exactly one reference decides the outcome: the one with the strictly
/// greatest similarity, earliest on ties. Zero-norm references and references
/// whose dimensionality differs from the query are skipped. Below `threshold`
/// the result is `(None, 0.0)` whatever the raw best score was.
pub fn classify<L: Clone>(
    query: &[f32],
    references: &[Vec<f32>],
    labels: &[L],
    threshold: f32,
) -> ClassificationResult<L> {
    let query_norm = norm(query);
    if query.is_empty() || query_norm == 0.0 {
        return ClassificationResult::none();
    }

    let mut best: Option<(usize, f32)> = None;
    for (idx, reference) in references.iter().enumerate().take(labels.len()) {
        if reference.len() != query.len() {
            continue;
        }
        let reference_norm = norm(reference);
        if reference_norm == 0.0 {
            continue;
        }

        let dot: f32 = query.iter().zip(reference).map(|(x, y)| x * y).sum();
        let sim = (dot / (query_norm * reference_norm)).clamp(-1.0, 1.0);

        match best {
            Some((_, best_sim)) if sim <= best_sim => {}
            _ => best = Some((idx, sim)),
        }
    }

    match best {
        Some((idx, score)) if score >= threshold => ClassificationResult {
            label: Some(labels[idx].clone()),
            score,
            matched_index: Some(idx),
        },
        _ => ClassificationResult::none(),
    }
}

/// A labelled reference set with a fixed threshold
#[derive(Debug, Clone)]
pub struct NearestNeighborClassifier<L> {
    references: Vec<Vec<f32>>,
    labels: Vec<L>,
    threshold: f32,
}

impl<L: Clone> NearestNeighborClassifier<L> {
    /// Build a classifier; `references` and `labels` must be aligned.
    pub fn new(references: Vec<Vec<f32>>, labels: Vec<L>, threshold: f32) -> Self {
        debug_assert_eq!(references.len(), labels.len());
        Self {
            references,
            labels,
            threshold,
        }
    }

    pub fn classify(&self, query: &[f32]) -> ClassificationResult<L> {
        classify(query, &self.references, &self.labels, self.threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.0001);
    }

    #[test]
    fn test_zero_norm_query_is_no_match() {
        let refs = vec![vec![1.0, 0.0]];
        let result = classify(&[0.0, 0.0], &refs, &["threat"], -1.0);
        assert_eq!(result, ClassificationResult::none());
    }

    #[test]
    fn test_zero_norm_reference_is_skipped() {
        let refs = vec![vec![0.0, 0.0], vec![-1.0, 0.0]];
        let result = classify(&[1.0, 0.0], &refs, &["zero", "opposite"], -1.0);
        // The zero vector would score 0.0 and win if it were treated as a
        // similarity; skipped, the opposite vector (-1.0) is the best match.
        assert_eq!(result.label, Some("opposite"));
        assert!((result.score + 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_below_threshold_reports_zero() {
        let refs = vec![vec![1.0, 1.0]];
        let result = classify(&[1.0, 0.0], &refs, &["greeting"], 0.9);
        assert_eq!(result.label, None);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_best_match_wins_not_first_above_threshold() {
        let refs = vec![vec![1.0, 0.3], vec![1.0, 0.0]];
        let result = classify(&[1.0, 0.0], &refs, &["near", "exact"], 0.5);
        assert_eq!(result.label, Some("exact"));
        assert_eq!(result.matched_index, Some(1));
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let refs = vec![vec![2.0, 0.0], vec![1.0, 0.0]];
        let result = classify(&[1.0, 0.0], &refs, &["first", "second"], 0.5);
        assert_eq!(result.label, Some("first"));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let refs = vec![vec![1.0, 0.0]];
        let result = classify(&[1.0, 0.0], &refs, &["x"], 1.0);
        assert!(result.is_match());
    }

    #[test]
    fn test_dimension_mismatch_is_skipped() {
        let refs = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0]];
        let result = classify(&[0.0, 1.0], &refs, &["wrong_dims", "ok"], 0.5);
        assert_eq!(result.label, Some("ok"));
    }

    #[test]
    fn test_classifier_wrapper() {
        let classifier =
            NearestNeighborClassifier::new(vec![vec![0.0, 1.0]], vec!["thanks"], 0.85);
        assert_eq!(classifier.len(), 1);
        assert_eq!(classifier.classify(&[0.0, 3.0]).label, Some("thanks"));
        assert!(!classifier.classify(&[1.0, 0.0]).is_match());
    }

    fn vector() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-100.0f32..100.0, 1..32)
    }

    fn vector_pair() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
        (1usize..32).prop_flat_map(|len| {
            (
                prop::collection::vec(-100.0f32..100.0, len),
                prop::collection::vec(-100.0f32..100.0, len),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_self_similarity_is_one(v in vector()) {
            prop_assume!(norm(&v) > 1e-3);
            let sim = cosine_similarity(&v, &v);
            prop_assert!((sim - 1.0).abs() < 1e-4);
        }

        #[test]
        fn prop_similarity_is_bounded((a, b) in vector_pair()) {
            let sim = cosine_similarity(&a, &b);
            prop_assert!((-1.0..=1.0).contains(&sim));
        }

        #[test]
        fn prop_zero_query_never_matches(len in 1usize..16, threshold in -1.0f32..1.0) {
            let refs = vec![vec![1.0; len]];
            let result = classify(&vec![0.0; len], &refs, &[()], threshold);
            prop_assert_eq!(result.label, None);
            prop_assert_eq!(result.score, 0.0);
        }

        #[test]
        fn prop_sub_threshold_scores_are_zero((a, b) in vector_pair(), threshold in -1.0f32..1.0) {
            let sim = cosine_similarity(&a, &b);
            prop_assume!(sim < threshold);
            let result = classify(&a, &[b], &["label"], threshold);
            prop_assert_eq!(result.label, None);
            prop_assert_eq!(result.score, 0.0);
        }
    }
}
