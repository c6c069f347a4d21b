//! Exhaustive cosine-similarity ranking.

use crate::types::{Document, RankedDocument};
use civic_core::{AppError, AppResult};
use std::cmp::Ordering;
use std::sync::Arc;

/// Calculate cosine similarity between two vectors.
///
/// Returns `0.0` when either vector has zero norm.
///
/// # Errors
/// `DimensionMismatch` when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> AppResult<f32> {
    if a.len() != b.len() {
        return Err(AppError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (norm_a * norm_b))
}

/// Descending by score, NaN last.
fn by_score_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Score every document against the query and keep the best `top_k`.
///
/// Documents without an embedding, or whose embedding length differs from
/// the query's, are skipped. Equal scores keep their input order.
pub fn rank(query: &[f32], documents: &[Arc<Document>], top_k: usize) -> Vec<RankedDocument> {
    let mut skipped = 0usize;

    let mut results: Vec<RankedDocument> = documents
        .iter()
        .filter_map(|doc| {
            let embedding = match doc.embedding.as_deref() {
                Some(embedding) => embedding,
                None => {
                    skipped += 1;
                    return None;
                }
            };
            match cosine_similarity(query, embedding) {
                Ok(score) => Some(RankedDocument {
                    document: Arc::clone(doc),
                    score,
                }),
                Err(e) => {
                    skipped += 1;
                    tracing::debug!("Skipping {} document {}: {}", doc.collection, doc.id, e);
                    None
                }
            }
        })
        .collect();

    if skipped > 0 {
        tracing::warn!("Skipped {} documents that could not be scored", skipped);
    }

    // Stable: ties keep load order
    results.sort_by(|a, b| by_score_desc(a.score, b.score));
    results.truncate(top_k);

    tracing::debug!(
        "Ranked {} documents (requested top-{})",
        results.len(),
        top_k
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Collection;

    fn doc(id: &str, embedding: Option<Vec<f32>>) -> Arc<Document> {
        let mut doc = Document::new(id, Collection::Legislative);
        doc.embedding = embedding;
        Arc::new(doc)
    }

    fn ids(results: &[RankedDocument]) -> Vec<&str> {
        results.iter().map(|r| r.document.id.as_str()).collect()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_is_symmetric() {
        let vectors: [&[f32]; 4] = [
            &[3.0, -4.0, 0.5],
            &[-0.2, 7.5, 1.0],
            &[10.0, 10.0, -10.0],
            &[-1.0, -2.0, -3.0],
        ];
        for a in vectors {
            for b in vectors {
                assert_eq!(
                    cosine_similarity(a, b).unwrap(),
                    cosine_similarity(b, a).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_self_similarity_is_one() {
        let vectors: [&[f32]; 4] = [
            &[3.0, -4.0],
            &[-0.25, -0.5, 8.0],
            &[1000.0, 0.001, -42.0, 7.0],
            &[-5.0],
        ];
        for v in vectors {
            let score = cosine_similarity(v, v).unwrap();
            assert!((score - 1.0).abs() < 1e-6, "{:?} scored {}", v, score);
        }
    }

    #[test]
    fn test_cosine_similarity_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        let err = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            AppError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let docs = vec![
            doc("x", Some(vec![1.0, 0.0])),
            doc("y", Some(vec![0.0, 1.0])),
            doc("z", Some(vec![0.7, 0.7])),
        ];

        let results = rank(&[1.0, 0.0], &docs, 2);
        assert_eq!(ids(&results), vec!["x", "z"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!((results[1].score - 0.7071).abs() < 1e-3);
    }

    #[test]
    fn test_rank_returns_min_of_top_k_and_valid() {
        let docs = vec![
            doc("a", Some(vec![1.0, 0.0])),
            doc("b", None),
            doc("c", Some(vec![1.0, 0.0, 0.0])),
        ];

        let results = rank(&[1.0, 0.0], &docs, 5);
        assert_eq!(ids(&results), vec!["a"]);
        assert!(rank(&[1.0, 0.0], &docs, 0).is_empty());
    }

    #[test]
    fn test_rank_ties_keep_load_order() {
        let docs = vec![
            doc("first", Some(vec![2.0, 0.0])),
            doc("low", Some(vec![0.0, 1.0])),
            doc("second", Some(vec![1.0, 0.0])),
            doc("third", Some(vec![5.0, 0.0])),
        ];

        let results = rank(&[1.0, 0.0], &docs, 3);
        assert_eq!(ids(&results), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_nan_sorts_last() {
        let docs = vec![
            doc("nan", Some(vec![f32::NAN, 0.0])),
            doc("neg", Some(vec![-1.0, 0.0])),
            doc("pos", Some(vec![1.0, 0.0])),
        ];

        let results = rank(&[1.0, 0.0], &docs, 3);
        assert_eq!(ids(&results), vec!["pos", "neg", "nan"]);
    }

    #[test]
    fn test_rank_scores_non_increasing() {
        let docs: Vec<_> = (0..20)
            .map(|i| {
                let angle = i as f32 * 0.37;
                doc(&i.to_string(), Some(vec![angle.cos(), angle.sin()]))
            })
            .collect();

        let results = rank(&[0.3, 0.9], &docs, 10);
        assert_eq!(results.len(), 10);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
