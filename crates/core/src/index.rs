use crate::error::ProviderError;
use crate::models::{RetrievedChunk, TextChunk};
use crate::traits::VectorIndex;

/// Exact cosine-similarity index held in memory for one document.
#[derive(Debug, Clone)]
pub struct InMemoryVectorIndex {
    dimensions: usize,
    entries: Vec<(TextChunk, Vec<f32>)>,
}

impl InMemoryVectorIndex {
    pub fn build(chunks: Vec<TextChunk>, embeddings: Vec<Vec<f32>>) -> Result<Self, ProviderError> {
        if chunks.len() != embeddings.len() {
            return Err(ProviderError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings.first().map(Vec::len).unwrap_or_default();
        if let Some(bad) = embeddings.iter().find(|vector| vector.len() != dimensions) {
            return Err(ProviderError::DimensionMismatch {
                expected: dimensions,
                actual: bad.len(),
            });
        }

        Ok(Self {
            dimensions,
            entries: chunks.into_iter().zip(embeddings).collect(),
        })
    }
}

impl VectorIndex for InMemoryVectorIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, ProviderError> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.dimensions {
            return Err(ProviderError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .map(|(chunk, vector)| RetrievedChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query_vector, vector),
            })
            .collect();

        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u64, text: &str) -> TextChunk {
        TextChunk {
            chunk_id: format!("chunk-{index}"),
            chunk_index: index,
            page: 1,
            text: text.to_string(),
        }
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn search_returns_best_first_and_respects_k() -> Result<(), ProviderError> {
        let index = InMemoryVectorIndex::build(
            vec![chunk(0, "far"), chunk(1, "close"), chunk(2, "medium")],
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
        )?;

        let hits = index.search(&[1.0, 0.0], 2)?;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "close");
        assert_eq!(hits[1].chunk.text, "medium");
        Ok(())
    }

    #[test]
    fn k_larger_than_index_returns_everything() -> Result<(), ProviderError> {
        let index = InMemoryVectorIndex::build(vec![chunk(0, "only")], vec![vec![1.0, 0.0]])?;
        assert_eq!(index.search(&[1.0, 0.0], 10)?.len(), 1);
        Ok(())
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let result = InMemoryVectorIndex::build(vec![chunk(0, "a")], Vec::new());
        assert!(matches!(result, Err(ProviderError::Request(_))));
    }

    #[test]
    fn query_dimension_must_match() -> Result<(), ProviderError> {
        let index = InMemoryVectorIndex::build(vec![chunk(0, "a")], vec![vec![1.0, 0.0]])?;
        let result = index.search(&[1.0, 0.0, 0.0], 4);
        assert!(matches!(
            result,
            Err(ProviderError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        Ok(())
    }
}
