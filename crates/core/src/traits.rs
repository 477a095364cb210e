use crate::{ProviderError, RetrievedChunk};
use async_trait::async_trait;

pub trait VectorIndex: Send + Sync {
    fn dimensions(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top `top_k` chunks by similarity, best first.
    fn search(&self, query_vector: &[f32], top_k: usize)
        -> Result<Vec<RetrievedChunk>, ProviderError>;
}

#[async_trait]
pub trait Answerer: Send + Sync {
    fn model_name(&self) -> &str;

    async fn answer(&self, prompt: &str) -> Result<String, ProviderError>;
}
