use crate::models::DocumentId;
use crate::pipeline::RetrievalPipeline;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Process-lifetime map from document identifier to its built pipeline.
///
/// Entries are inserted once and never replaced. There is no eviction: every
/// registered pipeline stays in memory until the process exits.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    pipelines: RwLock<HashMap<DocumentId, Arc<RetrievalPipeline>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `pipeline` under a fresh identifier. The entry is visible to
    /// `lookup` before the identifier is returned.
    pub async fn register(&self, pipeline: RetrievalPipeline) -> DocumentId {
        let pipeline = Arc::new(pipeline);
        let mut pipelines = self.pipelines.write().await;

        let mut id = DocumentId::generate();
        while pipelines.contains_key(&id) {
            id = DocumentId::generate();
        }

        pipelines.insert(id.clone(), pipeline);
        debug!(pdf_id = %id, sessions = pipelines.len(), "pipeline registered");
        id
    }

    pub async fn lookup(&self, id: &DocumentId) -> Option<Arc<RetrievalPipeline>> {
        self.pipelines.read().await.get(id).cloned()
    }

    /// Rollback primitive; removing an absent identifier is a no-op.
    pub async fn remove(&self, id: &DocumentId) {
        if self.pipelines.write().await.remove(id).is_some() {
            debug!(pdf_id = %id, "pipeline removed");
        }
    }

    pub async fn len(&self) -> usize {
        self.pipelines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
