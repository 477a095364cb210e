pub mod answerer;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod service;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use answerer::{GroqAnswerer, DEFAULT_GROQ_BASE_URL, DEFAULT_GROQ_MODEL};
pub use chunking::{ChunkingConfig, TextSplitter};
pub use config::{
    EmbeddingBackend, ProviderCredentials, ProviderSettings, EMBEDDING_TOKEN_VARS, LLM_API_KEY_VAR,
};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HuggingFaceEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_HF_BASE_URL, DEFAULT_HF_MODEL,
};
pub use error::{IngestError, ProviderError, QaError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use index::InMemoryVectorIndex;
pub use models::{
    AskRequest, DocumentId, PipelineStats, RetrievedChunk, TextChunk, UploadReceipt,
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K,
};
pub use pipeline::{render_prompt, PipelineBuilder, RetrievalPipeline};
pub use registry::SessionRegistry;
pub use service::{QaService, UPLOAD_SUCCESS_MESSAGE};
pub use traits::{Answerer, VectorIndex};
