use crate::answerer::GroqAnswerer;
use crate::chunking::TextSplitter;
use crate::config::{EmbeddingBackend, ProviderCredentials, ProviderSettings, LLM_API_KEY_VAR};
use crate::embeddings::{CharacterNgramEmbedder, Embedder, HuggingFaceEmbedder};
use crate::error::{IngestError, ProviderError, QaError};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::index::InMemoryVectorIndex;
use crate::models::{PipelineStats, RetrievedChunk, DEFAULT_TOP_K};
use crate::traits::{Answerer, VectorIndex};
use chrono::Utc;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const DOCUMENT_SEPARATOR: &str = "\n\n";

pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following context to answer the question.\n\nContext: {context}\n\nQuestion: {question}"
    )
}

/// One document's index bound to an answerer. Immutable once built.
pub struct RetrievalPipeline {
    index: Box<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    answerer: Arc<dyn Answerer>,
    top_k: usize,
    stats: PipelineStats,
}

impl RetrievalPipeline {
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, ProviderError> {
        let query_vector = self.embedder.embed_query(question).await?;
        self.index.search(&query_vector, self.top_k)
    }

    pub async fn invoke(&self, question: &str) -> Result<String, ProviderError> {
        let retrieved = self.retrieve(question).await?;
        debug!(chunks = retrieved.len(), "retrieved context");

        let context = retrieved
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);

        self.answerer.answer(&render_prompt(&context, question)).await
    }
}

impl fmt::Debug for RetrievalPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("embedder", &self.embedder.model_name())
            .field("answerer", &self.answerer.model_name())
            .field("top_k", &self.top_k)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Uploaded bytes on disk for the extractor. Dropping the guard deletes the
/// file; `release` deletes it and reports a failed removal.
struct ScratchPdf {
    file: NamedTempFile,
}

impl ScratchPdf {
    fn write(bytes: &[u8]) -> Result<Self, IngestError> {
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!(path = %file.path().display(), bytes = bytes.len(), "upload written to temporary file");
        Ok(Self { file })
    }

    fn path(&self) -> &Path {
        self.file.path()
    }

    fn release(self) {
        let path = self.file.path().display().to_string();
        match self.file.close() {
            Ok(()) => debug!(path = %path, "temporary file deleted"),
            Err(error) => warn!(
                path = %path,
                error = %IngestError::TransientResource(error),
                "failed to delete temporary file"
            ),
        }
    }
}

pub struct PipelineBuilder {
    extractor: Arc<dyn PdfExtractor>,
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
    answerer: Option<Arc<dyn Answerer>>,
    top_k: usize,
}

impl PipelineBuilder {
    /// `answerer` is `None` when the LLM credential is not configured; every
    /// build then fails with `MissingCredential`.
    pub fn new(
        extractor: Arc<dyn PdfExtractor>,
        embedder: Arc<dyn Embedder>,
        answerer: Option<Arc<dyn Answerer>>,
    ) -> Self {
        Self {
            extractor,
            splitter: TextSplitter::default(),
            embedder,
            answerer,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn from_settings(
        settings: &ProviderSettings,
        credentials: &ProviderCredentials,
    ) -> Result<Self, ProviderError> {
        let client = settings.http_client()?;

        let embedder: Arc<dyn Embedder> = match settings.embedding_backend {
            EmbeddingBackend::HuggingFace => Arc::new(HuggingFaceEmbedder::new(
                client.clone(),
                &settings.embedding_base_url,
                settings.embedding_model.clone(),
                credentials.embedding_token.clone(),
            )?),
            EmbeddingBackend::Local => Arc::new(CharacterNgramEmbedder::default()),
        };

        let answerer: Option<Arc<dyn Answerer>> = match credentials.llm_api_key.as_deref() {
            Some(api_key) => Some(Arc::new(GroqAnswerer::new(
                client,
                &settings.llm_base_url,
                settings.llm_model.clone(),
                api_key,
            )?)),
            None => None,
        };

        Ok(Self::new(Arc::new(LopdfExtractor), embedder, answerer))
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn has_answerer(&self) -> bool {
        self.answerer.is_some()
    }

    pub async fn build(&self, bytes: &[u8]) -> Result<RetrievalPipeline, QaError> {
        let answerer = self
            .answerer
            .clone()
            .ok_or(QaError::MissingCredential(LLM_API_KEY_VAR))?;

        // Disk write and parsing both block; keep them off the async workers.
        let extractor = Arc::clone(&self.extractor);
        let upload = bytes.to_vec();
        let extracted = tokio::task::spawn_blocking(move || {
            let scratch = ScratchPdf::write(&upload)?;
            let pages = extractor.extract_pages(scratch.path());
            scratch.release();
            pages
        })
        .await;

        let pages = extracted.map_err(|error| {
            IngestError::PdfParse(format!("extraction task failed: {error}"))
        })??;
        if pages.is_empty() {
            return Err(QaError::EmptyDocument);
        }
        info!(pages = pages.len(), "pdf loaded");

        let chunks = self.splitter.split_pages(&pages);
        if chunks.is_empty() {
            return Err(QaError::EmptyDocument);
        }
        info!(chunks = chunks.len(), "document split into chunks");

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_documents(&texts)
            .await
            .map_err(QaError::Embedding)?;
        let index = InMemoryVectorIndex::build(chunks, embeddings).map_err(QaError::Embedding)?;
        info!(
            model = %self.embedder.model_name(),
            vectors = index.len(),
            dimensions = index.dimensions(),
            "vector index built"
        );

        let stats = PipelineStats {
            pages: pages.len(),
            chunks: index.len(),
            dimensions: index.dimensions(),
            built_at: Utc::now(),
        };

        Ok(RetrievalPipeline {
            index: Box::new(index),
            embedder: Arc::clone(&self.embedder),
            answerer,
            top_k: self.top_k,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkingConfig;
    use crate::extractor::fixtures::pdf_with_pages;
    use crate::testing::{
        builder_with_pages, EchoAnswerer, FailingAnswerer, FailingExtractor, RecordingExtractor,
    };

    #[test]
    fn prompt_follows_template() {
        assert_eq!(
            render_prompt("ctx", "why?"),
            "Use the following context to answer the question.\n\nContext: ctx\n\nQuestion: why?"
        );
    }

    #[tokio::test]
    async fn built_pipeline_answers_with_retrieved_context() -> Result<(), QaError> {
        let builder = builder_with_pages(&["The relief valve opens at 210 bar."]);
        let pipeline = builder.build(b"%PDF-1.4 stub").await?;

        assert_eq!(pipeline.stats().pages, 1);
        assert_eq!(pipeline.stats().chunks, 1);

        let answer = pipeline
            .invoke("When does the relief valve open?")
            .await
            .map_err(QaError::AnswerGenerationFailed)?;
        assert_eq!(
            answer,
            render_prompt(
                "The relief valve opens at 210 bar.",
                "When does the relief valve open?"
            )
        );
        Ok(())
    }

    #[tokio::test]
    async fn retrieval_is_capped_at_default_top_k() -> Result<(), QaError> {
        let text = (0..20)
            .map(|index| format!("Paragraph number {index} about pumps."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let builder = builder_with_pages(&[text.as_str()]).with_splitter(
            TextSplitter::new(ChunkingConfig {
                chunk_size: 40,
                chunk_overlap: 0,
            })?,
        );
        let pipeline = builder.build(b"stub").await?;

        assert!(pipeline.stats().chunks > DEFAULT_TOP_K);
        let hits = pipeline
            .retrieve("pumps")
            .await
            .map_err(QaError::AnswerGenerationFailed)?;
        assert_eq!(hits.len(), DEFAULT_TOP_K);
        Ok(())
    }

    #[tokio::test]
    async fn missing_answerer_fails_before_extraction() {
        let extractor = Arc::new(RecordingExtractor::with_pages(&["text"]));
        let builder = PipelineBuilder::new(
            extractor.clone(),
            Arc::new(CharacterNgramEmbedder::default()),
            None,
        );

        let result = builder.build(b"stub").await;

        assert!(matches!(result, Err(QaError::MissingCredential("GROQ_API_KEY"))));
        assert!(extractor.seen_path().is_none());
    }

    #[tokio::test]
    async fn blank_document_is_empty() {
        let builder = builder_with_pages(&[]);
        let result = builder.build(b"stub").await;
        assert!(matches!(result, Err(QaError::EmptyDocument)));
    }

    #[tokio::test]
    async fn temporary_file_is_removed_after_success() -> Result<(), QaError> {
        let extractor = Arc::new(RecordingExtractor::with_pages(&["content"]));
        let builder = PipelineBuilder::new(
            extractor.clone(),
            Arc::new(CharacterNgramEmbedder::default()),
            Some(Arc::new(EchoAnswerer)),
        );

        builder.build(b"%PDF-1.4 bytes").await?;

        let path = extractor.seen_path().expect("extractor should have run");
        assert!(extractor.file_existed());
        assert_eq!(extractor.seen_bytes(), b"%PDF-1.4 bytes".to_vec());
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn upload_is_written_and_parsed_off_the_runtime_thread() -> Result<(), QaError> {
        let extractor = Arc::new(RecordingExtractor::with_pages(&["content"]));
        let builder = PipelineBuilder::new(
            extractor.clone(),
            Arc::new(CharacterNgramEmbedder::default()),
            Some(Arc::new(EchoAnswerer)),
        );

        builder.build(b"%PDF-1.4 bytes").await?;

        let worker = extractor.seen_thread().expect("extractor should have run");
        assert_ne!(worker, std::thread::current().id());
        assert_eq!(extractor.seen_bytes(), b"%PDF-1.4 bytes".to_vec());
        Ok(())
    }

    #[tokio::test]
    async fn temporary_file_is_removed_after_failure() {
        let extractor = Arc::new(FailingExtractor::default());
        let builder = PipelineBuilder::new(
            extractor.clone(),
            Arc::new(CharacterNgramEmbedder::default()),
            Some(Arc::new(EchoAnswerer)),
        );

        let result = builder.build(b"bytes").await;

        assert!(matches!(result, Err(QaError::Ingest(IngestError::PdfParse(_)))));
        let path = extractor.seen_path().expect("extractor should have run");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn answerer_failures_surface_from_invoke() -> Result<(), QaError> {
        let builder = PipelineBuilder::new(
            Arc::new(RecordingExtractor::with_pages(&["content"])),
            Arc::new(CharacterNgramEmbedder::default()),
            Some(Arc::new(FailingAnswerer)),
        );
        let pipeline = builder.build(b"stub").await?;

        let result = pipeline.invoke("anything").await;
        assert!(matches!(result, Err(ProviderError::Request(_))));
        Ok(())
    }

    #[tokio::test]
    async fn real_pdf_flows_through_lopdf() -> Result<(), QaError> {
        let builder = PipelineBuilder::new(
            Arc::new(LopdfExtractor),
            Arc::new(CharacterNgramEmbedder::default()),
            Some(Arc::new(EchoAnswerer)),
        );

        let pipeline = builder
            .build(&pdf_with_pages(&["Hydraulic pump manual", "Maintenance schedule"]))
            .await?;

        assert_eq!(pipeline.stats().pages, 2);
        let answer = pipeline
            .invoke("What is this about?")
            .await
            .map_err(QaError::AnswerGenerationFailed)?;
        assert!(answer.contains("Question: What is this about?"));
        Ok(())
    }
}
