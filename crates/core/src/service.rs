use crate::error::QaError;
use crate::models::{DocumentId, UploadReceipt};
use crate::pipeline::PipelineBuilder;
use crate::registry::SessionRegistry;
use std::sync::Arc;
use tracing::info;

pub const UPLOAD_SUCCESS_MESSAGE: &str = "PDF uploaded and processed successfully";
const QUESTION_PREVIEW_CHARS: usize = 50;

/// Upload and ask flows over an injected registry and builder.
#[derive(Clone)]
pub struct QaService {
    registry: Arc<SessionRegistry>,
    builder: Arc<PipelineBuilder>,
}

impl QaService {
    pub fn new(registry: Arc<SessionRegistry>, builder: Arc<PipelineBuilder>) -> Self {
        Self { registry, builder }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn builder(&self) -> &PipelineBuilder {
        &self.builder
    }

    pub async fn upload(
        &self,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> Result<UploadReceipt, QaError> {
        let filename = filename
            .filter(|name| name.ends_with(".pdf"))
            .ok_or_else(|| QaError::Validation("File must be a PDF".to_string()))?;
        if bytes.is_empty() {
            return Err(QaError::Validation("Uploaded file is empty".to_string()));
        }

        info!(filename = %filename, bytes = bytes.len(), "building retrieval pipeline");
        let pipeline = self.builder.build(bytes).await?;
        let pdf_id = self.registry.register(pipeline).await;
        info!(pdf_id = %pdf_id, filename = %filename, "pdf processed and stored");

        Ok(UploadReceipt {
            pdf_id,
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            filename: filename.to_string(),
        })
    }

    pub async fn ask(&self, pdf_id: &str, question: &str) -> Result<String, QaError> {
        if pdf_id.trim().is_empty() {
            return Err(QaError::Validation("pdf_id cannot be empty".to_string()));
        }
        if question.trim().is_empty() {
            return Err(QaError::Validation("Question cannot be empty".to_string()));
        }

        info!(
            pdf_id = %pdf_id,
            question = %question.chars().take(QUESTION_PREVIEW_CHARS).collect::<String>(),
            "question received"
        );

        let id = DocumentId::from(pdf_id);
        let pipeline = self
            .registry
            .lookup(&id)
            .await
            .ok_or_else(|| QaError::UnknownDocument(pdf_id.to_string()))?;

        let answer = pipeline
            .invoke(question)
            .await
            .map_err(QaError::AnswerGenerationFailed)?;
        info!(pdf_id = %pdf_id, answer_chars = answer.chars().count(), "answer generated");

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::pipeline::render_prompt;
    use crate::testing::{builder_with_pages, FailingAnswerer, RecordingExtractor};

    fn service(builder: PipelineBuilder) -> QaService {
        QaService::new(Arc::new(SessionRegistry::new()), Arc::new(builder))
    }

    #[tokio::test]
    async fn upload_then_ask_returns_answer() -> Result<(), QaError> {
        let service = service(builder_with_pages(&["This manual covers pump maintenance."]));

        let receipt = service.upload(Some("doc.pdf"), b"%PDF-1.4").await?;
        assert_eq!(receipt.filename, "doc.pdf");
        assert_eq!(receipt.message, UPLOAD_SUCCESS_MESSAGE);

        let answer = service
            .ask(receipt.pdf_id.as_str(), "What is this about?")
            .await?;
        assert_eq!(
            answer,
            render_prompt("This manual covers pump maintenance.", "What is this about?")
        );

        let missing = service.ask("not-a-real-id", "What is this about?").await;
        assert!(matches!(missing, Err(QaError::UnknownDocument(id)) if id == "not-a-real-id"));
        Ok(())
    }

    #[tokio::test]
    async fn non_pdf_filename_is_rejected_before_ingestion() {
        let extractor = Arc::new(RecordingExtractor::with_pages(&["text"]));
        let service = service(PipelineBuilder::new(
            extractor.clone(),
            Arc::new(CharacterNgramEmbedder::default()),
            None,
        ));

        for name in [Some("notes.txt"), Some("doc.PDF"), Some("pdf"), None] {
            let result = service.upload(name, b"%PDF-1.4").await;
            assert!(matches!(result, Err(QaError::Validation(_))));
        }
        assert!(extractor.seen_path().is_none());
    }

    #[tokio::test]
    async fn empty_upload_is_rejected_and_registry_unchanged() {
        let extractor = Arc::new(RecordingExtractor::with_pages(&["text"]));
        let service = service(PipelineBuilder::new(
            extractor.clone(),
            Arc::new(CharacterNgramEmbedder::default()),
            None,
        ));

        let result = service.upload(Some("doc.pdf"), b"").await;

        assert!(
            matches!(result, Err(QaError::Validation(message)) if message == "Uploaded file is empty")
        );
        assert!(extractor.seen_path().is_none());
        assert!(service.registry().is_empty().await);
    }

    #[tokio::test]
    async fn failed_build_registers_nothing() {
        let service = service(builder_with_pages(&[]));

        let result = service.upload(Some("blank.pdf"), b"%PDF-1.4").await;

        assert!(matches!(result, Err(QaError::EmptyDocument)));
        assert!(service.registry().is_empty().await);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_even_for_known_ids() -> Result<(), QaError> {
        let service = service(builder_with_pages(&["content"]));
        let receipt = service.upload(Some("doc.pdf"), b"%PDF").await?;

        let blank_question = service.ask(receipt.pdf_id.as_str(), "  \t ").await;
        assert!(
            matches!(blank_question, Err(QaError::Validation(message)) if message == "Question cannot be empty")
        );

        let blank_id = service.ask("   ", "What?").await;
        assert!(
            matches!(blank_id, Err(QaError::Validation(message)) if message == "pdf_id cannot be empty")
        );
        Ok(())
    }

    #[tokio::test]
    async fn answerer_failure_is_answer_generation_failed_and_keeps_entry() -> Result<(), QaError> {
        let service = service(PipelineBuilder::new(
            Arc::new(RecordingExtractor::with_pages(&["content"])),
            Arc::new(CharacterNgramEmbedder::default()),
            Some(Arc::new(FailingAnswerer)),
        ));
        let receipt = service.upload(Some("doc.pdf"), b"%PDF").await?;

        let result = service.ask(receipt.pdf_id.as_str(), "What?").await;

        assert!(matches!(result, Err(QaError::AnswerGenerationFailed(_))));
        assert!(service.registry().lookup(&receipt.pdf_id).await.is_some());
        Ok(())
    }
}
