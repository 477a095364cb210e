use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("failed to release temporary file: {0}")]
    TransientResource(std::io::Error),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("provider request failed: {0}")]
    Request(String),

    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Outcome taxonomy of the upload and ask flows.
///
/// `Validation` and `UnknownDocument` are client faults; everything else is a
/// server-side processing failure.
#[derive(Debug, Error)]
pub enum QaError {
    #[error("{0}")]
    Validation(String),

    #[error("PDF file is empty or could not be loaded")]
    EmptyDocument,

    #[error("{0} not found in environment variables")]
    MissingCredential(&'static str),

    #[error("PDF with ID '{0}' not found. Please upload the PDF first using /upload endpoint.")]
    UnknownDocument(String),

    #[error("{0}")]
    AnswerGenerationFailed(#[source] ProviderError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("embedding failed: {0}")]
    Embedding(#[source] ProviderError),
}

impl QaError {
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownDocument(_))
    }
}

pub type Result<T, E = QaError> = std::result::Result<T, E>;
