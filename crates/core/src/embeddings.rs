use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;
pub const DEFAULT_HF_BASE_URL: &str = "https://router.huggingface.co/hf-inference/";
pub const DEFAULT_HF_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
const HF_BATCH_SIZE: usize = 32;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| ProviderError::BackendResponse {
            backend: self.model_name().to_string(),
            details: "no embedding returned for query".to_string(),
        })
    }
}

/// Hashed character trigram embedder. Deterministic and offline.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn model_name(&self) -> &str {
        "character-trigram"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

/// Sentence embeddings from the Hugging Face inference feature-extraction
/// pipeline. Without a token the public, rate-limited access is used.
#[derive(Clone)]
pub struct HuggingFaceEmbedder {
    client: Client,
    endpoint: Url,
    model: String,
    token: Option<String>,
}

impl HuggingFaceEmbedder {
    pub fn new(
        client: Client,
        base_url: &str,
        model: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, ProviderError> {
        let model = model.into();
        let endpoint = feature_extraction_url(base_url, &model)?;
        if token.is_none() {
            warn!(
                model = %model,
                "no Hugging Face token configured, using unauthenticated access"
            );
        }

        Ok(Self {
            client,
            endpoint,
            model,
            token,
        })
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&FeatureExtractionRequest { inputs: batch });

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::BackendResponse {
                backend: "huggingface".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let vectors: Vec<Vec<f32>> = response.json().await?;
        if vectors.len() != batch.len() {
            return Err(ProviderError::BackendResponse {
                backend: "huggingface".to_string(),
                details: format!(
                    "expected {} embeddings, received {}",
                    batch.len(),
                    vectors.len()
                ),
            });
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(HF_BATCH_SIZE) {
            debug!(model = %self.model, batch = batch.len(), "requesting embeddings");
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

fn feature_extraction_url(base_url: &str, model: &str) -> Result<Url, ProviderError> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&base)?.join(&format!("models/{model}/pipeline/feature-extraction"))?)
}
