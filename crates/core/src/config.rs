use crate::answerer::{DEFAULT_GROQ_BASE_URL, DEFAULT_GROQ_MODEL};
use crate::embeddings::{DEFAULT_HF_BASE_URL, DEFAULT_HF_MODEL};
use crate::error::{ProviderError, QaError};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub const LLM_API_KEY_VAR: &str = "GROQ_API_KEY";
pub const EMBEDDING_TOKEN_VARS: [&str; 3] = ["HF_TOKEN", "HUGGINGFACE_TOKEN", "HUGGINGFACE_HUB_TOKEN"];

/// Secrets for the external providers. Blank values count as absent.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub llm_api_key: Option<String>,
    pub embedding_token: Option<String>,
}

impl ProviderCredentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| {
            lookup(name).and_then(|value| {
                let value = value.trim().to_string();
                if value.is_empty() {
                    None
                } else {
                    Some(value)
                }
            })
        };

        Self {
            llm_api_key: non_blank(LLM_API_KEY_VAR),
            embedding_token: EMBEDDING_TOKEN_VARS.iter().find_map(|name| non_blank(name)),
        }
    }

    pub fn require_llm_api_key(&self) -> Result<&str, QaError> {
        self.llm_api_key
            .as_deref()
            .ok_or(QaError::MissingCredential(LLM_API_KEY_VAR))
    }

    pub fn has_embedding_token(&self) -> bool {
        self.embedding_token.is_some()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "embedding_token",
                &self.embedding_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingBackend {
    #[default]
    HuggingFace,
    /// Offline hashed trigrams; no network access.
    Local,
}

/// Endpoints and models of the external providers.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub llm_base_url: String,
    pub llm_model: String,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_base_url: String,
    pub embedding_model: String,
    /// `None` leaves outbound calls without a deadline.
    pub http_timeout: Option<Duration>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            llm_base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            llm_model: DEFAULT_GROQ_MODEL.to_string(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_base_url: DEFAULT_HF_BASE_URL.to_string(),
            embedding_model: DEFAULT_HF_MODEL.to_string(),
            http_timeout: None,
        }
    }
}

impl ProviderSettings {
    pub fn http_client(&self) -> Result<Client, ProviderError> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.http_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}
