mod error;
mod routes;
mod state;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use pdf_qa_core::{
    EmbeddingBackend, PipelineBuilder, ProviderCredentials, ProviderSettings,
    DEFAULT_GROQ_BASE_URL, DEFAULT_GROQ_MODEL, DEFAULT_HF_BASE_URL, DEFAULT_HF_MODEL,
    LLM_API_KEY_VAR,
};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::routes::app_router;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "pdf-qa-server", version)]
struct Cli {
    /// Interface to bind
    #[arg(long, env = "PDF_QA_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PDF_QA_PORT", default_value = "8000")]
    port: u16,

    /// OpenAI-compatible base URL of the Groq API
    #[arg(long, env = "GROQ_BASE_URL", default_value = DEFAULT_GROQ_BASE_URL)]
    groq_base_url: String,

    /// Chat model used to answer questions
    #[arg(long, env = "GROQ_MODEL", default_value = DEFAULT_GROQ_MODEL)]
    groq_model: String,

    /// Embedding backend.
    #[arg(long, value_enum, default_value_t = EmbedderArg::HuggingFace)]
    embedder: EmbedderArg,

    /// Hugging Face inference base URL
    #[arg(long, env = "HF_INFERENCE_BASE_URL", default_value = DEFAULT_HF_BASE_URL)]
    embedding_base_url: String,

    /// Sentence embedding model
    #[arg(long, env = "HF_EMBEDDING_MODEL", default_value = DEFAULT_HF_MODEL)]
    embedding_model: String,

    /// Deadline for each outbound provider call. Unset means no deadline.
    #[arg(long, env = "PDF_QA_HTTP_TIMEOUT_SECS")]
    http_timeout_secs: Option<u64>,

    /// Largest accepted upload body, in bytes.
    #[arg(long, env = "PDF_QA_MAX_UPLOAD_BYTES", default_value = "52428800")]
    max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmbedderArg {
    /// Hugging Face inference API
    HuggingFace,
    /// Offline character trigrams
    Local,
}

impl From<EmbedderArg> for EmbeddingBackend {
    fn from(value: EmbedderArg) -> Self {
        match value {
            EmbedderArg::HuggingFace => EmbeddingBackend::HuggingFace,
            EmbedderArg::Local => EmbeddingBackend::Local,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-qa-server boot"
    );

    let credentials = ProviderCredentials::from_env();
    if credentials.llm_api_key.is_none() {
        error!("{LLM_API_KEY_VAR} not found in environment variables; uploads will fail until it is set");
    }
    if credentials.has_embedding_token() {
        info!("HuggingFace token is configured");
    }

    let settings = ProviderSettings {
        llm_base_url: cli.groq_base_url,
        llm_model: cli.groq_model,
        embedding_backend: cli.embedder.into(),
        embedding_base_url: cli.embedding_base_url,
        embedding_model: cli.embedding_model,
        http_timeout: cli.http_timeout_secs.map(Duration::from_secs),
    };

    let builder = pipeline_builder(&settings, &credentials)?;
    info!(
        embedder = ?settings.embedding_backend,
        llm_model = %settings.llm_model,
        answerer_ready = builder.has_answerer(),
        "pipeline builder initialized"
    );

    let app = app_router(AppState::new(builder, credentials), cli.max_upload_bytes);

    let serve_address = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&serve_address).await?;
    info!(address = %serve_address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn pipeline_builder(
    settings: &ProviderSettings,
    credentials: &ProviderCredentials,
) -> anyhow::Result<PipelineBuilder> {
    PipelineBuilder::from_settings(settings, credentials).context("building pipeline")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
