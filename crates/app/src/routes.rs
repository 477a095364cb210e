use crate::{error::ApiError, state::AppState};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart, TypedMultipartError};
use bytes::Bytes;
use pdf_qa_core::{AskRequest, LLM_API_KEY_VAR};
use serde::Serialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Debug, TryFromMultipart)]
pub struct UploadForm {
    #[form_data(limit = "unlimited")]
    pub file: FieldData<Bytes>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

pub fn app_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/upload",
            post(upload_pdf).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/ask", post(ask_question))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Route: POST /upload
pub async fn upload_pdf(
    State(state): State<AppState>,
    form: Result<TypedMultipart<UploadForm>, TypedMultipartError>,
) -> Result<impl IntoResponse, ApiError> {
    let TypedMultipart(input) = form?;
    let filename = input.file.metadata.file_name.as_deref();
    info!(filename = ?filename, bytes = input.file.contents.len(), "received pdf upload");

    let receipt = state
        .service
        .upload(filename, &input.file.contents)
        .await
        .map_err(ApiError::from_upload)?;

    Ok((StatusCode::OK, Json(receipt)))
}

/// Route: POST /ask
pub async fn ask_question(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let answer = state
        .service
        .ask(&request.pdf_id, &request.question)
        .await
        .map_err(ApiError::from_ask)?;

    Ok((StatusCode::OK, Json(AnswerResponse { answer })))
}

/// Credential report; always 200.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let documents = state.service.registry().len().await;
    let body = match state.credentials.require_llm_api_key() {
        Ok(_) => json!({
            "status": "healthy",
            "groq_api_key_configured": true,
            "hf_token_configured": state.credentials.has_embedding_token(),
            "documents": documents,
        }),
        Err(_) => json!({
            "status": "unhealthy",
            "error": format!("{LLM_API_KEY_VAR} not found in environment variables"),
        }),
    };

    (StatusCode::OK, Json(body))
}

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "PDF Q&A API is running",
        "endpoints": {
            "POST /upload": "Upload and process a PDF file (returns pdf_id)",
            "POST /ask": "Ask a question about a previously uploaded PDF (requires pdf_id and question)",
            "GET /health": "Report whether the required API credentials are configured",
        }
    }))
}
