use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use gleaner_core::batch::BatchConfig;
use gleaner_core::error::AppError;
use gleaner_core::traits::StructuredExtractor;
use gleaner_core::util::normalize_url;

use crate::dto::{
    BatchRequest, BatchResponse, EventResponse, ExtractRequest, ExtractResponse, HealthResponse,
    ResultResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/batch", post(batch))
        .route("/v1/extract", post(extract))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

fn check_url_count(count: usize, max_urls: usize) -> Result<(), ApiError> {
    if count > max_urls {
        return Err(AppError::InvalidInput(format!(
            "Too many URLs: {count} (limit is {max_urls})"
        ))
        .into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Apply a request's overrides; they may lower the server limits, never raise them.
fn request_config(limits: &BatchConfig, body: &BatchRequest) -> BatchConfig {
    let mut config = limits.clone();
    if let Some(limit) = body.concurrency {
        config = config.with_concurrency_limit(limit.min(limits.concurrency_limit));
    }
    if let Some(secs) = body.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs).min(limits.timeout));
    }
    config
}

#[utoipa::path(
    post,
    path = "/v1/batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "One record per URL, in request order", body = BatchResponse),
        (status = 400, description = "Unusable URL list or settings", body = crate::dto::ErrorResponse),
    ),
    tag = "batch"
)]
pub async fn batch(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<BatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_url_count(body.urls.len(), state.config.max_urls)?;

    let config = request_config(&state.config.batch, &body);
    let records = state.batch.run(&body.urls, &config).await?;
    let succeeded = records.iter().filter(|r| r.is_success()).count();
    let failed = records.len() - succeeded;

    Ok(axum::Json(BatchResponse {
        results: records.into_iter().map(ResultResponse::from).collect(),
        succeeded,
        failed,
    }))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/extract",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Events found across all URLs", body = ExtractResponse),
        (status = 400, description = "Invalid URL", body = crate::dto::ErrorResponse),
        (status = 429, description = "LLM rate limit exceeded", body = crate::dto::ErrorResponse),
        (status = 502, description = "A page could not be fetched", body = crate::dto::ErrorResponse),
        (status = 504, description = "A page fetch timed out", body = crate::dto::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn extract(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<ExtractRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = state.events.as_ref().ok_or_else(|| {
        AppError::ConfigError("GLEANER_API_KEY must be set for /v1/extract".to_string())
    })?;

    check_url_count(body.urls.len(), state.config.max_urls)?;
    // Reject a bad URL before spending any fetches or LLM calls.
    for url in &body.urls {
        normalize_url(url)?;
    }

    let mut events = Vec::new();
    for url in &body.urls {
        let found = pipeline.extract_structured(url).await?;
        events.extend(found.into_iter().map(EventResponse::from));
    }

    Ok(axum::Json(ExtractResponse { events }))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "healthy",
        llm: if state.events.is_some() {
            "configured"
        } else {
            "disabled"
        },
    })
}
