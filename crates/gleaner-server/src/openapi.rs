use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gleaner API",
        version = "0.1.0",
        description = "Concurrent page content extraction and LLM-powered event extraction."
    ),
    paths(
        crate::routes::batch,
        crate::routes::extract,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::BatchRequest,
        crate::dto::BatchResponse,
        crate::dto::ResultResponse,
        crate::dto::ContentResponse,
        crate::dto::ResultErrorResponse,
        crate::dto::ExtractRequest,
        crate::dto::ExtractResponse,
        crate::dto::EventResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "batch", description = "Readable content for many pages at once"),
        (name = "events", description = "Structured event extraction"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
