//! OpenAPI documentation, served at `/api/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use skintegrity_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Skintegrity Scanner API",
        version = "0.1.0",
        description = "Submits uploaded videos to the deepfake inference service and relays its results."
    ),
    paths(
        handlers::analysis::process_video,
        handlers::analysis::poll_result,
    ),
    components(schemas(
        models::ProcessVideoRequest,
        models::PollResultRequest,
        models::AnalysisOutcome,
        models::Classification,
        error::ErrorResponse,
    )),
    tags(
        (name = "analysis", description = "Video analysis trigger and polling")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
