use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::routes::paths;
use crate::server::InsuranceServer;

/// OpenAPI document for the insurance records API
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::handlers::health::health_check,

        // Insurance details endpoints
        crate::handlers::insurance_details::list_insurance_details,
        crate::handlers::insurance_details::create_insurance_details,
        crate::handlers::insurance_details::get_insurance_details,
        crate::handlers::insurance_details::update_insurance_details,
        crate::handlers::insurance_details::delete_insurance_details,

        // Insurance provider endpoints
        crate::handlers::insurance_providers::add_insurance_provider,
        crate::handlers::insurance_providers::list_insurance_providers,
        crate::handlers::insurance_providers::get_insurance_provider,
        crate::handlers::insurance_providers::update_insurance_provider,
        crate::handlers::insurance_providers::delete_insurance_provider,
    ),
    components(
        schemas(
            crate::handlers::health::HealthResponse,
            crate::error::ApiErrorResponse,
            insurance_service::PaginationInfo,
            insurance_service::InsuranceProvider,
            insurance_service::InsuranceDetails,
            insurance_service::InsuranceDetailsListRow,
            insurance_service::InsuranceDetailsView,
            insurance_service::InsuranceDetailsRequest,
            crate::handlers::insurance_details::InsuranceDetailsWritten,
            crate::handlers::insurance_providers::ProviderForm,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "insurance-details", description = "Insurance authorizations per recipient"),
        (name = "insurance-providers", description = "Insurance providers (payers)"),
    ),
    info(
        title = "Insurance Records API",
        version = "1.0.0",
        description = "Insurance providers and insurance details with active-contract supersession.",
    ),
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create OpenAPI documentation routes
pub fn create_docs_routes() -> Router<InsuranceServer> {
    Router::new().route(paths::docs::OPENAPI_JSON, get(openapi_json))
}
