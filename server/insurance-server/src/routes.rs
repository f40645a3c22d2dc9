pub mod paths;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use tower_http::services::ServeDir;

use crate::{
    handlers::{health, insurance_details, insurance_providers},
    openapi,
    server::InsuranceServer,
};

/// Multipart framing on top of the logo itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create health check routes
pub fn health_routes() -> Router<InsuranceServer> {
    Router::new().route(paths::health::HEALTH, get(health::health_check))
}

/// Insurance details: listing, supersession-aware create and update, lookup, delete
pub fn insurance_details_routes() -> Router<InsuranceServer> {
    Router::new()
        .route(
            paths::api_v1::INSURANCE_DETAILS,
            get(insurance_details::list_insurance_details)
                .post(insurance_details::create_insurance_details),
        )
        .route(
            paths::api_v1::INSURANCE_DETAILS_BY_ID,
            get(insurance_details::get_insurance_details)
                .put(insurance_details::update_insurance_details)
                .delete(insurance_details::delete_insurance_details),
        )
}

/// Insurance providers; create and update take multipart bodies with an optional logo
pub fn insurance_provider_routes(max_upload_bytes: usize) -> Router<InsuranceServer> {
    Router::new()
        .route(
            paths::api_v1::INSURANCE_PROVIDERS,
            get(insurance_providers::list_insurance_providers)
                .post(insurance_providers::add_insurance_provider),
        )
        .route(
            paths::api_v1::INSURANCE_PROVIDER_BY_ID,
            get(insurance_providers::get_insurance_provider)
                .put(insurance_providers::update_insurance_provider)
                .delete(insurance_providers::delete_insurance_provider),
        )
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}

/// Create API v1 routes
pub fn api_v1_routes(server: &InsuranceServer) -> Router<InsuranceServer> {
    Router::new()
        .merge(insurance_details_routes())
        .merge(insurance_provider_routes(server.logos.max_bytes()))
}

/// Create all application routes
pub fn create_routes(server: &InsuranceServer) -> Router<InsuranceServer> {
    Router::new()
        .merge(health_routes())
        .merge(openapi::create_docs_routes())
        .nest(paths::API_V1, api_v1_routes(server))
        .nest_service(
            server.logos.public_prefix(),
            ServeDir::new(server.logos.directory()),
        )
}
