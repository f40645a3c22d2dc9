//! Route path constants
//!
//! Used both by the router and by the `#[utoipa::path]` attributes so the
//! served routes and the OpenAPI document cannot drift apart.

/// API base path
pub const API_V1: &str = "/api/v1";

/// Health check endpoints
pub mod health {
    pub const HEALTH: &str = "/health";
}

/// Documentation endpoints
pub mod docs {
    pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
}

/// Relative to [`API_V1`](super::API_V1)
pub mod api_v1 {
    pub const INSURANCE_DETAILS: &str = "/insurance-details";
    pub const INSURANCE_DETAILS_BY_ID: &str = "/insurance-details/:id";
    pub const INSURANCE_PROVIDERS: &str = "/insurance-providers";
    pub const INSURANCE_PROVIDER_BY_ID: &str = "/insurance-providers/:id";
}

/// Full paths as documented in OpenAPI
pub mod documented {
    pub const INSURANCE_DETAILS: &str = "/api/v1/insurance-details";
    pub const INSURANCE_DETAILS_BY_ID: &str = "/api/v1/insurance-details/{id}";
    pub const INSURANCE_PROVIDERS: &str = "/api/v1/insurance-providers";
    pub const INSURANCE_PROVIDER_BY_ID: &str = "/api/v1/insurance-providers/{id}";
}
