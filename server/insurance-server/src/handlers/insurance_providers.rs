use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::PathRejection,
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use insurance_service::{parse_flag, InsuranceProvider, NewInsuranceProvider, ProviderChanges};
use serde::Deserialize;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::error::{api_success, no_content, ApiError, ApiErrorResponse, ApiResponse};
use crate::server::InsuranceServer;
use crate::storage::LogoStorage;
use crate::validation::RequestValidation;
use crate::{validate_length, validate_required};

const LOGO_FIELD: &str = "logo";

/// Multipart form for provider create and update
///
/// Text fields are trimmed and blank values count as absent.
#[derive(Debug, Default, ToSchema)]
pub struct ProviderForm {
    pub provider_name: Option<String>,
    pub phone_no_1: Option<String>,
    pub phone_no_2: Option<String>,
    /// `true`/`false` or `1`/`0`
    #[schema(value_type = Option<String>)]
    pub is_default: Option<bool>,
    pub provider_code: Option<String>,
    /// Optional logo file
    #[schema(value_type = Option<String>, format = Binary)]
    pub logo: Option<LogoUpload>,
}

#[derive(Debug)]
pub struct LogoUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl ProviderForm {
    /// Read every field of the multipart body
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();

            if name == LOGO_FIELD {
                let file_name = field.file_name().map(ToString::to_string);
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.logo = Some(LogoUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }

            let value = field.text().await?;
            let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            match name.as_str() {
                "provider_name" => form.provider_name = value,
                "phone_no_1" => form.phone_no_1 = value,
                "phone_no_2" => form.phone_no_2 = value,
                "provider_code" => form.provider_code = value,
                "is_default" => form.is_default = parse_flag("is_default", value.as_deref())?,
                other => debug!(field = %other, "Ignoring unknown provider form field"),
            }
        }

        form.validate()?;
        Ok(form)
    }

    /// Store the logo, if any, and return its public location
    async fn store_logo(&mut self, storage: &LogoStorage) -> Result<Option<String>, ApiError> {
        match self.logo.take() {
            Some(logo) => Ok(Some(storage.store(logo.file_name.as_deref(), &logo.bytes).await?)),
            None => Ok(None),
        }
    }

    fn into_new_provider(self, logo_location: Option<String>) -> NewInsuranceProvider {
        NewInsuranceProvider {
            provider_name: self.provider_name.unwrap_or_default(),
            phone_no_1: self.phone_no_1,
            phone_no_2: self.phone_no_2,
            logo_location,
            is_default: self.is_default.unwrap_or(false),
            provider_code: self.provider_code,
        }
    }

    fn into_changes(self, logo_location: Option<String>) -> ProviderChanges {
        ProviderChanges {
            provider_name: self.provider_name,
            phone_no_1: self.phone_no_1,
            phone_no_2: self.phone_no_2,
            logo_location,
            is_default: self.is_default,
            provider_code: self.provider_code,
        }
    }
}

impl RequestValidation for ProviderForm {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(ref name) = self.provider_name {
            validate_length!(name, 1, 200, "Provider name must be between 1 and 200 characters");
        }
        for phone in [&self.phone_no_1, &self.phone_no_2].into_iter().flatten() {
            validate_length!(phone, 1, 30, "Phone numbers must be at most 30 characters");
        }
        if let Some(ref code) = self.provider_code {
            validate_length!(code, 1, 50, "Provider code must be at most 50 characters");
        }
        Ok(())
    }
}

/// Query parameters for the provider list
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProvidersParams {
    /// `true`/`false` or `1`/`0`
    pub is_default: Option<String>,
}

/// Add an insurance provider
///
/// With `is_default=true` the flag is removed from every other provider first.
#[utoipa::path(
    post,
    path = crate::routes::paths::documented::INSURANCE_PROVIDERS,
    request_body(content = ProviderForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Provider created", body = InsuranceProvider),
        (status = 400, description = "Invalid form", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-providers"
)]
pub async fn add_insurance_provider(
    State(server): State<InsuranceServer>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<InsuranceProvider>>), ApiError> {
    let mut form = ProviderForm::from_multipart(multipart?).await?;
    let provider_name = form.provider_name.clone().unwrap_or_default();
    validate_required!(provider_name, "provider_name is required");

    let logo_location = form.store_logo(&server.logos).await?;
    let result = server
        .insurance
        .add_provider(form.into_new_provider(logo_location.clone()))
        .await;

    match result {
        Ok(provider) => Ok((
            StatusCode::CREATED,
            Json(api_success("Insurance Provider added successfully", provider)),
        )),
        Err(err) => {
            if let Some(location) = logo_location {
                server.logos.remove(&location).await;
            }
            Err(err.into())
        }
    }
}

/// List insurance providers
#[utoipa::path(
    get,
    path = crate::routes::paths::documented::INSURANCE_PROVIDERS,
    params(ListProvidersParams),
    responses(
        (status = 200, description = "Providers", body = Vec<InsuranceProvider>),
        (status = 204, description = "No providers match"),
        (status = 400, description = "Malformed is_default", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-providers"
)]
pub async fn list_insurance_providers(
    State(server): State<InsuranceServer>,
    Query(params): Query<ListProvidersParams>,
) -> Result<Response, ApiError> {
    let is_default = parse_flag("is_default", params.is_default.as_deref())?;
    let providers = server.insurance.list_providers(is_default).await?;

    if providers.is_empty() {
        return Ok(no_content("No insurance providers found"));
    }
    Ok(Json(api_success("Insurance providers fetched successfully", providers)).into_response())
}

/// Get an insurance provider by ID
#[utoipa::path(
    get,
    path = crate::routes::paths::documented::INSURANCE_PROVIDER_BY_ID,
    params(("id" = i64, Path, description = "Insurance provider ID")),
    responses(
        (status = 200, description = "Provider found", body = InsuranceProvider),
        (status = 204, description = "No provider with this ID"),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-providers"
)]
pub async fn get_insurance_provider(
    State(server): State<InsuranceServer>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = path?;
    match server.insurance.get_provider(id).await? {
        Some(provider) => {
            Ok(Json(api_success("Insurance provider fetched successfully", provider)).into_response())
        }
        None => Ok(no_content("No insurance provider found")),
    }
}

/// Update an insurance provider
///
/// Only supplied fields change. A new logo replaces the stored one.
#[utoipa::path(
    put,
    path = crate::routes::paths::documented::INSURANCE_PROVIDER_BY_ID,
    params(("id" = i64, Path, description = "Insurance provider ID")),
    request_body(content = ProviderForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Provider updated", body = InsuranceProvider),
        (status = 400, description = "Invalid form or no changes", body = ApiErrorResponse),
        (status = 404, description = "Provider not found", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-providers"
)]
pub async fn update_insurance_provider(
    State(server): State<InsuranceServer>,
    path: Result<Path<i64>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<InsuranceProvider>>, ApiError> {
    let Path(id) = path?;
    let mut form = ProviderForm::from_multipart(multipart?).await?;

    let previous_logo = match form.logo {
        Some(_) => server
            .insurance
            .get_provider(id)
            .await?
            .and_then(|provider| provider.logo_location),
        None => None,
    };

    let logo_location = form.store_logo(&server.logos).await?;
    let result = server
        .insurance
        .update_provider(id, form.into_changes(logo_location.clone()))
        .await;

    match result {
        Ok(provider) => {
            if let Some(previous) = previous_logo.filter(|p| provider.logo_location.as_ref() != Some(p)) {
                server.logos.remove(&previous).await;
            }
            Ok(Json(api_success("Provider updated successfully", provider)))
        }
        Err(err) => {
            if let Some(location) = logo_location {
                server.logos.remove(&location).await;
            }
            Err(err.into())
        }
    }
}

/// Delete an insurance provider
#[utoipa::path(
    delete,
    path = crate::routes::paths::documented::INSURANCE_PROVIDER_BY_ID,
    params(("id" = i64, Path, description = "Insurance provider ID")),
    responses(
        (status = 200, description = "Provider deleted", body = InsuranceProvider),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
        (status = 404, description = "Provider not found", body = ApiErrorResponse),
        (status = 409, description = "Provider is referenced by insurance details", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-providers"
)]
pub async fn delete_insurance_provider(
    State(server): State<InsuranceServer>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<InsuranceProvider>>, ApiError> {
    let Path(id) = path?;
    let deleted = server.insurance.delete_provider(id).await?;

    if let Some(ref location) = deleted.logo_location {
        server.logos.remove(location).await;
    }
    Ok(Json(api_success("Provider deleted successfully", deleted)))
}
