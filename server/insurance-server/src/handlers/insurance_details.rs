use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use insurance_service::{
    InsuranceDetails, InsuranceDetailsListRow, InsuranceDetailsQuery, InsuranceDetailsRequest,
    InsuranceDetailsView, ListInsuranceDetailsParams, SupersededWrite,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{api_paginated, api_success, no_content, ApiError, ApiErrorResponse, ApiResponse};
use crate::server::InsuranceServer;

/// Written record plus the ids of the records it superseded
#[derive(Debug, Serialize, ToSchema)]
pub struct InsuranceDetailsWritten {
    #[serde(flatten)]
    pub record: InsuranceDetails,
    /// Previously active records now marked inactive
    pub superseded_ids: Vec<i64>,
}

impl From<SupersededWrite> for InsuranceDetailsWritten {
    fn from(write: SupersededWrite) -> Self {
        Self {
            record: write.record,
            superseded_ids: write.superseded,
        }
    }
}

/// List insurance details
///
/// Search on recipient name or MA number, filter on service start date,
/// sort by date or recipient name, paginate.
#[utoipa::path(
    get,
    path = crate::routes::paths::documented::INSURANCE_DETAILS,
    params(ListInsuranceDetailsParams),
    responses(
        (status = 200, description = "Page of insurance details", body = Vec<InsuranceDetailsListRow>),
        (status = 400, description = "Malformed query parameter", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-details"
)]
pub async fn list_insurance_details(
    State(server): State<InsuranceServer>,
    Query(params): Query<ListInsuranceDetailsParams>,
) -> Result<Json<ApiResponse<Vec<InsuranceDetailsListRow>>>, ApiError> {
    let query = InsuranceDetailsQuery::try_from(params)?;
    let page = server.insurance.list_details(query).await?;

    Ok(Json(api_paginated(
        "Data fetched successfully",
        page.rows,
        page.pagination,
    )))
}

/// Create insurance details
///
/// Active records of the same recipient whose service dates overlap the new
/// range are marked inactive in the same transaction.
#[utoipa::path(
    post,
    path = crate::routes::paths::documented::INSURANCE_DETAILS,
    request_body = InsuranceDetailsRequest,
    responses(
        (status = 201, description = "Insurance details created", body = InsuranceDetailsWritten),
        (status = 400, description = "Invalid request", body = ApiErrorResponse),
        (status = 409, description = "Conflicts with existing records", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-details"
)]
pub async fn create_insurance_details(
    State(server): State<InsuranceServer>,
    payload: Result<Json<InsuranceDetailsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<InsuranceDetailsWritten>>), ApiError> {
    let Json(request) = payload?;
    let write = server.insurance.create_detail(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(api_success("New insurance created successfully", write.into())),
    ))
}

/// Update insurance details
#[utoipa::path(
    put,
    path = crate::routes::paths::documented::INSURANCE_DETAILS_BY_ID,
    params(("id" = i64, Path, description = "Insurance details ID")),
    request_body = InsuranceDetailsRequest,
    responses(
        (status = 200, description = "Insurance details updated", body = InsuranceDetailsWritten),
        (status = 400, description = "Invalid request", body = ApiErrorResponse),
        (status = 404, description = "Insurance details not found", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-details"
)]
pub async fn update_insurance_details(
    State(server): State<InsuranceServer>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<InsuranceDetailsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<InsuranceDetailsWritten>>, ApiError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let write = server.insurance.update_detail(id, request).await?;

    Ok(Json(api_success(
        "Insurance details updated successfully",
        write.into(),
    )))
}

/// Get insurance details by ID, joined with provider and doctor
#[utoipa::path(
    get,
    path = crate::routes::paths::documented::INSURANCE_DETAILS_BY_ID,
    params(("id" = i64, Path, description = "Insurance details ID")),
    responses(
        (status = 200, description = "Insurance details found", body = InsuranceDetailsView),
        (status = 204, description = "No insurance details with this ID"),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-details"
)]
pub async fn get_insurance_details(
    State(server): State<InsuranceServer>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = path?;
    match server.insurance.get_detail(id).await? {
        Some(view) => Ok(Json(api_success("Insurance details fetched successfully", view)).into_response()),
        None => Ok(no_content("No insurance details found")),
    }
}

/// Delete insurance details
#[utoipa::path(
    delete,
    path = crate::routes::paths::documented::INSURANCE_DETAILS_BY_ID,
    params(("id" = i64, Path, description = "Insurance details ID")),
    responses(
        (status = 200, description = "Insurance details deleted", body = InsuranceDetails),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
        (status = 404, description = "Insurance details not found", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "insurance-details"
)]
pub async fn delete_insurance_details(
    State(server): State<InsuranceServer>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<InsuranceDetails>>, ApiError> {
    let Path(id) = path?;
    let deleted = server.insurance.delete_detail(id).await?;
    Ok(Json(api_success("Insurance details deleted successfully", deleted)))
}
