use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{InsuranceError, InsuranceResult};
use crate::supersession::ServiceDateRange;

/// Insurance provider (payer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct InsuranceProvider {
    pub id: i64,
    #[schema(example = "Medical Assistance")]
    pub provider_name: String,
    pub phone_no_1: Option<String>,
    pub phone_no_2: Option<String>,
    /// Public path of the uploaded logo, e.g. `/uploads/3f2c….png`
    pub logo_location: Option<String>,
    /// At most one provider carries the flag
    pub is_default: bool,
    pub provider_code: Option<String>,
}

/// Insurance recipient (the covered person)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct InsuranceRecipient {
    pub id: i64,
    pub name: String,
    /// Medical-assistance number
    pub receipient_ma: String,
}

/// Prescribing doctor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct DoctorDetails {
    pub id: i64,
    pub doctor_name: String,
    pub doctor_phone_no: Option<String>,
}

/// Insurance authorization for a recipient over a service-date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct InsuranceDetails {
    pub id: i64,
    pub provider_id: i64,
    pub recipient_id: i64,
    pub doctor_id: i64,
    pub prsrb_prov: Option<String>,
    pub pa: Option<String>,
    #[schema(value_type = String, format = Date, example = "2024-01-01")]
    pub from_service_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-03-31")]
    pub to_service_date: NaiveDate,
    pub recipient_is: Option<String>,
    pub procedure_code: Option<String>,
    pub units: Option<i32>,
    pub plan_of_care: Option<String>,
    pub number_of_days: Option<i32>,
    pub max_per_day: Option<i32>,
    pub max_per_day_unit: Option<String>,
    pub insurance_status: Option<String>,
    pub mmis_entry: Option<String>,
    pub rsn: Option<String>,
    pub comment_pa: Option<String>,
    /// Only active rows represent the effective authorization
    pub is_active: bool,
}

impl InsuranceDetails {
    pub fn service_range(&self) -> ServiceDateRange {
        ServiceDateRange::unchecked(self.from_service_date, self.to_service_date)
    }
}

/// Listing row: details flattened with the joined provider, recipient and doctor
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema, FromRow)]
pub struct InsuranceDetailsListRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub details: InsuranceDetails,
    pub provider_name: String,
    pub recipient_name: String,
    pub recipient_ma: String,
    pub doctor_name: String,
    pub doctor_phone_no: Option<String>,
}

/// Single-record view joined with provider and doctor
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema, FromRow)]
pub struct InsuranceDetailsView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub details: InsuranceDetails,
    pub provider_name: String,
    pub doctor_name: String,
    pub doctor_number: Option<String>,
}

/// Create/update payload for insurance details
///
/// `units` is accepted for compatibility but the stored value comes from
/// `procedure_val`; see [`NewInsuranceDetails`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InsuranceDetailsRequest {
    pub provider_id: i64,
    pub recipient_id: i64,
    pub doctor_id: i64,
    pub prsrb_prov: Option<String>,
    pub pa: Option<String>,
    #[schema(value_type = String, format = Date, example = "2024-01-01")]
    pub from_service_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-03-31")]
    pub to_service_date: NaiveDate,
    pub recipient_is: Option<String>,
    pub procedure_code: Option<String>,
    pub units: Option<i32>,
    pub procedure_val: Option<i32>,
    pub plan_of_care: Option<String>,
    pub number_of_days: Option<i32>,
    pub max_per_day: Option<i32>,
    pub max_per_day_unit: Option<String>,
    pub insurance_status: Option<String>,
    pub mmis_entry: Option<String>,
    pub rsn: Option<String>,
    pub comment_pa: Option<String>,
}

impl InsuranceDetailsRequest {
    /// Check references and the service-date range
    pub fn validate(&self) -> InsuranceResult<ServiceDateRange> {
        for (field, id) in [
            ("provider_id", self.provider_id),
            ("recipient_id", self.recipient_id),
            ("doctor_id", self.doctor_id),
        ] {
            if id <= 0 {
                return Err(InsuranceError::validation(format!(
                    "{field} must be a positive identifier"
                )));
            }
        }
        ServiceDateRange::new(self.from_service_date, self.to_service_date)
    }
}

/// Column values written by create and update
#[derive(Debug, Clone, PartialEq)]
pub struct NewInsuranceDetails {
    pub provider_id: i64,
    pub recipient_id: i64,
    pub doctor_id: i64,
    pub prsrb_prov: Option<String>,
    pub pa: Option<String>,
    pub from_service_date: NaiveDate,
    pub to_service_date: NaiveDate,
    pub recipient_is: Option<String>,
    pub procedure_code: Option<String>,
    pub units: Option<i32>,
    pub plan_of_care: Option<String>,
    pub number_of_days: Option<i32>,
    pub max_per_day: Option<i32>,
    pub max_per_day_unit: Option<String>,
    pub insurance_status: Option<String>,
    pub mmis_entry: Option<String>,
    pub rsn: Option<String>,
    pub comment_pa: Option<String>,
}

impl NewInsuranceDetails {
    pub fn service_range(&self) -> ServiceDateRange {
        ServiceDateRange::unchecked(self.from_service_date, self.to_service_date)
    }
}

impl From<InsuranceDetailsRequest> for NewInsuranceDetails {
    // Stored `units` is taken from `procedure_val`; the request's own `units`
    // is dropped. Kept as the clients currently rely on it.
    fn from(request: InsuranceDetailsRequest) -> Self {
        if request.units.is_some() && request.units != request.procedure_val {
            tracing::debug!(
                units = ?request.units,
                procedure_val = ?request.procedure_val,
                "Ignoring request units in favour of procedure_val"
            );
        }

        Self {
            provider_id: request.provider_id,
            recipient_id: request.recipient_id,
            doctor_id: request.doctor_id,
            prsrb_prov: request.prsrb_prov,
            pa: request.pa,
            from_service_date: request.from_service_date,
            to_service_date: request.to_service_date,
            recipient_is: request.recipient_is,
            procedure_code: request.procedure_code,
            units: request.procedure_val,
            plan_of_care: request.plan_of_care,
            number_of_days: request.number_of_days,
            max_per_day: request.max_per_day,
            max_per_day_unit: request.max_per_day_unit,
            insurance_status: request.insurance_status,
            mmis_entry: request.mmis_entry,
            rsn: request.rsn,
            comment_pa: request.comment_pa,
        }
    }
}

/// New provider row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewInsuranceProvider {
    pub provider_name: String,
    pub phone_no_1: Option<String>,
    pub phone_no_2: Option<String>,
    pub logo_location: Option<String>,
    pub is_default: bool,
    pub provider_code: Option<String>,
}

/// Field-level provider update; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderChanges {
    pub provider_name: Option<String>,
    pub phone_no_1: Option<String>,
    pub phone_no_2: Option<String>,
    pub logo_location: Option<String>,
    pub is_default: Option<bool>,
    pub provider_code: Option<String>,
}

impl ProviderChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
