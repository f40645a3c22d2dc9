//! Listing query construction for insurance details
//!
//! Request parameters arrive as loose strings; [`InsuranceDetailsQuery`]
//! normalizes them and [`ListingQuery`] turns the result into parameterized
//! SQL over the details/provider/recipient/doctor join.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::{Postgres, QueryBuilder};
use utoipa::{IntoParams, ToSchema};

use crate::error::{InsuranceError, InsuranceResult};

pub const DEFAULT_RECORDS_PER_PAGE: u32 = 10;

const LISTING_SELECT: &str = "SELECT d.*, p.provider_name, r.name AS recipient_name, \
     r.receipient_ma AS recipient_ma, doc.doctor_name, doc.doctor_phone_no";
const LISTING_COUNT: &str = "SELECT COUNT(*)";
const LISTING_FROM: &str = " FROM insurance_details d \
     INNER JOIN insurance_providers p ON p.id = d.provider_id \
     INNER JOIN insurance_recipients r ON r.id = d.recipient_id \
     INNER JOIN doctor_details doc ON doc.id = d.doctor_id \
     WHERE 1=1";

/// Raw listing parameters as sent by the client
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListInsuranceDetailsParams {
    /// Case-insensitive match on recipient name or MA number
    pub search_term: Option<String>,
    /// `YYYY-MM-DD`, inclusive lower bound on from_service_date
    pub from_date: Option<String>,
    /// `YYYY-MM-DD`, inclusive upper bound on from_service_date
    pub to_date: Option<String>,
    /// `date` (default) or `name`
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`
    pub sort_order: Option<String>,
    /// Page size, default 10
    pub records_per_page: Option<String>,
    /// 1-based page number
    pub page: Option<String>,
    /// Restrict to rows whose provider has this default flag
    #[serde(rename = "is_default")]
    pub is_default: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    ServiceDate,
    RecipientName,
}

impl SortField {
    /// Unknown names yield `None`: the listing is left unordered
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => Some(Self::ServiceDate),
            "name" => Some(Self::RecipientName),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::ServiceDate => "d.from_service_date",
            Self::RecipientName => "r.name",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filter on from_service_date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    Any,
    Between(NaiveDate, NaiveDate),
    OnOrAfter(NaiveDate),
    OnOrBefore(NaiveDate),
}

impl DateFilter {
    pub fn from_bounds(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        match (from, to) {
            (Some(from), Some(to)) => Self::Between(from, to),
            (Some(from), None) => Self::OnOrAfter(from),
            (None, Some(to)) => Self::OnOrBefore(to),
            (None, None) => Self::Any,
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            Self::Any => true,
            Self::Between(from, to) => from <= date && date <= to,
            Self::OnOrAfter(from) => date >= from,
            Self::OnOrBefore(to) => date <= to,
        }
    }
}

/// Normalized listing request
#[derive(Debug, Clone, PartialEq)]
pub struct InsuranceDetailsQuery {
    pub search_term: Option<String>,
    pub date_filter: DateFilter,
    pub sort_field: Option<SortField>,
    pub sort_order: SortOrder,
    pub records_per_page: u32,
    pub page: u32,
    pub provider_is_default: Option<bool>,
}

impl Default for InsuranceDetailsQuery {
    fn default() -> Self {
        Self {
            search_term: None,
            date_filter: DateFilter::Any,
            sort_field: Some(SortField::ServiceDate),
            sort_order: SortOrder::Asc,
            records_per_page: DEFAULT_RECORDS_PER_PAGE,
            page: 1,
            provider_is_default: None,
        }
    }
}

impl TryFrom<ListInsuranceDetailsParams> for InsuranceDetailsQuery {
    type Error = InsuranceError;

    fn try_from(params: ListInsuranceDetailsParams) -> InsuranceResult<Self> {
        let from = parse_date("fromDate", params.from_date.as_deref())?;
        let to = parse_date("toDate", params.to_date.as_deref())?;

        Ok(Self {
            search_term: non_blank(params.search_term.as_deref()).map(str::to_owned),
            date_filter: DateFilter::from_bounds(from, to),
            sort_field: match non_blank(params.sort_by.as_deref()) {
                Some(value) => SortField::parse(value),
                None => Some(SortField::ServiceDate),
            },
            sort_order: params
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
            records_per_page: parse_count("recordsPerPage", params.records_per_page.as_deref())?
                .unwrap_or(DEFAULT_RECORDS_PER_PAGE)
                .max(1),
            page: parse_count("page", params.page.as_deref())?.unwrap_or(1).max(1),
            provider_is_default: parse_flag("is_default", params.is_default.as_deref())?,
        })
    }
}

impl InsuranceDetailsQuery {
    pub fn limit(&self) -> i64 {
        i64::from(self.records_per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * self.limit()
    }

    /// `ceil(total / limit)`; zero records give zero pages
    pub fn total_pages(&self, total_records: i64) -> i64 {
        let limit = self.limit().max(1);
        (total_records + limit - 1) / limit
    }

    pub fn pagination(&self, total_records: i64) -> PaginationInfo {
        PaginationInfo {
            total_records,
            total_pages: self.total_pages(total_records),
            records_per_page: self.records_per_page,
            current_page: self.page,
        }
    }

    /// `LIKE` pattern for the search term with metacharacters escaped
    pub fn search_pattern(&self) -> Option<String> {
        self.search_term.as_deref().map(|term| {
            let escaped = term
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }

    /// In-process equivalent of the search predicate
    pub fn matches_search(&self, recipient_name: &str, recipient_ma: &str) -> bool {
        match self.search_term.as_deref() {
            None => true,
            Some(term) => {
                let needle = term.to_lowercase();
                recipient_name.to_lowercase().contains(&needle)
                    || recipient_ma.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Pagination block of the listing response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub total_records: i64,
    pub total_pages: i64,
    pub records_per_page: u32,
    pub current_page: u32,
}

/// One page of listing results
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage<T> {
    pub rows: Vec<T>,
    pub pagination: PaginationInfo,
}

/// SQL builder for the listing and its count
pub struct ListingQuery<'a> {
    query: QueryBuilder<'a, Postgres>,
}

impl<'a> ListingQuery<'a> {
    /// Filtered, ordered and paginated row query
    pub fn rows(listing: &InsuranceDetailsQuery) -> Self {
        let mut this = Self {
            query: QueryBuilder::new(LISTING_SELECT),
        };
        this.query.push(LISTING_FROM);
        this.push_filters(listing);

        if let Some(field) = listing.sort_field {
            this.query.push(format!(
                " ORDER BY {} {}, d.id ASC",
                field.column(),
                listing.sort_order.keyword()
            ));
        }

        this.query.push(" LIMIT ");
        this.query.push_bind(listing.limit());
        this.query.push(" OFFSET ");
        this.query.push_bind(listing.offset());
        this
    }

    /// Row count under the same filters, without ordering or pagination
    pub fn count(listing: &InsuranceDetailsQuery) -> Self {
        let mut this = Self {
            query: QueryBuilder::new(LISTING_COUNT),
        };
        this.query.push(LISTING_FROM);
        this.push_filters(listing);
        this
    }

    fn push_filters(&mut self, listing: &InsuranceDetailsQuery) {
        if let Some(is_default) = listing.provider_is_default {
            self.query.push(" AND p.is_default = ");
            self.query.push_bind(is_default);
        }

        if let Some(pattern) = listing.search_pattern() {
            self.query.push(" AND (r.name ILIKE ");
            self.query.push_bind(pattern.clone());
            self.query.push(" OR r.receipient_ma ILIKE ");
            self.query.push_bind(pattern);
            self.query.push(")");
        }

        match listing.date_filter {
            DateFilter::Any => {}
            DateFilter::Between(from, to) => {
                self.query.push(" AND d.from_service_date BETWEEN ");
                self.query.push_bind(from);
                self.query.push(" AND ");
                self.query.push_bind(to);
            }
            DateFilter::OnOrAfter(from) => {
                self.query.push(" AND d.from_service_date >= ");
                self.query.push_bind(from);
            }
            DateFilter::OnOrBefore(to) => {
                self.query.push(" AND d.from_service_date <= ");
                self.query.push_bind(to);
            }
        }
    }

    pub fn sql(&self) -> &str {
        self.query.sql()
    }

    pub fn build_query_as<T>(&mut self) -> QueryAs<'_, Postgres, T, PgArguments>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow>,
    {
        self.query.build_query_as()
    }

    pub fn build_query_scalar<T>(&mut self) -> QueryScalar<'_, Postgres, T, PgArguments>
    where
        T: sqlx::Type<Postgres> + for<'r> sqlx::Decode<'r, Postgres>,
        (T,): for<'r> sqlx::FromRow<'r, PgRow>,
    {
        self.query.build_query_scalar()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(name: &str, value: Option<&str>) -> InsuranceResult<Option<NaiveDate>> {
    non_blank(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| {
                InsuranceError::validation(format!("{name} must be a date in YYYY-MM-DD format"))
            })
        })
        .transpose()
}

fn parse_count(name: &str, value: Option<&str>) -> InsuranceResult<Option<u32>> {
    non_blank(value)
        .map(|v| {
            v.parse::<u32>().map_err(|_| {
                InsuranceError::validation(format!("{name} must be a positive integer"))
            })
        })
        .transpose()
}

/// Parse a boolean flag from query strings or form fields
///
/// Accepts `true`/`false`/`1`/`0` (case-insensitive); blank means absent.
pub fn parse_flag(name: &str, value: Option<&str>) -> InsuranceResult<Option<bool>> {
    match non_blank(value).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(None),
        Some("true" | "1") => Ok(Some(true)),
        Some("false" | "0") => Ok(Some(false)),
        Some(_) => Err(InsuranceError::validation(format!(
            "{name} must be true or false"
        ))),
    }
}
