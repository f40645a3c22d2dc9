//! Shared fixtures: an in-memory repository and request helpers

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use insurance_service::{
    DoctorDetails, InsuranceDetails, InsuranceDetailsListRow, InsuranceDetailsQuery,
    InsuranceDetailsView, InsuranceError, InsuranceProvider, InsuranceRecipient,
    InsuranceRepository, InsuranceResult, NewInsuranceDetails, NewInsuranceProvider,
    ProviderChanges, SortField, SortOrder, SupersededWrite, SupersessionRule,
};
use insurance_server::{create_app, InsuranceServer, ServerConfig};
use serde_json::Value;
use tower::ServiceExt;

pub const PROVIDER_FKEY: &str = "insurance_details_provider_id_fkey";
pub const MULTIPART_BOUNDARY: &str = "insurance-test-boundary";

#[derive(Default)]
struct Tables {
    providers: BTreeMap<i64, InsuranceProvider>,
    recipients: BTreeMap<i64, InsuranceRecipient>,
    doctors: BTreeMap<i64, DoctorDetails>,
    details: BTreeMap<i64, InsuranceDetails>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn list_row(&self, details: &InsuranceDetails) -> Option<InsuranceDetailsListRow> {
        let provider = self.providers.get(&details.provider_id)?;
        let recipient = self.recipients.get(&details.recipient_id)?;
        let doctor = self.doctors.get(&details.doctor_id)?;
        Some(InsuranceDetailsListRow {
            details: details.clone(),
            provider_name: provider.provider_name.clone(),
            recipient_name: recipient.name.clone(),
            recipient_ma: recipient.receipient_ma.clone(),
            doctor_name: doctor.doctor_name.clone(),
            doctor_phone_no: doctor.doctor_phone_no.clone(),
        })
    }

    fn check_references(&self, details: &NewInsuranceDetails) -> InsuranceResult<()> {
        if !self.recipients.contains_key(&details.recipient_id) {
            return Err(InsuranceError::validation(format!(
                "recipient_id {} does not exist",
                details.recipient_id
            )));
        }
        if !self.providers.contains_key(&details.provider_id) {
            return Err(InsuranceError::Conflict(PROVIDER_FKEY.to_string()));
        }
        if !self.doctors.contains_key(&details.doctor_id) {
            return Err(InsuranceError::Conflict("insurance_details_doctor_id_fkey".to_string()));
        }
        Ok(())
    }

    fn retire(&mut self, rule: &SupersessionRule) -> Vec<i64> {
        let mut retired = Vec::new();
        for row in self.details.values_mut() {
            if rule.supersedes(row) {
                row.is_active = false;
                retired.push(row.id);
            }
        }
        retired
    }

    fn clear_default(&mut self, keep: Option<i64>) {
        for provider in self.providers.values_mut() {
            if Some(provider.id) != keep {
                provider.is_default = false;
            }
        }
    }
}

fn materialize(id: i64, details: NewInsuranceDetails, is_active: bool) -> InsuranceDetails {
    InsuranceDetails {
        id,
        provider_id: details.provider_id,
        recipient_id: details.recipient_id,
        doctor_id: details.doctor_id,
        prsrb_prov: details.prsrb_prov,
        pa: details.pa,
        from_service_date: details.from_service_date,
        to_service_date: details.to_service_date,
        recipient_is: details.recipient_is,
        procedure_code: details.procedure_code,
        units: details.units,
        plan_of_care: details.plan_of_care,
        number_of_days: details.number_of_days,
        max_per_day: details.max_per_day,
        max_per_day_unit: details.max_per_day_unit,
        insurance_status: details.insurance_status,
        mmis_entry: details.mmis_entry,
        rsn: details.rsn,
        comment_pa: details.comment_pa,
        is_active,
    }
}

/// Repository over in-process maps with the same rules as the Postgres one
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("repository lock poisoned")
    }

    pub fn seed_recipient(&self, name: &str, ma: &str) -> i64 {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.recipients.insert(
            id,
            InsuranceRecipient {
                id,
                name: name.to_string(),
                receipient_ma: ma.to_string(),
            },
        );
        id
    }

    pub fn seed_doctor(&self, name: &str) -> i64 {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.doctors.insert(
            id,
            DoctorDetails {
                id,
                doctor_name: name.to_string(),
                doctor_phone_no: Some("555-0100".to_string()),
            },
        );
        id
    }

    pub fn seed_provider(&self, name: &str, is_default: bool) -> i64 {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.providers.insert(
            id,
            InsuranceProvider {
                id,
                provider_name: name.to_string(),
                phone_no_1: None,
                phone_no_2: None,
                logo_location: None,
                is_default,
                provider_code: None,
            },
        );
        id
    }

    pub fn details(&self) -> Vec<InsuranceDetails> {
        self.tables().details.values().cloned().collect()
    }

    pub fn detail(&self, id: i64) -> Option<InsuranceDetails> {
        self.tables().details.get(&id).cloned()
    }

    pub fn providers(&self) -> Vec<InsuranceProvider> {
        self.tables().providers.values().cloned().collect()
    }
}

#[async_trait]
impl InsuranceRepository for InMemoryRepository {
    async fn list_details(
        &self,
        query: &InsuranceDetailsQuery,
    ) -> InsuranceResult<(Vec<InsuranceDetailsListRow>, i64)> {
        let tables = self.tables();
        let mut rows: Vec<InsuranceDetailsListRow> = tables
            .details
            .values()
            .filter_map(|details| tables.list_row(details))
            .filter(|row| {
                query.provider_is_default.map_or(true, |flag| {
                    tables
                        .providers
                        .get(&row.details.provider_id)
                        .is_some_and(|p| p.is_default == flag)
                })
            })
            .filter(|row| query.matches_search(&row.recipient_name, &row.recipient_ma))
            .filter(|row| query.date_filter.matches(row.details.from_service_date))
            .collect();

        if let Some(field) = query.sort_field {
            rows.sort_by(|a, b| {
                let primary = match field {
                    SortField::ServiceDate => a.details.from_service_date.cmp(&b.details.from_service_date),
                    SortField::RecipientName => a.recipient_name.cmp(&b.recipient_name),
                };
                let primary = match query.sort_order {
                    SortOrder::Asc => primary,
                    SortOrder::Desc => primary.reverse(),
                };
                primary.then(a.details.id.cmp(&b.details.id))
            });
        }

        let total = i64::try_from(rows.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);
        let page = rows.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn find_detail(&self, id: i64) -> InsuranceResult<Option<InsuranceDetailsView>> {
        let tables = self.tables();
        Ok(tables.details.get(&id).and_then(|details| {
            let provider = tables.providers.get(&details.provider_id)?;
            let doctor = tables.doctors.get(&details.doctor_id)?;
            Some(InsuranceDetailsView {
                details: details.clone(),
                provider_name: provider.provider_name.clone(),
                doctor_name: doctor.doctor_name.clone(),
                doctor_number: doctor.doctor_phone_no.clone(),
            })
        }))
    }

    async fn create_detail(&self, details: NewInsuranceDetails) -> InsuranceResult<SupersededWrite> {
        let mut tables = self.tables();
        tables.check_references(&details)?;

        let rule = SupersessionRule::for_create(details.recipient_id, details.service_range());
        let superseded = tables.retire(&rule);

        let id = tables.next_id();
        let record = materialize(id, details, true);
        tables.details.insert(id, record.clone());
        Ok(SupersededWrite { record, superseded })
    }

    async fn update_detail(
        &self,
        id: i64,
        details: NewInsuranceDetails,
    ) -> InsuranceResult<Option<SupersededWrite>> {
        let mut tables = self.tables();
        tables.check_references(&details)?;

        let Some(is_active) = tables.details.get(&id).map(|row| row.is_active) else {
            return Ok(None);
        };

        let superseded = if is_active {
            let rule = SupersessionRule::for_update(id, details.recipient_id, details.service_range());
            tables.retire(&rule)
        } else {
            Vec::new()
        };

        let record = materialize(id, details, is_active);
        tables.details.insert(id, record.clone());
        Ok(Some(SupersededWrite { record, superseded }))
    }

    async fn delete_detail(&self, id: i64) -> InsuranceResult<Option<InsuranceDetails>> {
        Ok(self.tables().details.remove(&id))
    }

    async fn list_providers(&self, is_default: Option<bool>) -> InsuranceResult<Vec<InsuranceProvider>> {
        Ok(self
            .tables()
            .providers
            .values()
            .filter(|p| is_default.map_or(true, |flag| p.is_default == flag))
            .cloned()
            .collect())
    }

    async fn find_provider(&self, id: i64) -> InsuranceResult<Option<InsuranceProvider>> {
        Ok(self.tables().providers.get(&id).cloned())
    }

    async fn create_provider(&self, provider: NewInsuranceProvider) -> InsuranceResult<InsuranceProvider> {
        let mut tables = self.tables();
        if provider.is_default {
            tables.clear_default(None);
        }

        let id = tables.next_id();
        let created = InsuranceProvider {
            id,
            provider_name: provider.provider_name,
            phone_no_1: provider.phone_no_1,
            phone_no_2: provider.phone_no_2,
            logo_location: provider.logo_location,
            is_default: provider.is_default,
            provider_code: provider.provider_code,
        };
        tables.providers.insert(id, created.clone());
        Ok(created)
    }

    async fn update_provider(
        &self,
        id: i64,
        changes: ProviderChanges,
    ) -> InsuranceResult<Option<InsuranceProvider>> {
        let mut tables = self.tables();
        if !tables.providers.contains_key(&id) {
            return Ok(None);
        }
        if changes.is_default == Some(true) {
            tables.clear_default(Some(id));
        }

        let Some(provider) = tables.providers.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.provider_name {
            provider.provider_name = name;
        }
        if let Some(phone) = changes.phone_no_1 {
            provider.phone_no_1 = Some(phone);
        }
        if let Some(phone) = changes.phone_no_2 {
            provider.phone_no_2 = Some(phone);
        }
        if let Some(logo) = changes.logo_location {
            provider.logo_location = Some(logo);
        }
        if let Some(flag) = changes.is_default {
            provider.is_default = flag;
        }
        if let Some(code) = changes.provider_code {
            provider.provider_code = Some(code);
        }
        Ok(Some(provider.clone()))
    }

    async fn delete_provider(&self, id: i64) -> InsuranceResult<Option<InsuranceProvider>> {
        let mut tables = self.tables();
        if tables.details.values().any(|d| d.provider_id == id) {
            return Err(InsuranceError::Conflict(PROVIDER_FKEY.to_string()));
        }
        Ok(tables.providers.remove(&id))
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

/// App over `repository` with uploads in a fresh temp directory
pub fn test_app(repository: Arc<InMemoryRepository>) -> (Router, PathBuf) {
    let upload_dir = std::env::temp_dir().join(format!("insurance-uploads-{}", uuid::Uuid::new_v4()));
    let mut config = ServerConfig::default();
    config.uploads.directory = upload_dir.clone();
    config.uploads.max_bytes = 1024;

    let server = InsuranceServer::with_repository(config, repository).expect("valid test config");
    (create_app(server), upload_dir)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("valid request")
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

pub fn json(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// A multipart part: `(name, file_name, content)`
pub type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

pub fn multipart(method: &str, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("valid request")
}

/// JSON payload for insurance details create/update
pub fn details_payload(
    provider_id: i64,
    recipient_id: i64,
    doctor_id: i64,
    from: &str,
    to: &str,
) -> Value {
    serde_json::json!({
        "provider_id": provider_id,
        "recipient_id": recipient_id,
        "doctor_id": doctor_id,
        "from_service_date": from,
        "to_service_date": to,
        "procedure_code": "T1019",
        "procedure_val": 16,
        "units": 99,
        "insurance_status": "approved"
    })
}

/// Recipient, doctor and a non-default provider ready for details
pub struct Fixture {
    pub repository: Arc<InMemoryRepository>,
    pub app: Router,
    pub upload_dir: PathBuf,
    pub provider_id: i64,
    pub recipient_id: i64,
    pub doctor_id: i64,
}

impl Fixture {
    pub fn new() -> Self {
        let repository = InMemoryRepository::new();
        let provider_id = repository.seed_provider("Medical Assistance", false);
        let recipient_id = repository.seed_recipient("Jane Roe", "100200300");
        let doctor_id = repository.seed_doctor("Dr. Adams");
        let (app, upload_dir) = test_app(Arc::clone(&repository));
        Self {
            repository,
            app,
            upload_dir,
            provider_id,
            recipient_id,
            doctor_id,
        }
    }

    pub async fn create_details(&self, recipient_id: i64, from: &str, to: &str) -> (StatusCode, Value) {
        let payload = details_payload(self.provider_id, recipient_id, self.doctor_id, from, to);
        send(&self.app, json("POST", "/api/v1/insurance-details", &payload)).await
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}
