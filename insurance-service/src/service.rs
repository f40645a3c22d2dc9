use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{InsuranceError, InsuranceResult};
use crate::models::*;
use crate::query::{InsuranceDetailsQuery, ListingPage};
use crate::repository::InsuranceRepository;
use crate::supersession::SupersededWrite;

/// Insurance records service
///
/// Validates input, applies the request-to-row mapping and delegates storage
/// to an [`InsuranceRepository`].
#[derive(Clone)]
pub struct InsuranceService {
    repository: Arc<dyn InsuranceRepository>,
}

impl InsuranceService {
    pub fn new(repository: Arc<dyn InsuranceRepository>) -> Self {
        Self { repository }
    }

    /// Filtered, sorted and paginated insurance details
    pub async fn list_details(
        &self,
        query: InsuranceDetailsQuery,
    ) -> InsuranceResult<ListingPage<InsuranceDetailsListRow>> {
        if let Some(term) = query.search_term.as_deref() {
            debug!(search_term = %logger_redacted::redact(term), "Searching insurance details");
        }

        let (rows, total) = self.repository.list_details(&query).await?;
        Ok(ListingPage {
            rows,
            pagination: query.pagination(total),
        })
    }

    pub async fn get_detail(&self, id: i64) -> InsuranceResult<Option<InsuranceDetailsView>> {
        self.repository.find_detail(id).await
    }

    /// Create an active record, retiring overlapping active records
    pub async fn create_detail(&self, request: InsuranceDetailsRequest) -> InsuranceResult<SupersededWrite> {
        request.validate()?;
        let write = self.repository.create_detail(request.into()).await?;

        info!(
            id = write.record.id,
            recipient_id = write.record.recipient_id,
            superseded = write.superseded.len(),
            "Insurance details created"
        );
        Ok(write)
    }

    pub async fn update_detail(
        &self,
        id: i64,
        request: InsuranceDetailsRequest,
    ) -> InsuranceResult<SupersededWrite> {
        request.validate()?;
        let write = self
            .repository
            .update_detail(id, request.into())
            .await?
            .ok_or(InsuranceError::NotFound {
                resource: "Insurance details",
                id,
            })?;

        info!(id, superseded = write.superseded.len(), "Insurance details updated");
        Ok(write)
    }

    pub async fn delete_detail(&self, id: i64) -> InsuranceResult<InsuranceDetails> {
        let deleted = self
            .repository
            .delete_detail(id)
            .await?
            .ok_or(InsuranceError::NotFound {
                resource: "Insurance details",
                id,
            })?;

        info!(id, "Insurance details deleted");
        Ok(deleted)
    }

    pub async fn add_provider(&self, provider: NewInsuranceProvider) -> InsuranceResult<InsuranceProvider> {
        let provider = NewInsuranceProvider {
            provider_name: require_name(&provider.provider_name)?,
            ..provider
        };

        let created = self.repository.create_provider(provider).await?;
        info!(id = created.id, is_default = created.is_default, "Insurance provider created");
        Ok(created)
    }

    pub async fn list_providers(&self, is_default: Option<bool>) -> InsuranceResult<Vec<InsuranceProvider>> {
        self.repository.list_providers(is_default).await
    }

    pub async fn get_provider(&self, id: i64) -> InsuranceResult<Option<InsuranceProvider>> {
        self.repository.find_provider(id).await
    }

    pub async fn update_provider(
        &self,
        id: i64,
        mut changes: ProviderChanges,
    ) -> InsuranceResult<InsuranceProvider> {
        if changes.is_empty() {
            return Err(InsuranceError::validation("No changes found in data"));
        }
        if let Some(name) = changes.provider_name.take() {
            changes.provider_name = Some(require_name(&name)?);
        }

        let updated = self
            .repository
            .update_provider(id, changes)
            .await?
            .ok_or(InsuranceError::NotFound {
                resource: "Insurance provider",
                id,
            })?;

        info!(id, is_default = updated.is_default, "Insurance provider updated");
        Ok(updated)
    }

    pub async fn delete_provider(&self, id: i64) -> InsuranceResult<InsuranceProvider> {
        let deleted = self
            .repository
            .delete_provider(id)
            .await?
            .ok_or(InsuranceError::NotFound {
                resource: "Insurance provider",
                id,
            })?;

        info!(id, "Insurance provider deleted");
        Ok(deleted)
    }

    pub async fn is_healthy(&self) -> bool {
        self.repository.is_healthy().await
    }
}

fn require_name(name: &str) -> InsuranceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InsuranceError::validation("provider_name is required"));
    }
    Ok(trimmed.to_string())
}
