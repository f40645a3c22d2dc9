//! Storage access for insurance records
//!
//! [`InsuranceRepository`] is the seam between the service facade and storage.
//! [`PgInsuranceRepository`] runs the check-then-act sequences (supersession,
//! default provider) inside a transaction, with row or table locks taken first.

use async_trait::async_trait;
use database_layer::DatabasePool;
use sqlx::{Postgres, Transaction};
use tracing::{debug, info};

use crate::error::{InsuranceError, InsuranceResult};
use crate::models::{
    InsuranceDetails, InsuranceDetailsListRow, InsuranceDetailsView, InsuranceProvider,
    NewInsuranceDetails, NewInsuranceProvider, ProviderChanges,
};
use crate::query::{InsuranceDetailsQuery, ListingQuery};
use crate::supersession::{SupersededWrite, SupersessionRule};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InsuranceRepository: Send + Sync {
    /// One page of joined rows plus the total matching the filters
    async fn list_details(
        &self,
        query: &InsuranceDetailsQuery,
    ) -> InsuranceResult<(Vec<InsuranceDetailsListRow>, i64)>;

    async fn find_detail(&self, id: i64) -> InsuranceResult<Option<InsuranceDetailsView>>;

    /// Insert an active row, retiring overlapping active rows of the recipient
    async fn create_detail(&self, details: NewInsuranceDetails) -> InsuranceResult<SupersededWrite>;

    /// Overwrite row `id`; `None` when it does not exist
    async fn update_detail(
        &self,
        id: i64,
        details: NewInsuranceDetails,
    ) -> InsuranceResult<Option<SupersededWrite>>;

    async fn delete_detail(&self, id: i64) -> InsuranceResult<Option<InsuranceDetails>>;

    async fn list_providers(&self, is_default: Option<bool>) -> InsuranceResult<Vec<InsuranceProvider>>;

    async fn find_provider(&self, id: i64) -> InsuranceResult<Option<InsuranceProvider>>;

    /// Insert a provider; a default provider takes the flag from all others
    async fn create_provider(&self, provider: NewInsuranceProvider) -> InsuranceResult<InsuranceProvider>;

    async fn update_provider(
        &self,
        id: i64,
        changes: ProviderChanges,
    ) -> InsuranceResult<Option<InsuranceProvider>>;

    async fn delete_provider(&self, id: i64) -> InsuranceResult<Option<InsuranceProvider>>;

    async fn is_healthy(&self) -> bool;
}

/// PostgreSQL-backed repository
#[derive(Debug, Clone)]
pub struct PgInsuranceRepository {
    pool: DatabasePool,
}

impl PgInsuranceRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> InsuranceResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Serializes writers per recipient; also rejects unknown recipients
    async fn lock_recipient(
        tx: &mut Transaction<'static, Postgres>,
        recipient_id: i64,
    ) -> InsuranceResult<()> {
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM insurance_recipients WHERE id = $1 FOR UPDATE")
                .bind(recipient_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(InsuranceError::from_sqlx)?;

        match locked {
            Some(_) => Ok(()),
            None => Err(InsuranceError::validation(format!(
                "recipient_id {recipient_id} does not exist"
            ))),
        }
    }

    /// Deactivate every active row the rule supersedes, returning their ids
    async fn retire_overlapping(
        tx: &mut Transaction<'static, Postgres>,
        rule: &SupersessionRule,
    ) -> InsuranceResult<Vec<i64>> {
        let retired: Vec<i64> = sqlx::query_scalar(
            r#"
            UPDATE insurance_details
            SET is_active = FALSE
            WHERE recipient_id = $1
              AND is_active
              AND to_service_date >= $2
              AND from_service_date <= $3
              AND ($4::BIGINT IS NULL OR id <> $4)
            RETURNING id
            "#,
        )
        .bind(rule.recipient_id)
        .bind(rule.range.from)
        .bind(rule.range.to)
        .bind(rule.exclude_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(InsuranceError::from_sqlx)?;

        if !retired.is_empty() {
            info!(
                recipient_id = rule.recipient_id,
                superseded = ?retired,
                "Deactivated overlapping insurance details"
            );
        }
        Ok(retired)
    }

    /// Clear the default flag everywhere except `keep`
    async fn clear_default(
        tx: &mut Transaction<'static, Postgres>,
        keep: Option<i64>,
    ) -> InsuranceResult<()> {
        sqlx::query("LOCK TABLE insurance_providers IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut **tx)
            .await
            .map_err(InsuranceError::from_sqlx)?;

        let cleared = sqlx::query(
            r#"
            UPDATE insurance_providers
            SET is_default = FALSE
            WHERE is_default
              AND ($1::BIGINT IS NULL OR id <> $1)
            "#,
        )
        .bind(keep)
        .execute(&mut **tx)
        .await
        .map_err(InsuranceError::from_sqlx)?;

        debug!(cleared = cleared.rows_affected(), "Cleared default provider flag");
        Ok(())
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> InsuranceResult<()> {
        tx.commit().await.map_err(InsuranceError::from_sqlx)
    }
}

#[async_trait]
impl InsuranceRepository for PgInsuranceRepository {
    async fn list_details(
        &self,
        query: &InsuranceDetailsQuery,
    ) -> InsuranceResult<(Vec<InsuranceDetailsListRow>, i64)> {
        let mut rows_query = ListingQuery::rows(query);
        let rows = rows_query
            .build_query_as::<InsuranceDetailsListRow>()
            .fetch_all(self.pool.pool())
            .await
            .map_err(InsuranceError::from_sqlx)?;

        let mut count_query = ListingQuery::count(query);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.pool())
            .await
            .map_err(InsuranceError::from_sqlx)?;

        Ok((rows, total))
    }

    async fn find_detail(&self, id: i64) -> InsuranceResult<Option<InsuranceDetailsView>> {
        sqlx::query_as::<_, InsuranceDetailsView>(
            r#"
            SELECT d.*, p.provider_name, doc.doctor_name, doc.doctor_phone_no AS doctor_number
            FROM insurance_details d
            INNER JOIN insurance_providers p ON p.id = d.provider_id
            INNER JOIN doctor_details doc ON doc.id = d.doctor_id
            WHERE d.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(InsuranceError::from_sqlx)
    }

    async fn create_detail(&self, details: NewInsuranceDetails) -> InsuranceResult<SupersededWrite> {
        let rule = SupersessionRule::for_create(details.recipient_id, details.service_range());
        let mut tx = self.begin().await?;

        Self::lock_recipient(&mut tx, details.recipient_id).await?;
        let superseded = Self::retire_overlapping(&mut tx, &rule).await?;

        let record = sqlx::query_as::<_, InsuranceDetails>(
            r#"
            INSERT INTO insurance_details (
                provider_id, recipient_id, doctor_id, prsrb_prov, pa,
                from_service_date, to_service_date, recipient_is, procedure_code, units,
                plan_of_care, number_of_days, max_per_day, max_per_day_unit,
                insurance_status, mmis_entry, rsn, comment_pa, is_active
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, TRUE
            )
            RETURNING *
            "#,
        )
        .bind(details.provider_id)
        .bind(details.recipient_id)
        .bind(details.doctor_id)
        .bind(&details.prsrb_prov)
        .bind(&details.pa)
        .bind(details.from_service_date)
        .bind(details.to_service_date)
        .bind(&details.recipient_is)
        .bind(&details.procedure_code)
        .bind(details.units)
        .bind(&details.plan_of_care)
        .bind(details.number_of_days)
        .bind(details.max_per_day)
        .bind(&details.max_per_day_unit)
        .bind(&details.insurance_status)
        .bind(&details.mmis_entry)
        .bind(&details.rsn)
        .bind(&details.comment_pa)
        .fetch_one(&mut *tx)
        .await
        .map_err(InsuranceError::from_sqlx)?;

        Self::commit(tx).await?;
        Ok(SupersededWrite { record, superseded })
    }

    async fn update_detail(
        &self,
        id: i64,
        details: NewInsuranceDetails,
    ) -> InsuranceResult<Option<SupersededWrite>> {
        let mut tx = self.begin().await?;

        Self::lock_recipient(&mut tx, details.recipient_id).await?;

        let target_active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM insurance_details WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(InsuranceError::from_sqlx)?;

        let Some(target_active) = target_active else {
            return Ok(None);
        };

        let superseded = if target_active {
            let rule = SupersessionRule::for_update(id, details.recipient_id, details.service_range());
            Self::retire_overlapping(&mut tx, &rule).await?
        } else {
            Vec::new()
        };

        let record = sqlx::query_as::<_, InsuranceDetails>(
            r#"
            UPDATE insurance_details
            SET provider_id = $2,
                recipient_id = $3,
                doctor_id = $4,
                prsrb_prov = $5,
                pa = $6,
                from_service_date = $7,
                to_service_date = $8,
                recipient_is = $9,
                procedure_code = $10,
                units = $11,
                plan_of_care = $12,
                number_of_days = $13,
                max_per_day = $14,
                max_per_day_unit = $15,
                insurance_status = $16,
                mmis_entry = $17,
                rsn = $18,
                comment_pa = $19
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(details.provider_id)
        .bind(details.recipient_id)
        .bind(details.doctor_id)
        .bind(&details.prsrb_prov)
        .bind(&details.pa)
        .bind(details.from_service_date)
        .bind(details.to_service_date)
        .bind(&details.recipient_is)
        .bind(&details.procedure_code)
        .bind(details.units)
        .bind(&details.plan_of_care)
        .bind(details.number_of_days)
        .bind(details.max_per_day)
        .bind(&details.max_per_day_unit)
        .bind(&details.insurance_status)
        .bind(&details.mmis_entry)
        .bind(&details.rsn)
        .bind(&details.comment_pa)
        .fetch_one(&mut *tx)
        .await
        .map_err(InsuranceError::from_sqlx)?;

        Self::commit(tx).await?;
        Ok(Some(SupersededWrite { record, superseded }))
    }

    async fn delete_detail(&self, id: i64) -> InsuranceResult<Option<InsuranceDetails>> {
        sqlx::query_as::<_, InsuranceDetails>("DELETE FROM insurance_details WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(InsuranceError::from_sqlx)
    }

    async fn list_providers(&self, is_default: Option<bool>) -> InsuranceResult<Vec<InsuranceProvider>> {
        sqlx::query_as::<_, InsuranceProvider>(
            r#"
            SELECT * FROM insurance_providers
            WHERE ($1::BOOLEAN IS NULL OR is_default = $1)
            ORDER BY id
            "#,
        )
        .bind(is_default)
        .fetch_all(self.pool.pool())
        .await
        .map_err(InsuranceError::from_sqlx)
    }

    async fn find_provider(&self, id: i64) -> InsuranceResult<Option<InsuranceProvider>> {
        sqlx::query_as::<_, InsuranceProvider>("SELECT * FROM insurance_providers WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(InsuranceError::from_sqlx)
    }

    async fn create_provider(&self, provider: NewInsuranceProvider) -> InsuranceResult<InsuranceProvider> {
        let mut tx = self.begin().await?;

        if provider.is_default {
            Self::clear_default(&mut tx, None).await?;
        }

        let created = sqlx::query_as::<_, InsuranceProvider>(
            r#"
            INSERT INTO insurance_providers (
                provider_name, phone_no_1, phone_no_2, logo_location, is_default, provider_code
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&provider.provider_name)
        .bind(&provider.phone_no_1)
        .bind(&provider.phone_no_2)
        .bind(&provider.logo_location)
        .bind(provider.is_default)
        .bind(&provider.provider_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(InsuranceError::from_sqlx)?;

        Self::commit(tx).await?;
        Ok(created)
    }

    async fn update_provider(
        &self,
        id: i64,
        changes: ProviderChanges,
    ) -> InsuranceResult<Option<InsuranceProvider>> {
        let mut tx = self.begin().await?;

        if changes.is_default == Some(true) {
            Self::clear_default(&mut tx, Some(id)).await?;
        }

        let updated = sqlx::query_as::<_, InsuranceProvider>(
            r#"
            UPDATE insurance_providers
            SET provider_name = COALESCE($2, provider_name),
                phone_no_1 = COALESCE($3, phone_no_1),
                phone_no_2 = COALESCE($4, phone_no_2),
                logo_location = COALESCE($5, logo_location),
                is_default = COALESCE($6, is_default),
                provider_code = COALESCE($7, provider_code)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.provider_name)
        .bind(&changes.phone_no_1)
        .bind(&changes.phone_no_2)
        .bind(&changes.logo_location)
        .bind(changes.is_default)
        .bind(&changes.provider_code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(InsuranceError::from_sqlx)?;

        // Dropping the transaction rolls back the flag clearing
        if updated.is_none() {
            return Ok(None);
        }

        Self::commit(tx).await?;
        Ok(updated)
    }

    async fn delete_provider(&self, id: i64) -> InsuranceResult<Option<InsuranceProvider>> {
        sqlx::query_as::<_, InsuranceProvider>("DELETE FROM insurance_providers WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(InsuranceError::from_sqlx)
    }

    async fn is_healthy(&self) -> bool {
        self.pool.is_healthy().await
    }
}
