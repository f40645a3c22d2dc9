//! Active-contract supersession
//!
//! A recipient holds at most one active authorization for any given day. A new
//! or edited authorization whose service-date range intersects an active one
//! retires the older row (`is_active = false`) instead of rewriting it, so the
//! history stays queryable.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{InsuranceError, InsuranceResult};
use crate::models::InsuranceDetails;

/// Inclusive service-date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceDateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ServiceDateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> InsuranceResult<Self> {
        if from > to {
            return Err(InsuranceError::validation(format!(
                "from_service_date {from} is after to_service_date {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Build without ordering check; rows read back from storage are trusted
    pub(crate) fn unchecked(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// `self` is the existing range: overlap iff existing.to >= new.from and
    /// existing.from <= new.to. Shared boundary days overlap.
    pub fn overlaps(&self, other: &ServiceDateRange) -> bool {
        self.to >= other.from && self.from <= other.to
    }
}

/// Which active rows an incoming authorization retires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupersessionRule {
    pub recipient_id: i64,
    pub range: ServiceDateRange,
    /// Row being edited; never retires itself
    pub exclude_id: Option<i64>,
}

impl SupersessionRule {
    pub fn for_create(recipient_id: i64, range: ServiceDateRange) -> Self {
        Self {
            recipient_id,
            range,
            exclude_id: None,
        }
    }

    pub fn for_update(id: i64, recipient_id: i64, range: ServiceDateRange) -> Self {
        Self {
            recipient_id,
            range,
            exclude_id: Some(id),
        }
    }

    /// Whether `existing` must be deactivated before the write takes effect
    pub fn supersedes(&self, existing: &InsuranceDetails) -> bool {
        existing.is_active
            && existing.recipient_id == self.recipient_id
            && self.exclude_id != Some(existing.id)
            && existing.service_range().overlaps(&self.range)
    }
}

/// Outcome of a create or update: the written row and the ids it retired
#[derive(Debug, Clone, PartialEq)]
pub struct SupersededWrite {
    pub record: InsuranceDetails,
    pub superseded: Vec<i64>,
}
