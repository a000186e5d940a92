//! Read-side data ports consumed by the calculator.
//!
//! The reporting crate stays storage-agnostic: infra provides in-memory and
//! Postgres implementations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use storewatch_core::{BusinessHourRule, Observation, StoreId};

/// Data-access fault raised by a source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The backing store could not be reached or the query failed.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded into a domain value.
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Point-in-time status observations, ordered by timestamp.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Largest observed timestamp across every store, `None` when there is no data.
    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, SourceError>;

    /// Distinct store identifiers present in the observation data.
    async fn store_ids(&self) -> Result<Vec<StoreId>, SourceError>;

    /// Observations of `store_id` with `start <= timestamp <= end`, ascending by timestamp.
    async fn observations_between(
        &self,
        store_id: &StoreId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, SourceError>;
}

/// Per-store weekly schedules and timezones.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// IANA timezone identifier of the store, `None` when no record exists.
    async fn timezone(&self, store_id: &StoreId) -> Result<Option<String>, SourceError>;

    /// Every business-hour rule recorded for the store (possibly empty).
    async fn business_hours(&self, store_id: &StoreId) -> Result<Vec<BusinessHourRule>, SourceError>;
}

#[async_trait]
impl<S> ObservationSource for Arc<S>
where
    S: ObservationSource + ?Sized,
{
    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, SourceError> {
        (**self).latest_timestamp().await
    }

    async fn store_ids(&self) -> Result<Vec<StoreId>, SourceError> {
        (**self).store_ids().await
    }

    async fn observations_between(
        &self,
        store_id: &StoreId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, SourceError> {
        (**self).observations_between(store_id, start, end).await
    }
}

#[async_trait]
impl<S> ScheduleSource for Arc<S>
where
    S: ScheduleSource + ?Sized,
{
    async fn timezone(&self, store_id: &StoreId) -> Result<Option<String>, SourceError> {
        (**self).timezone(store_id).await
    }

    async fn business_hours(&self, store_id: &StoreId) -> Result<Vec<BusinessHourRule>, SourceError> {
        (**self).business_hours(store_id).await
    }
}
