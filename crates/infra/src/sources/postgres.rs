//! Postgres-backed observation and schedule sources.
//!
//! Read-only over three tables:
//!
//! | Table | Columns |
//! |-------|---------|
//! | `store_status` | `store_id TEXT, status TEXT, timestamp_utc TIMESTAMPTZ` |
//! | `business_hours` | `store_id TEXT, day_of_week INT, start_time_local TIME, end_time_local TIME` |
//! | `store_timezone` | `store_id TEXT, timezone_str TEXT` |
//!
//! Connection and query failures map to `SourceError::Unavailable`; rows that cannot
//! be decoded into domain values map to `SourceError::Malformed`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use storewatch_core::{BusinessHourRule, Observation, StoreId, StoreStatus};
use storewatch_reporting::{ObservationSource, ScheduleSource, SourceError};

#[derive(Debug, Clone)]
pub struct PostgresObservationSource {
    pool: Arc<PgPool>,
}

impl PostgresObservationSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl ObservationSource for PostgresObservationSource {
    #[instrument(skip(self), err)]
    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, SourceError> {
        let row = sqlx::query("SELECT MAX(timestamp_utc) AS latest FROM store_status")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("latest_timestamp", e))?;

        row.try_get::<Option<DateTime<Utc>>, _>("latest")
            .map_err(|e| SourceError::Malformed(format!("latest timestamp: {e}")))
    }

    #[instrument(skip(self), err)]
    async fn store_ids(&self) -> Result<Vec<StoreId>, SourceError> {
        let rows = sqlx::query("SELECT DISTINCT store_id FROM store_status ORDER BY store_id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("store_ids", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("store_id")
                    .map(StoreId::from)
                    .map_err(|e| SourceError::Malformed(format!("store_id: {e}")))
            })
            .collect()
    }

    #[instrument(skip(self), fields(store_id = %store_id), err)]
    async fn observations_between(
        &self,
        store_id: &StoreId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT status, timestamp_utc
            FROM store_status
            WHERE store_id = $1 AND timestamp_utc >= $2 AND timestamp_utc <= $3
            ORDER BY timestamp_utc ASC
            "#,
        )
        .bind(store_id.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("observations_between", e))?;

        let mut observations = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row
                .try_get("status")
                .map_err(|e| SourceError::Malformed(format!("status: {e}")))?;
            let status: StoreStatus = status
                .parse()
                .map_err(|e| SourceError::Malformed(format!("store {store_id}: {e}")))?;
            let timestamp_utc: DateTime<Utc> = row
                .try_get("timestamp_utc")
                .map_err(|e| SourceError::Malformed(format!("timestamp_utc: {e}")))?;

            observations.push(Observation {
                store_id: store_id.clone(),
                timestamp_utc,
                status,
            });
        }

        Ok(observations)
    }
}

#[derive(Debug, Clone)]
pub struct PostgresScheduleSource {
    pool: Arc<PgPool>,
}

impl PostgresScheduleSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl ScheduleSource for PostgresScheduleSource {
    #[instrument(skip(self), fields(store_id = %store_id), err)]
    async fn timezone(&self, store_id: &StoreId) -> Result<Option<String>, SourceError> {
        let row = sqlx::query("SELECT timezone_str FROM store_timezone WHERE store_id = $1 LIMIT 1")
            .bind(store_id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("timezone", e))?;

        row.map(|row| row.try_get::<String, _>("timezone_str"))
            .transpose()
            .map_err(|e| SourceError::Malformed(format!("timezone_str: {e}")))
    }

    #[instrument(skip(self), fields(store_id = %store_id), err)]
    async fn business_hours(&self, store_id: &StoreId) -> Result<Vec<BusinessHourRule>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT day_of_week, start_time_local, end_time_local
            FROM business_hours
            WHERE store_id = $1
            ORDER BY day_of_week
            "#,
        )
        .bind(store_id.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("business_hours", e))?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let day: i32 = row
                .try_get("day_of_week")
                .map_err(|e| SourceError::Malformed(format!("day_of_week: {e}")))?;
            let day_of_week = u8::try_from(day)
                .map_err(|_| SourceError::Malformed(format!("store {store_id}: day_of_week {day} out of range")))?;
            let start: NaiveTime = row
                .try_get("start_time_local")
                .map_err(|e| SourceError::Malformed(format!("start_time_local: {e}")))?;
            let end: NaiveTime = row
                .try_get("end_time_local")
                .map_err(|e| SourceError::Malformed(format!("end_time_local: {e}")))?;

            rules.push(BusinessHourRule::new(store_id.clone(), day_of_week, start, end));
        }

        Ok(rules)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> SourceError {
    match err {
        sqlx::Error::Database(db_err) => {
            SourceError::Unavailable(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => SourceError::Unavailable(format!("connection pool closed in {}", operation)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            SourceError::Malformed(format!("decode error in {}: {}", operation, err))
        }
        _ => SourceError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}
