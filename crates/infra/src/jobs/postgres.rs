//! Postgres-backed report store.
//!
//! Tables:
//!
//! | Table | Columns |
//! |-------|---------|
//! | `reports` | `report_id UUID PRIMARY KEY, status TEXT, created_at TIMESTAMPTZ, completed_at TIMESTAMPTZ NULL, error TEXT NULL` |
//! | `report_data` | `report_id UUID, store_id TEXT, uptime_last_hour .. downtime_last_week DOUBLE PRECISION` |
//!
//! ## Atomic completion
//!
//! `complete()` locks the job row (`SELECT .. FOR UPDATE`), inserts every report row
//! and flips the status inside one transaction. A concurrent reader sees either the
//! completed job with all its rows or a running job with none.
//!
//! ## Error Mapping
//!
//! | SQLx Error | ReportStoreError |
//! |------------|------------------|
//! | Database, code `23505` (unique violation) on insert | `AlreadyExists` |
//! | Any other | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use storewatch_core::{ReportId, ReportRow, StoreId};

use super::store::{ReportStore, ReportStoreError};
use super::types::{JobEvent, ReportJob, ReportStatus};

#[derive(Debug, Clone)]
pub struct PostgresReportStore {
    pool: Arc<PgPool>,
}

impl PostgresReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, ReportStoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait]
impl ReportStore for PostgresReportStore {
    #[instrument(skip(self, job), fields(report_id = %job.id), err)]
    async fn insert(&self, job: ReportJob) -> Result<ReportId, ReportStoreError> {
        sqlx::query(
            r#"
            INSERT INTO reports (report_id, status, created_at, completed_at, error)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*job.id.as_uuid())
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.completed_at)
        .bind(job.status.error())
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ReportStoreError::AlreadyExists(job.id)
            } else {
                map_sqlx_error("insert", e)
            }
        })?;

        Ok(job.id)
    }

    #[instrument(skip(self), fields(report_id = %id), err)]
    async fn get(&self, id: ReportId) -> Result<Option<ReportJob>, ReportStoreError> {
        let row = sqlx::query(
            r#"
            SELECT report_id, status, created_at, completed_at, error
            FROM reports
            WHERE report_id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(decode_job).transpose()
    }

    #[instrument(skip(self), fields(report_id = %id), err)]
    async fn transition(
        &self,
        id: ReportId,
        event: JobEvent,
        at: DateTime<Utc>,
    ) -> Result<ReportJob, ReportStoreError> {
        let mut tx = self.begin().await?;

        let mut job = lock_job(&mut tx, id).await?;
        job.transition(event, at)?;
        update_status(&mut tx, &job).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(job)
    }

    #[instrument(skip(self, rows), fields(report_id = %id, row_count = rows.len()), err)]
    async fn complete(
        &self,
        id: ReportId,
        rows: Vec<ReportRow>,
        at: DateTime<Utc>,
    ) -> Result<ReportJob, ReportStoreError> {
        let mut tx = self.begin().await?;

        let mut job = lock_job(&mut tx, id).await?;
        job.transition(JobEvent::Complete, at)?;

        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO report_data (
                    report_id,
                    store_id,
                    uptime_last_hour,
                    uptime_last_day,
                    uptime_last_week,
                    downtime_last_hour,
                    downtime_last_day,
                    downtime_last_week
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(*id.as_uuid())
            .bind(row.store_id.as_str())
            .bind(row.uptime_last_hour)
            .bind(row.uptime_last_day)
            .bind(row.uptime_last_week)
            .bind(row.downtime_last_hour)
            .bind(row.downtime_last_day)
            .bind(row.downtime_last_week)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_report_row", e))?;
        }

        update_status(&mut tx, &job).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(job)
    }

    #[instrument(skip(self), fields(report_id = %id), err)]
    async fn rows(&self, id: ReportId) -> Result<Vec<ReportRow>, ReportStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                store_id,
                uptime_last_hour,
                uptime_last_day,
                uptime_last_week,
                downtime_last_hour,
                downtime_last_day,
                downtime_last_week
            FROM report_data
            WHERE report_id = $1
            ORDER BY store_id ASC
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("rows", e))?;

        if rows.is_empty() && self.get(id).await?.is_none() {
            return Err(ReportStoreError::NotFound(id));
        }

        rows.iter().map(decode_row).collect()
    }
}

async fn lock_job(tx: &mut Transaction<'static, Postgres>, id: ReportId) -> Result<ReportJob, ReportStoreError> {
    let row = sqlx::query(
        r#"
        SELECT report_id, status, created_at, completed_at, error
        FROM reports
        WHERE report_id = $1
        FOR UPDATE
        "#,
    )
    .bind(*id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_job", e))?
    .ok_or(ReportStoreError::NotFound(id))?;

    decode_job(&row)
}

async fn update_status(tx: &mut Transaction<'static, Postgres>, job: &ReportJob) -> Result<(), ReportStoreError> {
    sqlx::query(
        r#"
        UPDATE reports
        SET status = $2, completed_at = $3, error = $4
        WHERE report_id = $1
        "#,
    )
    .bind(*job.id.as_uuid())
    .bind(job.status.as_str())
    .bind(job.completed_at)
    .bind(job.status.error())
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("update_status", e))?;

    Ok(())
}

fn decode_job(row: &PgRow) -> Result<ReportJob, ReportStoreError> {
    let decode = |e: sqlx::Error| ReportStoreError::Storage(format!("failed to decode report row: {e}"));

    let id: uuid::Uuid = row.try_get("report_id").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let error: Option<String> = row.try_get("error").map_err(decode)?;

    Ok(ReportJob {
        id: ReportId::from_uuid(id),
        status: ReportStatus::from_parts(&status, error)
            .map_err(|e| ReportStoreError::Storage(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(decode)?,
        completed_at: row.try_get("completed_at").map_err(decode)?,
    })
}

fn decode_row(row: &PgRow) -> Result<ReportRow, ReportStoreError> {
    let decode = |e: sqlx::Error| ReportStoreError::Storage(format!("failed to decode report data: {e}"));

    Ok(ReportRow {
        store_id: StoreId::new(row.try_get::<String, _>("store_id").map_err(decode)?),
        uptime_last_hour: row.try_get("uptime_last_hour").map_err(decode)?,
        uptime_last_day: row.try_get("uptime_last_day").map_err(decode)?,
        uptime_last_week: row.try_get("uptime_last_week").map_err(decode)?,
        downtime_last_hour: row.try_get("downtime_last_hour").map_err(decode)?,
        downtime_last_day: row.try_get("downtime_last_day").map_err(decode)?,
        downtime_last_week: row.try_get("downtime_last_week").map_err(decode)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> ReportStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            ReportStoreError::Storage(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => ReportStoreError::Storage(format!("connection pool closed in {}", operation)),
        _ => ReportStoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
