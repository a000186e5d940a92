//! Report job storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storewatch_core::{ReportId, ReportRow};

use super::types::{JobEvent, ReportJob, TransitionError};

/// Persistence for report jobs and their rows.
///
/// Rows of a job become visible together with its `Completed` status and never
/// before; readers see either every row of a job or none.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Record a new job.
    async fn insert(&self, job: ReportJob) -> Result<ReportId, ReportStoreError>;

    /// Get a job by ID.
    async fn get(&self, id: ReportId) -> Result<Option<ReportJob>, ReportStoreError>;

    /// Apply a status event to a stored job.
    async fn transition(
        &self,
        id: ReportId,
        event: JobEvent,
        at: DateTime<Utc>,
    ) -> Result<ReportJob, ReportStoreError>;

    /// Persist `rows` and mark the job completed, atomically.
    async fn complete(
        &self,
        id: ReportId,
        rows: Vec<ReportRow>,
        at: DateTime<Utc>,
    ) -> Result<ReportJob, ReportStoreError>;

    /// Rows persisted for a job, in storage order. Empty unless the job completed.
    async fn rows(&self, id: ReportId) -> Result<Vec<ReportRow>, ReportStoreError>;
}

/// Report store error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ReportStoreError {
    #[error("report not found: {0}")]
    NotFound(ReportId),
    #[error("report already exists: {0}")]
    AlreadyExists(ReportId),
    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone)]
struct Entry {
    job: ReportJob,
    rows: Vec<ReportRow>,
}

/// In-memory report store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<ReportId, Entry>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<ReportId, Entry>>, ReportStoreError> {
        self.reports
            .write()
            .map_err(|_| ReportStoreError::Storage("report store lock poisoned".to_string()))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<ReportId, Entry>>, ReportStoreError> {
        self.reports
            .read()
            .map_err(|_| ReportStoreError::Storage("report store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn insert(&self, job: ReportJob) -> Result<ReportId, ReportStoreError> {
        let mut reports = self.write()?;
        if reports.contains_key(&job.id) {
            return Err(ReportStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        reports.insert(id, Entry { job, rows: Vec::new() });
        Ok(id)
    }

    async fn get(&self, id: ReportId) -> Result<Option<ReportJob>, ReportStoreError> {
        Ok(self.read()?.get(&id).map(|e| e.job.clone()))
    }

    async fn transition(
        &self,
        id: ReportId,
        event: JobEvent,
        at: DateTime<Utc>,
    ) -> Result<ReportJob, ReportStoreError> {
        let mut reports = self.write()?;
        let entry = reports.get_mut(&id).ok_or(ReportStoreError::NotFound(id))?;
        entry.job.transition(event, at)?;
        Ok(entry.job.clone())
    }

    async fn complete(
        &self,
        id: ReportId,
        rows: Vec<ReportRow>,
        at: DateTime<Utc>,
    ) -> Result<ReportJob, ReportStoreError> {
        let mut reports = self.write()?;
        let entry = reports.get_mut(&id).ok_or(ReportStoreError::NotFound(id))?;

        // Validate on a copy so a rejected completion leaves the entry untouched.
        let mut job = entry.job.clone();
        job.transition(JobEvent::Complete, at)?;

        entry.job = job;
        entry.rows = rows;
        Ok(entry.job.clone())
    }

    async fn rows(&self, id: ReportId) -> Result<Vec<ReportRow>, ReportStoreError> {
        let reports = self.read()?;
        let entry = reports.get(&id).ok_or(ReportStoreError::NotFound(id))?;
        Ok(entry.rows.clone())
    }
}

#[async_trait]
impl<S> ReportStore for Arc<S>
where
    S: ReportStore + ?Sized,
{
    async fn insert(&self, job: ReportJob) -> Result<ReportId, ReportStoreError> {
        (**self).insert(job).await
    }

    async fn get(&self, id: ReportId) -> Result<Option<ReportJob>, ReportStoreError> {
        (**self).get(id).await
    }

    async fn transition(
        &self,
        id: ReportId,
        event: JobEvent,
        at: DateTime<Utc>,
    ) -> Result<ReportJob, ReportStoreError> {
        (**self).transition(id, event, at).await
    }

    async fn complete(
        &self,
        id: ReportId,
        rows: Vec<ReportRow>,
        at: DateTime<Utc>,
    ) -> Result<ReportJob, ReportStoreError> {
        (**self).complete(id, rows, at).await
    }

    async fn rows(&self, id: ReportId) -> Result<Vec<ReportRow>, ReportStoreError> {
        (**self).rows(id).await
    }
}
