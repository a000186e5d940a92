use std::path::PathBuf;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use storewatch_core::ReportId;
use storewatch_infra::jobs::{
    ExecutorStats, InMemoryReportStore, PostgresReportStore, ReportController, ReportExecutor, ReportExecutorConfig,
    ReportExecutorHandle, ReportStore, TriggerError,
};
use storewatch_infra::sources::{
    InMemoryObservationSource, InMemoryScheduleSource, PostgresObservationSource, PostgresScheduleSource,
};
use storewatch_infra::{AppConfig, DatabaseConfig, ReportMaterializer};
use storewatch_reporting::{ObservationSource, ScheduleSource, UptimeCalculator};

type DynObservations = Arc<dyn ObservationSource>;
type DynSchedules = Arc<dyn ScheduleSource>;
type DynReports = Arc<dyn ReportStore>;

/// Report controller over type-erased adapters, so in-memory and Postgres wiring share one type.
pub type AppController = ReportController<DynObservations, DynSchedules, DynReports>;

/// Services shared by every handler.
pub struct AppServices {
    executor: ReportExecutorHandle<DynObservations, DynSchedules, DynReports>,
}

impl AppServices {
    /// Wire adapters into a controller and start the executor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        observations: DynObservations,
        schedules: DynSchedules,
        reports: DynReports,
        reports_dir: impl Into<PathBuf>,
        executor: ReportExecutorConfig,
    ) -> Self {
        let controller = ReportController::new(
            UptimeCalculator::new(observations, schedules),
            reports,
            ReportMaterializer::new(reports_dir),
        );
        let executor = ReportExecutor::spawn(Arc::new(controller), executor);
        Self { executor }
    }

    /// In-memory adapters for tests/dev; callers keep the sources to seed data.
    pub fn in_memory(
        observations: Arc<InMemoryObservationSource>,
        schedules: Arc<InMemoryScheduleSource>,
        reports_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            observations,
            schedules,
            InMemoryReportStore::arc(),
            reports_dir,
            ReportExecutorConfig::default(),
        )
    }

    pub async fn postgres(
        database: &DatabaseConfig,
        reports_dir: impl Into<PathBuf>,
        executor: ReportExecutorConfig,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(database.connect_options())
            .await?;

        tracing::info!(host = %database.host, dbname = %database.dbname, "connected to Postgres");

        Ok(Self::new(
            Arc::new(PostgresObservationSource::new(pool.clone())),
            Arc::new(PostgresScheduleSource::new(pool.clone())),
            Arc::new(PostgresReportStore::new(pool)),
            reports_dir,
            executor,
        ))
    }

    /// Postgres when a database is configured, otherwise empty in-memory stores.
    pub async fn from_config(config: &AppConfig) -> Result<Self, sqlx::Error> {
        let executor = ReportExecutorConfig::default().with_max_concurrent(config.report_concurrency);

        match &config.database {
            Some(database) => Self::postgres(database, &config.reports_dir, executor).await,
            None => Ok(Self::new(
                Arc::new(InMemoryObservationSource::new()),
                Arc::new(InMemoryScheduleSource::new()),
                InMemoryReportStore::arc(),
                &config.reports_dir,
                executor,
            )),
        }
    }

    pub fn controller(&self) -> &AppController {
        self.executor.controller()
    }

    pub async fn trigger(&self) -> Result<ReportId, TriggerError> {
        self.executor.trigger().await
    }

    pub fn executor_stats(&self) -> ExecutorStats {
        self.executor.stats()
    }
}
