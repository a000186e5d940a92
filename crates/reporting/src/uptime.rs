//! Uptime/downtime calculation over the three rolling report windows.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use storewatch_core::{Observation, ReportRow, StoreId, WeeklySchedule};

use crate::interpolation::{Activity, interpolate};
use crate::period::{BusinessPeriod, resolve_business_periods};
use crate::source::{ObservationSource, ScheduleSource, SourceError};

/// Rolling window ending at the report's reference instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportWindow {
    LastHour,
    LastDay,
    LastWeek,
}

impl ReportWindow {
    pub const ALL: [ReportWindow; 3] = [ReportWindow::LastHour, ReportWindow::LastDay, ReportWindow::LastWeek];

    pub fn duration(&self) -> Duration {
        match self {
            ReportWindow::LastHour => Duration::hours(1),
            ReportWindow::LastDay => Duration::days(1),
            ReportWindow::LastWeek => Duration::weeks(1),
        }
    }

    /// `[now - duration, now]`.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.duration(), now)
    }

    /// Factor applied to raw minutes when reporting: the hour window reports minutes,
    /// the day and week windows report hours.
    pub fn report_scale(&self) -> f64 {
        match self {
            ReportWindow::LastHour => 1.0,
            ReportWindow::LastDay | ReportWindow::LastWeek => 1.0 / 60.0,
        }
    }
}

/// Why a single store could not be computed.
///
/// These faults are caught at the store boundary: the store is skipped and the
/// report carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreFault {
    #[error("no timezone recorded for store {0}")]
    MissingTimezone(StoreId),

    #[error("store {store_id} has unrecognised timezone '{timezone}'")]
    InvalidTimezone { store_id: StoreId, timezone: String },

    #[error("store {store_id} has malformed business hours: {reason}")]
    InvalidSchedule { store_id: StoreId, reason: String },

    #[error("data access failed for store {store_id}: {source}")]
    Source {
        store_id: StoreId,
        #[source]
        source: SourceError,
    },
}

impl StoreFault {
    /// Short machine-readable label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreFault::MissingTimezone(_) => "missing_timezone",
            StoreFault::InvalidTimezone { .. } => "invalid_timezone",
            StoreFault::InvalidSchedule { .. } => "invalid_schedule",
            StoreFault::Source { .. } => "source",
        }
    }

    pub fn store_id(&self) -> &StoreId {
        match self {
            StoreFault::MissingTimezone(store_id)
            | StoreFault::InvalidTimezone { store_id, .. }
            | StoreFault::InvalidSchedule { store_id, .. }
            | StoreFault::Source { store_id, .. } => store_id,
        }
    }
}

/// Raw (unscaled, minutes) activity of one store in each window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreUptime {
    pub store_id: StoreId,
    pub last_hour: Activity,
    pub last_day: Activity,
    pub last_week: Activity,
}

impl StoreUptime {
    pub fn window(&self, window: ReportWindow) -> Activity {
        match window {
            ReportWindow::LastHour => self.last_hour,
            ReportWindow::LastDay => self.last_day,
            ReportWindow::LastWeek => self.last_week,
        }
    }

    /// Report row with the per-window unit switch applied.
    pub fn to_row(&self) -> ReportRow {
        let scaled = |w: ReportWindow| {
            let a = self.window(w);
            let k = w.report_scale();
            (a.active_minutes * k, a.inactive_minutes * k)
        };
        let (uptime_last_hour, downtime_last_hour) = scaled(ReportWindow::LastHour);
        let (uptime_last_day, downtime_last_day) = scaled(ReportWindow::LastDay);
        let (uptime_last_week, downtime_last_week) = scaled(ReportWindow::LastWeek);

        ReportRow {
            store_id: self.store_id.clone(),
            uptime_last_hour,
            uptime_last_day,
            uptime_last_week,
            downtime_last_hour,
            downtime_last_day,
            downtime_last_week,
        }
    }
}

/// Result of computing a batch of stores: rows for the stores that succeeded and the
/// faults of those that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreOutcomes {
    pub rows: Vec<ReportRow>,
    pub skipped: Vec<StoreFault>,
}

/// Computes per-store uptime from an observation source and a schedule source.
#[derive(Debug, Clone)]
pub struct UptimeCalculator<O, S> {
    observations: O,
    schedules: S,
}

impl<O, S> UptimeCalculator<O, S>
where
    O: ObservationSource,
    S: ScheduleSource,
{
    pub fn new(observations: O, schedules: S) -> Self {
        Self {
            observations,
            schedules,
        }
    }

    /// Reference instant shared by every store of one report: the latest observation
    /// across all stores.
    pub async fn reference_instant(&self) -> Result<Option<DateTime<Utc>>, SourceError> {
        self.observations.latest_timestamp().await
    }

    /// Stores to include in a report.
    pub async fn stores(&self) -> Result<Vec<StoreId>, SourceError> {
        self.observations.store_ids().await
    }

    /// Compute all three windows for `store_id` against `now`.
    pub async fn compute_store(&self, store_id: &StoreId, now: DateTime<Utc>) -> Result<StoreUptime, StoreFault> {
        let source_fault = |source: SourceError| StoreFault::Source {
            store_id: store_id.clone(),
            source,
        };

        let timezone = self
            .schedules
            .timezone(store_id)
            .await
            .map_err(source_fault)?
            .ok_or_else(|| StoreFault::MissingTimezone(store_id.clone()))?;
        let tz: Tz = timezone.trim().parse().map_err(|_| StoreFault::InvalidTimezone {
            store_id: store_id.clone(),
            timezone: timezone.clone(),
        })?;

        let rules = self.schedules.business_hours(store_id).await.map_err(source_fault)?;
        let schedule = WeeklySchedule::from_rules(&rules).map_err(|e| StoreFault::InvalidSchedule {
            store_id: store_id.clone(),
            reason: e.to_string(),
        })?;

        // One range scan over the widest window; narrower windows are slices of it.
        let (week_start, _) = ReportWindow::LastWeek.bounds(now);
        let observations = self
            .observations
            .observations_between(store_id, week_start, now)
            .await
            .map_err(source_fault)?;

        let uptime = StoreUptime {
            store_id: store_id.clone(),
            last_hour: window_activity(&schedule, tz, ReportWindow::LastHour, now, &observations),
            last_day: window_activity(&schedule, tz, ReportWindow::LastDay, now, &observations),
            last_week: window_activity(&schedule, tz, ReportWindow::LastWeek, now, &observations),
        };

        debug!(
            store_id = %store_id,
            timezone = %tz,
            observations = observations.len(),
            "computed store uptime"
        );

        Ok(uptime)
    }

    /// Compute every store in `stores` against the same `now`.
    ///
    /// A fault in one store never stops the others; it is logged and collected in
    /// `skipped`.
    pub async fn compute_stores(&self, stores: &[StoreId], now: DateTime<Utc>) -> StoreOutcomes {
        let mut outcomes = StoreOutcomes::default();

        for store_id in stores {
            match self.compute_store(store_id, now).await {
                Ok(uptime) => outcomes.rows.push(uptime.to_row()),
                Err(fault) => {
                    warn!(
                        store_id = %store_id,
                        fault = fault.kind(),
                        error = %fault,
                        "skipping store"
                    );
                    outcomes.skipped.push(fault);
                }
            }
        }

        outcomes
    }
}

/// Sum of interpolated activity over every business period of `window`.
pub fn window_activity(
    schedule: &WeeklySchedule,
    tz: Tz,
    window: ReportWindow,
    now: DateTime<Utc>,
    observations: &[Observation],
) -> Activity {
    let (start, end) = window.bounds(now);

    resolve_business_periods(schedule, tz, start, end)
        .iter()
        .map(|period| interpolate(period.start, period.end, observations_in(period, observations)))
        .fold(Activity::default(), |acc, a| acc + a)
}

/// Sub-slice of time-ordered `observations` with `period.start <= ts <= period.end`.
fn observations_in<'a>(period: &BusinessPeriod, observations: &'a [Observation]) -> &'a [Observation] {
    let lo = observations.partition_point(|o| o.timestamp_utc < period.start);
    let hi = observations.partition_point(|o| o.timestamp_utc <= period.end);
    &observations[lo..hi.max(lo)]
}
