//! Forward-fill interpolation of sparse observations over a bounded interval.

use std::ops::{Add, AddAssign};

use chrono::{DateTime, Utc};
use serde::Serialize;

use storewatch_core::{Observation, StoreStatus};

use crate::period::minutes_between;

/// Active/inactive totals, in minutes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Activity {
    pub active_minutes: f64,
    pub inactive_minutes: f64,
}

impl Activity {
    pub fn new(active_minutes: f64, inactive_minutes: f64) -> Self {
        Self {
            active_minutes,
            inactive_minutes,
        }
    }

    pub fn total_minutes(&self) -> f64 {
        self.active_minutes + self.inactive_minutes
    }

    fn record(&mut self, status: Option<StoreStatus>, minutes: f64) {
        match status {
            Some(StoreStatus::Active) => self.active_minutes += minutes,
            _ => self.inactive_minutes += minutes,
        }
    }
}

impl Add for Activity {
    type Output = Activity;

    fn add(self, rhs: Activity) -> Activity {
        Activity {
            active_minutes: self.active_minutes + rhs.active_minutes,
            inactive_minutes: self.inactive_minutes + rhs.inactive_minutes,
        }
    }
}

impl AddAssign for Activity {
    fn add_assign(&mut self, rhs: Activity) {
        *self = *self + rhs;
    }
}

/// Interpolate `observations` over `[start, end)`.
///
/// `observations` must already be ordered by timestamp and lie within the interval;
/// they are not re-sorted. With no observations the whole interval counts as active.
///
/// Otherwise the interval boundaries become status-less markers and each gap between
/// consecutive points takes the status of its earlier point, or of its later point when
/// the earlier one is the start marker. Gaps of zero or negative length are skipped.
pub fn interpolate(start: DateTime<Utc>, end: DateTime<Utc>, observations: &[Observation]) -> Activity {
    if observations.is_empty() {
        return Activity::new(minutes_between(start, end).max(0.0), 0.0);
    }

    let points: Vec<(DateTime<Utc>, Option<StoreStatus>)> = std::iter::once((start, None))
        .chain(observations.iter().map(|o| (o.timestamp_utc, Some(o.status))))
        .chain(std::iter::once((end, None)))
        .collect();

    let mut activity = Activity::default();

    for pair in points.windows(2) {
        let (prev_at, prev_status) = pair[0];
        let (curr_at, curr_status) = pair[1];

        let minutes = minutes_between(prev_at, curr_at);
        if minutes <= 0.0 {
            continue;
        }

        activity.record(prev_status.or(curr_status), minutes);
    }

    activity
}
