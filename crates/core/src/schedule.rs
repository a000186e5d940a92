//! Weekly business-hour schedules.
//!
//! Rules are expressed in the store's local wall-clock time with no date attached.
//! Weekdays are numbered Monday = 0 through Sunday = 6.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::StoreId;

/// One row of a store's weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHourRule {
    pub store_id: StoreId,
    pub day_of_week: u8,
    pub start_time_local: NaiveTime,
    pub end_time_local: NaiveTime,
}

impl BusinessHourRule {
    pub fn new(
        store_id: impl Into<StoreId>,
        day_of_week: u8,
        start_time_local: NaiveTime,
        end_time_local: NaiveTime,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            day_of_week,
            start_time_local,
            end_time_local,
        }
    }
}

/// Opening hours for a single local calendar day.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DailyHours {
    /// No rule recorded for the weekday: the store counts as open all day.
    AllDay,
    /// Open from `start` until `end`, both local wall-clock times on the same date.
    Window { start: NaiveTime, end: NaiveTime },
}

/// A validated weekly schedule, indexed by weekday.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: [Option<(NaiveTime, NaiveTime)>; 7],
}

impl WeeklySchedule {
    /// Build a schedule from raw rules.
    ///
    /// Fails on a weekday outside `0..=6` or on two rules for the same weekday.
    pub fn from_rules<'a>(rules: impl IntoIterator<Item = &'a BusinessHourRule>) -> DomainResult<Self> {
        let mut days: [Option<(NaiveTime, NaiveTime)>; 7] = [None; 7];

        for rule in rules {
            let idx = usize::from(rule.day_of_week);
            if idx > 6 {
                return Err(DomainError::invalid_schedule(format!(
                    "day_of_week {} out of range for store {}",
                    rule.day_of_week, rule.store_id
                )));
            }
            if days[idx].is_some() {
                return Err(DomainError::invalid_schedule(format!(
                    "duplicate business hours for store {} on day {}",
                    rule.store_id, rule.day_of_week
                )));
            }
            days[idx] = Some((rule.start_time_local, rule.end_time_local));
        }

        Ok(Self { days })
    }

    /// Hours that apply on `weekday`.
    pub fn hours_for(&self, weekday: Weekday) -> DailyHours {
        match self.days[weekday.num_days_from_monday() as usize] {
            Some((start, end)) => DailyHours::Window { start, end },
            None => DailyHours::AllDay,
        }
    }

    pub fn is_always_open(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn missing_weekday_defaults_to_all_day() {
        let rules = vec![BusinessHourRule::new("s1", 0, t(9, 0), t(17, 0))];
        let schedule = WeeklySchedule::from_rules(&rules).unwrap();

        assert_eq!(
            schedule.hours_for(Weekday::Mon),
            DailyHours::Window { start: t(9, 0), end: t(17, 0) }
        );
        assert_eq!(schedule.hours_for(Weekday::Sun), DailyHours::AllDay);
        assert!(!schedule.is_always_open());
    }

    #[test]
    fn out_of_range_weekday_is_rejected() {
        let rules = vec![BusinessHourRule::new("s1", 7, t(9, 0), t(17, 0))];
        assert!(matches!(
            WeeklySchedule::from_rules(&rules),
            Err(DomainError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn duplicate_weekday_is_rejected() {
        let rules = vec![
            BusinessHourRule::new("s1", 2, t(9, 0), t(17, 0)),
            BusinessHourRule::new("s1", 2, t(10, 0), t(18, 0)),
        ];
        assert!(WeeklySchedule::from_rules(&rules).is_err());
    }

    #[test]
    fn empty_rule_set_is_always_open() {
        let schedule = WeeklySchedule::from_rules(std::iter::empty()).unwrap();
        assert!(schedule.is_always_open());
    }
}
