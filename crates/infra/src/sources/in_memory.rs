use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storewatch_core::{BusinessHourRule, Observation, StoreId};
use storewatch_reporting::{ObservationSource, ScheduleSource, SourceError};

fn poisoned() -> SourceError {
    SourceError::Unavailable("lock poisoned".to_string())
}

/// In-memory observation log, kept ordered by timestamp per store.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryObservationSource {
    stores: RwLock<BTreeMap<StoreId, Vec<Observation>>>,
}

impl InMemoryObservationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. Observations sharing a timestamp keep arrival order.
    pub fn record(&self, observation: Observation) -> Result<(), SourceError> {
        let mut stores = self.write()?;
        let log = stores.entry(observation.store_id.clone()).or_default();
        let at = log.partition_point(|o| o.timestamp_utc <= observation.timestamp_utc);
        log.insert(at, observation);
        Ok(())
    }

    pub fn record_all(&self, observations: impl IntoIterator<Item = Observation>) -> Result<(), SourceError> {
        observations.into_iter().try_for_each(|o| self.record(o))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<StoreId, Vec<Observation>>>, SourceError> {
        self.stores.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<StoreId, Vec<Observation>>>, SourceError> {
        self.stores.write().map_err(|_| poisoned())
    }
}

#[async_trait]
impl ObservationSource for InMemoryObservationSource {
    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, SourceError> {
        Ok(self
            .read()?
            .values()
            .filter_map(|log| log.last().map(|o| o.timestamp_utc))
            .max())
    }

    async fn store_ids(&self) -> Result<Vec<StoreId>, SourceError> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn observations_between(
        &self,
        store_id: &StoreId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, SourceError> {
        let stores = self.read()?;
        let Some(log) = stores.get(store_id) else {
            return Ok(Vec::new());
        };

        let lo = log.partition_point(|o| o.timestamp_utc < start);
        let hi = log.partition_point(|o| o.timestamp_utc <= end);
        Ok(log[lo..hi.max(lo)].to_vec())
    }
}

#[derive(Debug, Default)]
struct Schedules {
    timezones: HashMap<StoreId, String>,
    rules: HashMap<StoreId, Vec<BusinessHourRule>>,
}

/// In-memory timezones and business hours.
#[derive(Debug, Default)]
pub struct InMemoryScheduleSource {
    inner: RwLock<Schedules>,
}

impl InMemoryScheduleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timezone(&self, store_id: impl Into<StoreId>, timezone: impl Into<String>) -> Result<(), SourceError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.timezones.insert(store_id.into(), timezone.into());
        Ok(())
    }

    pub fn add_rule(&self, rule: BusinessHourRule) -> Result<(), SourceError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        inner.rules.entry(rule.store_id.clone()).or_default().push(rule);
        Ok(())
    }
}

#[async_trait]
impl ScheduleSource for InMemoryScheduleSource {
    async fn timezone(&self, store_id: &StoreId) -> Result<Option<String>, SourceError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.timezones.get(store_id).cloned())
    }

    async fn business_hours(&self, store_id: &StoreId) -> Result<Vec<BusinessHourRule>, SourceError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        Ok(inner.rules.get(store_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime, TimeZone};
    use storewatch_core::StoreStatus;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn observations_are_ordered_and_range_is_inclusive() {
        let source = InMemoryObservationSource::new();
        source
            .record_all([
                Observation::new("s1", t0() + Duration::minutes(30), StoreStatus::Inactive),
                Observation::new("s1", t0(), StoreStatus::Active),
                Observation::new("s1", t0() + Duration::minutes(60), StoreStatus::Active),
                Observation::new("s2", t0() + Duration::minutes(90), StoreStatus::Active),
            ])
            .unwrap();

        let store = StoreId::new("s1");
        let found = source
            .observations_between(&store, t0(), t0() + Duration::minutes(30))
            .await
            .unwrap();

        let times: Vec<_> = found.iter().map(|o| o.timestamp_utc).collect();
        assert_eq!(times, vec![t0(), t0() + Duration::minutes(30)]);
        assert_eq!(
            source.latest_timestamp().await.unwrap(),
            Some(t0() + Duration::minutes(90))
        );
        assert_eq!(
            source.store_ids().await.unwrap(),
            vec![StoreId::new("s1"), StoreId::new("s2")]
        );
    }

    #[tokio::test]
    async fn empty_source_has_no_reference_instant() {
        let source = InMemoryObservationSource::new();
        assert_eq!(source.latest_timestamp().await.unwrap(), None);
        assert!(source.store_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn schedules_are_per_store() {
        let source = InMemoryScheduleSource::new();
        source.set_timezone("s1", "Asia/Kolkata").unwrap();
        source
            .add_rule(BusinessHourRule::new(
                "s1",
                0,
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            ))
            .unwrap();

        let s1 = StoreId::new("s1");
        let s2 = StoreId::new("s2");
        assert_eq!(source.timezone(&s1).await.unwrap().as_deref(), Some("Asia/Kolkata"));
        assert_eq!(source.timezone(&s2).await.unwrap(), None);
        assert_eq!(source.business_hours(&s1).await.unwrap().len(), 1);
        assert!(source.business_hours(&s2).await.unwrap().is_empty());
    }
}
