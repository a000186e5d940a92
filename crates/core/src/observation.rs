//! Point-in-time status observations produced by the store pollers.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::StoreId;

/// Status reported by a single poll of a store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    Active,
    Inactive,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStatus::Active => "active",
            StoreStatus::Inactive => "inactive",
        }
    }
}

impl core::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StoreStatus::Active),
            "inactive" => Ok(StoreStatus::Inactive),
            other => Err(DomainError::invalid_status(format!(
                "unknown store status '{other}' (expected active or inactive)"
            ))),
        }
    }
}

/// A timestamped status reading for one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub store_id: StoreId,
    pub timestamp_utc: DateTime<Utc>,
    pub status: StoreStatus,
}

impl Observation {
    pub fn new(store_id: impl Into<StoreId>, timestamp_utc: DateTime<Utc>, status: StoreStatus) -> Self {
        Self {
            store_id: store_id.into(),
            timestamp_utc,
            status,
        }
    }
}
