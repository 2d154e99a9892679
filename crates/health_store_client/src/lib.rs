//! Minimal `HealthStore` trait and the types exchanged with a health data store.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod http_client;
pub mod memory;
pub mod utils;

#[derive(Debug, Error)]
pub enum HealthStoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),
    #[error("read access to {0} was never authorized")]
    NotAuthorized(MetricType),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("cannot convert {from} to {to}")]
    IncompatibleUnit { from: Unit, to: Unit },
}

impl HealthStoreError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => HealthStoreError::Auth(body),
            404 => HealthStoreError::NotFound(body),
            422 => HealthStoreError::InvalidInput(body),
            _ => HealthStoreError::Api { status, body },
        }
    }
}

/// Quantity categories the dashboard reads.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum MetricType {
    StepCount,
    ActiveEnergyBurned,
}

impl MetricType {
    pub const ALL: [MetricType; 2] = [MetricType::StepCount, MetricType::ActiveEnergyBurned];

    /// Unit the store reports this metric in when summing.
    pub fn canonical_unit(self) -> Unit {
        match self {
            MetricType::StepCount => Unit::Count,
            MetricType::ActiveEnergyBurned => Unit::Kilocalorie,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::StepCount => "stepCount",
            MetricType::ActiveEnergyBurned => "activeEnergyBurned",
        }
    }

    /// The read set requested at startup.
    pub fn read_set() -> BTreeSet<MetricType> {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum Unit {
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "kcal")]
    Kilocalorie,
    #[serde(rename = "kJ")]
    Kilojoule,
}

const KILOJOULES_PER_KILOCALORIE: f64 = 4.184;

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unit::Count => "count",
            Unit::Kilocalorie => "kcal",
            Unit::Kilojoule => "kJ",
        })
    }
}

/// A summed value together with the unit it was reported in.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Value expressed in `unit`; count and energy units do not mix.
    pub fn value_in(&self, unit: Unit) -> Result<f64, HealthStoreError> {
        use Unit::*;
        match (self.unit, unit) {
            (a, b) if a == b => Ok(self.value),
            (Kilocalorie, Kilojoule) => Ok(self.value * KILOJOULES_PER_KILOCALORIE),
            (Kilojoule, Kilocalorie) => Ok(self.value / KILOJOULES_PER_KILOCALORIE),
            (from, to) => Err(HealthStoreError::IncompatibleUnit { from, to }),
        }
    }
}

/// Half-open interval `[start, end)` used as the sample predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, HealthStoreError> {
        if end < start {
            return Err(HealthStoreError::InvalidInput(format!(
                "window end {end} precedes start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[async_trait]
pub trait HealthStore: Send + Sync + 'static {
    /// Ask for read-only access to `read`. Nothing is ever requested for writing.
    async fn request_authorization(
        &self,
        read: &BTreeSet<MetricType>,
    ) -> Result<(), HealthStoreError>;

    /// Cumulative sum of `metric` samples inside `window`.
    ///
    /// `Ok(None)` means the store holds no summable samples for the window.
    async fn execute_aggregate_query(
        &self,
        metric: MetricType,
        window: &TimeWindow,
    ) -> Result<Option<Quantity>, HealthStoreError>;
}
