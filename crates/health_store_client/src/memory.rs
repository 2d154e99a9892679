//! In-process [`HealthStore`] backed by a list of quantity samples.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{HealthStore, HealthStoreError, MetricType, Quantity, TimeWindow};

#[derive(Clone, Debug, PartialEq)]
pub struct QuantitySample {
    pub metric: MetricType,
    pub quantity: Quantity,
    pub start: DateTime<Utc>,
}

/// Sums samples whose start lies inside the query window.
///
/// Authorization is sticky: once a metric is granted it stays granted for the
/// lifetime of the store.
#[derive(Debug, Default)]
pub struct InMemoryHealthStore {
    samples: RwLock<Vec<QuantitySample>>,
    granted: RwLock<BTreeSet<MetricType>>,
    denial: Option<String>,
    failures: HashMap<MetricType, String>,
}

impl InMemoryHealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample(
        mut self,
        metric: MetricType,
        quantity: Quantity,
        start: DateTime<Utc>,
    ) -> Self {
        self.samples.get_mut().push(QuantitySample {
            metric,
            quantity,
            start,
        });
        self
    }

    /// Make every authorization request fail with `reason`.
    pub fn deny_authorization(mut self, reason: impl Into<String>) -> Self {
        self.denial = Some(reason.into());
        self
    }

    /// Make aggregate queries for `metric` fail with `reason`.
    pub fn fail_queries_for(mut self, metric: MetricType, reason: impl Into<String>) -> Self {
        self.failures.insert(metric, reason.into());
        self
    }

    pub async fn add_sample(&self, metric: MetricType, quantity: Quantity, start: DateTime<Utc>) {
        self.samples.write().await.push(QuantitySample {
            metric,
            quantity,
            start,
        });
    }

    pub async fn granted(&self) -> BTreeSet<MetricType> {
        self.granted.read().await.clone()
    }
}

#[async_trait]
impl HealthStore for InMemoryHealthStore {
    async fn request_authorization(
        &self,
        read: &BTreeSet<MetricType>,
    ) -> Result<(), HealthStoreError> {
        if let Some(reason) = &self.denial {
            return Err(HealthStoreError::AuthorizationDenied(reason.clone()));
        }
        self.granted.write().await.extend(read.iter().copied());
        Ok(())
    }

    async fn execute_aggregate_query(
        &self,
        metric: MetricType,
        window: &TimeWindow,
    ) -> Result<Option<Quantity>, HealthStoreError> {
        if !self.granted.read().await.contains(&metric) {
            return Err(HealthStoreError::NotAuthorized(metric));
        }
        if let Some(reason) = self.failures.get(&metric) {
            return Err(HealthStoreError::Api {
                status: 500,
                body: reason.clone(),
            });
        }

        let unit = metric.canonical_unit();
        let samples = self.samples.read().await;
        let mut sum: Option<f64> = None;
        for s in samples
            .iter()
            .filter(|s| s.metric == metric && window.contains(s.start))
        {
            *sum.get_or_insert(0.0) += s.quantity.value_in(unit)?;
        }
        Ok(sum.map(|value| Quantity::new(value, unit)))
    }
}
