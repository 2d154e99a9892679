//! View-model for a "today" health dashboard.
//!
//! [`HealthManager`] asks the health store for read access once, queries
//! today's step and active-energy totals, and republishes them as
//! [`Activity`] records through a watch channel.

use std::sync::Arc;

use health_store_client::{HealthStore, MetricType};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub mod activity;
pub mod config;
pub mod error;
pub mod format;
pub mod services;
pub mod state;
pub mod store;
mod test_utils;

pub use activity::{Activity, MetricSlot, TODAY_CALORIES, TODAY_STEPS};
pub use error::{AuthorizationError, DashboardError, DashboardResult, QueryError};
pub use format::NumberLocale;
pub use services::{AuthorizationGate, Granted, MetricAggregator};
pub use state::{AuthorizationStatus, MetricStatus};
pub use store::{ActivitySnapshot, ActivityStore};

use store::StoreHandle;

/// Owns the activity store and drives the authorization and fetch flow.
///
/// Must be created inside a tokio runtime: construction spawns the task that
/// owns the store.
pub struct HealthManager {
    gate: AuthorizationGate,
    aggregator: MetricAggregator,
    updates: StoreHandle,
    snapshot: watch::Receiver<ActivitySnapshot>,
}

impl HealthManager {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self::with_locale(store, NumberLocale::default())
    }

    pub fn with_locale(store: Arc<dyn HealthStore>, locale: NumberLocale) -> Self {
        let (updates, snapshot) = store::spawn_store();
        Self {
            gate: AuthorizationGate::new(store.clone(), updates.clone()),
            aggregator: MetricAggregator::new(store, updates.clone(), locale),
            updates,
            snapshot,
        }
    }

    /// Request access, then fetch both of today's totals.
    ///
    /// Returns once authorization resolves; the fetches keep running in the
    /// background and their handles may be dropped.
    pub async fn start(&self) -> DashboardResult<Vec<JoinHandle<()>>> {
        self.gate.request_access().await?;
        Ok(MetricType::ALL
            .into_iter()
            .map(|metric| self.aggregator.fetch_today(metric))
            .collect())
    }

    /// Re-run the query for one metric. Requires granted access.
    pub fn refresh(&self, metric: MetricType) -> DashboardResult<JoinHandle<()>> {
        self.gate.outcome()?;
        Ok(self.aggregator.fetch_today(metric))
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    pub fn aggregator(&self) -> &MetricAggregator {
        &self.aggregator
    }

    pub fn subscribe(&self) -> watch::Receiver<ActivitySnapshot> {
        self.snapshot.clone()
    }

    /// Latest published state. Updates still in flight are not included.
    pub fn snapshot(&self) -> ActivitySnapshot {
        self.snapshot.borrow().clone()
    }

    /// Resolve once every update sent so far has been applied.
    pub async fn sync(&self) -> DashboardResult<ActivitySnapshot> {
        self.updates.sync().await?;
        Ok(self.snapshot())
    }

    /// Resolve once access is denied or every metric reached a terminal status.
    ///
    /// Updates sent before the call (such as the `Fetching` mark of a
    /// `refresh`) are applied first, so an earlier terminal status does not
    /// count as settled.
    pub async fn wait_until_settled(&self) -> DashboardResult<ActivitySnapshot> {
        self.updates.sync().await?;
        let mut rx = self.subscribe();
        let snap = rx
            .wait_for(ActivitySnapshot::is_settled)
            .await
            .map_err(|_| DashboardError::StoreClosed)?;
        Ok(snap.clone())
    }
}
