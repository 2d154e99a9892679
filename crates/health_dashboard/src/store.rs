//! The activity store and the single task allowed to mutate it.
//!
//! Query completions arrive on arbitrary worker threads. They never touch the
//! store directly; they send a [`StoreUpdate`] over an unbounded channel and
//! the store task applies updates one at a time, in arrival order, publishing
//! a fresh [`ActivitySnapshot`] to subscribers after each change.

use std::collections::{BTreeMap, HashMap};

use health_store_client::MetricType;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use crate::activity::MetricSlot;
use crate::error::{DashboardError, DashboardResult};
use crate::state::{AuthorizationStatus, MetricStatus};
use crate::Activity;

#[derive(Debug)]
pub(crate) enum StoreUpdate {
    Authorization(AuthorizationStatus),
    Fetching(MetricType),
    Published {
        metric: MetricType,
        activity: Activity,
    },
    Failed {
        metric: MetricType,
        reason: String,
    },
    /// Barrier: acknowledged once every earlier update has been applied.
    Sync(oneshot::Sender<()>),
}

/// Mutable dashboard state, owned by the store task.
#[derive(Debug)]
pub struct ActivityStore {
    authorization: AuthorizationStatus,
    activities: HashMap<&'static str, Activity>,
    metrics: HashMap<MetricType, MetricStatus>,
}

impl Default for ActivityStore {
    fn default() -> Self {
        Self {
            authorization: AuthorizationStatus::default(),
            activities: HashMap::new(),
            metrics: MetricType::ALL
                .into_iter()
                .map(|m| (m, MetricStatus::NotFetched))
                .collect(),
        }
    }
}

impl ActivityStore {
    pub(crate) fn apply(&mut self, update: StoreUpdate) {
        match update {
            StoreUpdate::Authorization(status) => self.authorization = status,
            StoreUpdate::Fetching(metric) => {
                self.metrics.insert(metric, MetricStatus::Fetching);
            }
            StoreUpdate::Published { metric, activity } => {
                let key = MetricSlot::for_metric(metric).key;
                self.activities.insert(key, activity.clone());
                self.metrics.insert(metric, MetricStatus::Ready(activity));
            }
            StoreUpdate::Failed { metric, reason } => {
                self.metrics.insert(metric, MetricStatus::Failed(reason));
            }
            StoreUpdate::Sync(_) => {}
        }
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        ActivitySnapshot {
            authorization: self.authorization.clone(),
            activities: self
                .activities
                .iter()
                .map(|(k, a)| (k.to_string(), a.clone()))
                .collect(),
            metrics: self
                .metrics
                .iter()
                .map(|(m, s)| (MetricSlot::for_metric(*m).key.to_string(), s.clone()))
                .collect(),
        }
    }
}

/// Read-only view handed to consumers.
///
/// `activities` holds only metrics that were published at least once; an
/// absent key means "no data yet" or "failed", which `metrics` tells apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivitySnapshot {
    pub authorization: AuthorizationStatus,
    pub activities: BTreeMap<String, Activity>,
    pub metrics: BTreeMap<String, MetricStatus>,
}

impl ActivitySnapshot {
    pub fn activity(&self, key: &str) -> Option<&Activity> {
        self.activities.get(key)
    }

    pub fn status(&self, metric: MetricType) -> Option<&MetricStatus> {
        self.metrics.get(MetricSlot::for_metric(metric).key)
    }

    /// Denied, or granted with every metric in a terminal state.
    pub fn is_settled(&self) -> bool {
        match self.authorization {
            AuthorizationStatus::Denied(_) => true,
            AuthorizationStatus::Granted => self.metrics.values().all(MetricStatus::is_terminal),
            _ => false,
        }
    }

    pub fn to_json_pretty(&self) -> DashboardResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Sending half used by the gate and the aggregator tasks.
#[derive(Clone, Debug)]
pub(crate) struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreUpdate>,
}

impl StoreHandle {
    pub(crate) fn send(&self, update: StoreUpdate) {
        if self.tx.send(update).is_err() {
            tracing::debug!("activity store task stopped; update dropped");
        }
    }

    pub(crate) async fn sync(&self) -> DashboardResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(StoreUpdate::Sync(done_tx))
            .map_err(|_| DashboardError::StoreClosed)?;
        done_rx.await.map_err(|_| DashboardError::StoreClosed)
    }
}

/// Spawn the store task. It runs until every [`StoreHandle`] is dropped.
pub(crate) fn spawn_store() -> (StoreHandle, watch::Receiver<ActivitySnapshot>) {
    let store = ActivityStore::default();
    let (snapshot_tx, snapshot_rx) = watch::channel(store.snapshot());
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_store(store, rx, snapshot_tx));
    (StoreHandle { tx }, snapshot_rx)
}

async fn run_store(
    mut store: ActivityStore,
    mut rx: mpsc::UnboundedReceiver<StoreUpdate>,
    snapshot_tx: watch::Sender<ActivitySnapshot>,
) {
    while let Some(update) = rx.recv().await {
        if let StoreUpdate::Sync(done) = update {
            let _ = done.send(());
            continue;
        }
        store.apply(update);
        snapshot_tx.send_replace(store.snapshot());
    }
    tracing::debug!("activity store task finished");
}
