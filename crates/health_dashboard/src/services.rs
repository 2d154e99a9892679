use std::sync::Arc;

use chrono::Local;
use health_store_client::utils::today_so_far;
use health_store_client::{HealthStore, MetricType, TimeWindow};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::activity::MetricSlot;
use crate::error::{AuthorizationError, QueryError};
use crate::format::NumberLocale;
use crate::state::AuthorizationStatus;
use crate::store::{StoreHandle, StoreUpdate};
use crate::Activity;

/// Proof that read access was granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Granted;

/// Asks the health store for read access exactly once.
pub struct AuthorizationGate {
    store: Arc<dyn HealthStore>,
    updates: StoreHandle,
    outcome: OnceCell<Result<Granted, AuthorizationError>>,
}

impl AuthorizationGate {
    pub(crate) fn new(store: Arc<dyn HealthStore>, updates: StoreHandle) -> Self {
        Self {
            store,
            updates,
            outcome: OnceCell::new(),
        }
    }

    /// Request read access for steps and active energy. Later calls return
    /// the first outcome without contacting the store again.
    pub async fn request_access(&self) -> Result<Granted, AuthorizationError> {
        self.outcome
            .get_or_init(|| self.request_once())
            .await
            .clone()
    }

    /// Outcome of the first request, if one has completed.
    pub fn outcome(&self) -> Result<Granted, AuthorizationError> {
        self.outcome
            .get()
            .cloned()
            .unwrap_or(Err(AuthorizationError::NotRequested))
    }

    async fn request_once(&self) -> Result<Granted, AuthorizationError> {
        self.updates
            .send(StoreUpdate::Authorization(AuthorizationStatus::Requesting));
        match self
            .store
            .request_authorization(&MetricType::read_set())
            .await
        {
            Ok(()) => {
                tracing::info!("health data read access granted");
                metrics::counter!("health_dashboard_authorization_total", "outcome" => "granted")
                    .increment(1);
                self.updates
                    .send(StoreUpdate::Authorization(AuthorizationStatus::Granted));
                Ok(Granted)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(error = %reason, "health data read access not granted");
                metrics::counter!("health_dashboard_authorization_total", "outcome" => "denied")
                    .increment(1);
                self.updates
                    .send(StoreUpdate::Authorization(AuthorizationStatus::Denied(
                        reason.clone(),
                    )));
                Err(AuthorizationError::Denied(reason))
            }
        }
    }
}

/// Runs one "today so far" sum query per trigger and publishes the result.
#[derive(Clone)]
pub struct MetricAggregator {
    store: Arc<dyn HealthStore>,
    updates: StoreHandle,
    locale: NumberLocale,
}

impl MetricAggregator {
    pub(crate) fn new(
        store: Arc<dyn HealthStore>,
        updates: StoreHandle,
        locale: NumberLocale,
    ) -> Self {
        Self {
            store,
            updates,
            locale,
        }
    }

    /// Mark `metric` as fetching and spawn its query. The returned handle may
    /// be dropped; the task still runs to completion.
    pub(crate) fn fetch_today(&self, metric: MetricType) -> JoinHandle<()> {
        self.updates.send(StoreUpdate::Fetching(metric));
        let this = self.clone();
        tokio::spawn(async move {
            let window = today_so_far(&Local::now());
            this.run(metric, window).await;
        })
    }

    async fn run(&self, metric: MetricType, window: TimeWindow) {
        let slot = MetricSlot::for_metric(metric);
        tracing::debug!(
            metric = slot.key,
            start = %window.start(),
            end = %window.end(),
            "querying today's total"
        );
        match self.aggregate(slot, &window).await {
            Ok(activity) => {
                tracing::info!(metric = slot.key, amount = activity.amount(), "published activity");
                metrics::counter!(
                    "health_dashboard_queries_total",
                    "metric" => slot.key,
                    "outcome" => "published"
                )
                .increment(1);
                self.updates
                    .send(StoreUpdate::Published { metric, activity });
            }
            Err(e) => {
                let outcome = match e {
                    QueryError::NoData => "no_data",
                    QueryError::Store(_) => "error",
                };
                tracing::warn!(metric = slot.key, error = %e, "today's total unavailable");
                metrics::counter!(
                    "health_dashboard_queries_total",
                    "metric" => slot.key,
                    "outcome" => outcome
                )
                .increment(1);
                self.updates.send(StoreUpdate::Failed {
                    metric,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Query the summed quantity for `window` and turn it into `slot`'s record.
    pub async fn aggregate(
        &self,
        slot: &MetricSlot,
        window: &TimeWindow,
    ) -> Result<Activity, QueryError> {
        let quantity = self
            .store
            .execute_aggregate_query(slot.metric, window)
            .await
            .map_err(|e| QueryError::Store(e.to_string()))?
            .ok_or(QueryError::NoData)?;
        slot.activity(&quantity, &self.locale)
            .map_err(|e| QueryError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{TODAY_CALORIES, TODAY_STEPS};
    use crate::store::spawn_store;
    use crate::test_utils::{CountingRecorder, ScriptedStore};
    use chrono::{TimeZone, Utc};
    use health_store_client::{Quantity, Unit};

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn gate_requests_only_once() {
        let store = Arc::new(ScriptedStore::granting());
        let (updates, _rx) = spawn_store();
        let gate = AuthorizationGate::new(store.clone(), updates);
        assert_eq!(gate.outcome(), Err(AuthorizationError::NotRequested));
        assert_eq!(gate.request_access().await, Ok(Granted));
        assert_eq!(gate.request_access().await, Ok(Granted));
        assert_eq!(store.authorization_calls(), 1);
        assert_eq!(gate.outcome(), Ok(Granted));
    }

    #[tokio::test]
    async fn gate_reports_denial() {
        let store = Arc::new(ScriptedStore::denying("user declined"));
        let (updates, rx) = spawn_store();
        let gate = AuthorizationGate::new(store, updates.clone());
        let err = gate.request_access().await.unwrap_err();
        assert!(matches!(err, AuthorizationError::Denied(ref r) if r.contains("user declined")));
        updates.sync().await.unwrap();
        assert!(matches!(
            rx.borrow().authorization,
            AuthorizationStatus::Denied(_)
        ));
    }

    #[tokio::test]
    async fn aggregate_builds_calorie_record() {
        let store = Arc::new(
            ScriptedStore::granting().respond(
                MetricType::ActiveEnergyBurned,
                Ok(Some(Quantity::new(432.6, Unit::Kilocalorie))),
            ),
        );
        let (updates, _rx) = spawn_store();
        let agg = MetricAggregator::new(store, updates, NumberLocale::default());
        let activity = agg.aggregate(&TODAY_CALORIES, &window()).await.unwrap();
        assert_eq!(activity.amount(), "433");
        assert_eq!(activity.id(), 1);
    }

    #[tokio::test]
    async fn aggregate_without_samples_is_no_data() {
        let store = Arc::new(ScriptedStore::granting());
        let (updates, _rx) = spawn_store();
        let agg = MetricAggregator::new(store, updates, NumberLocale::default());
        let err = agg.aggregate(&TODAY_STEPS, &window()).await.unwrap_err();
        assert_eq!(err, QueryError::NoData);
    }

    #[tokio::test]
    async fn aggregate_maps_store_errors() {
        let store = Arc::new(
            ScriptedStore::granting().respond(MetricType::StepCount, Err("database locked".into())),
        );
        let (updates, _rx) = spawn_store();
        let agg = MetricAggregator::new(store, updates, NumberLocale::default());
        let err = agg.aggregate(&TODAY_STEPS, &window()).await.unwrap_err();
        assert!(matches!(err, QueryError::Store(ref m) if m.contains("database locked")));
    }

    #[test]
    fn outcomes_are_counted_per_metric() {
        let recorder = CountingRecorder::default();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        // current-thread runtime keeps every spawned task on the recorder's thread
        metrics::with_local_recorder(&recorder, || {
            rt.block_on(async {
                let store = Arc::new(
                    ScriptedStore::granting()
                        .respond(
                            MetricType::StepCount,
                            Ok(Some(Quantity::new(5.0, Unit::Count))),
                        )
                        .respond(MetricType::ActiveEnergyBurned, Err("locked".into())),
                );
                let (updates, _rx) = spawn_store();
                let gate = AuthorizationGate::new(store.clone(), updates.clone());
                gate.request_access().await.unwrap();
                gate.request_access().await.unwrap();

                let agg = MetricAggregator::new(store, updates, NumberLocale::default());
                agg.fetch_today(MetricType::StepCount).await.unwrap();
                agg.fetch_today(MetricType::ActiveEnergyBurned).await.unwrap();
            })
        });

        assert_eq!(
            recorder.count("health_dashboard_authorization_total{outcome=granted}"),
            1
        );
        assert_eq!(
            recorder.count("health_dashboard_queries_total{metric=todaySteps,outcome=published}"),
            1
        );
        assert_eq!(
            recorder.count("health_dashboard_queries_total{metric=todayCalories,outcome=error}"),
            1
        );
        assert_eq!(
            recorder.count("health_dashboard_queries_total{metric=todayCalories,outcome=no_data}"),
            0
        );
    }

    #[test]
    fn denial_is_counted() {
        let recorder = CountingRecorder::default();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        metrics::with_local_recorder(&recorder, || {
            rt.block_on(async {
                let (updates, _rx) = spawn_store();
                let gate =
                    AuthorizationGate::new(Arc::new(ScriptedStore::denying("no")), updates);
                assert!(gate.request_access().await.is_err());
            })
        });
        assert_eq!(
            recorder.count("health_dashboard_authorization_total{outcome=denied}"),
            1
        );
        assert_eq!(
            recorder.count("health_dashboard_authorization_total{outcome=granted}"),
            0
        );
    }
}
