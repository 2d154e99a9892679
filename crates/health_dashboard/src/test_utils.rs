//! Scripted `HealthStore` used by unit tests.
#![cfg(test)]

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use health_store_client::{HealthStore, HealthStoreError, MetricType, Quantity, TimeWindow};
use tokio::sync::{Mutex, Notify};

type Scripted = Result<Option<Quantity>, String>;

/// Replays queued responses per metric. The last response repeats once the
/// queue is down to one entry; a metric with no script has no samples.
pub struct ScriptedStore {
    denial: Option<String>,
    responses: Mutex<HashMap<MetricType, VecDeque<Scripted>>>,
    gates: HashMap<MetricType, Arc<Notify>>,
    authorization_calls: AtomicU32,
    query_calls: AtomicU32,
}

impl ScriptedStore {
    pub fn granting() -> Self {
        Self {
            denial: None,
            responses: Mutex::new(HashMap::new()),
            gates: HashMap::new(),
            authorization_calls: AtomicU32::new(0),
            query_calls: AtomicU32::new(0),
        }
    }

    pub fn denying(reason: &str) -> Self {
        Self {
            denial: Some(reason.to_string()),
            ..Self::granting()
        }
    }

    pub fn respond(mut self, metric: MetricType, response: Scripted) -> Self {
        self.responses
            .get_mut()
            .entry(metric)
            .or_default()
            .push_back(response);
        self
    }

    /// Hold queries for `metric` until the returned `Notify` is signalled.
    pub fn gate(&mut self, metric: MetricType) -> Arc<Notify> {
        self.gates.entry(metric).or_default().clone()
    }

    pub fn authorization_calls(&self) -> u32 {
        self.authorization_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> u32 {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthStore for ScriptedStore {
    async fn request_authorization(
        &self,
        _read: &BTreeSet<MetricType>,
    ) -> Result<(), HealthStoreError> {
        self.authorization_calls.fetch_add(1, Ordering::SeqCst);
        match &self.denial {
            Some(reason) => Err(HealthStoreError::AuthorizationDenied(reason.clone())),
            None => Ok(()),
        }
    }

    async fn execute_aggregate_query(
        &self,
        metric: MetricType,
        _window: &TimeWindow,
    ) -> Result<Option<Quantity>, HealthStoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gates.get(&metric) {
            gate.notified().await;
        }
        let next = {
            let mut responses = self.responses.lock().await;
            match responses.get_mut(&metric) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match next {
            Some(Ok(sum)) => Ok(sum),
            Some(Err(body)) => Err(HealthStoreError::Api { status: 500, body }),
            None => Ok(None),
        }
    }
}

/// Counter-only `metrics` recorder. Each counter is keyed as
/// `name{label=value,...}` with labels sorted by name.
#[derive(Clone, Default)]
pub struct CountingRecorder {
    counts: Arc<std::sync::Mutex<BTreeMap<String, u64>>>,
}

impl CountingRecorder {
    pub fn count(&self, key: &str) -> u64 {
        self.counts
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

struct CountingHandle {
    key: String,
    counts: Arc<std::sync::Mutex<BTreeMap<String, u64>>>,
}

impl metrics::CounterFn for CountingHandle {
    fn increment(&self, value: u64) {
        *self.counts.lock().unwrap().entry(self.key.clone()).or_default() += value;
    }

    fn absolute(&self, value: u64) {
        let mut counts = self.counts.lock().unwrap();
        let slot = counts.entry(self.key.clone()).or_default();
        *slot = (*slot).max(value);
    }
}

impl metrics::Recorder for CountingRecorder {
    fn describe_counter(
        &self,
        _key: metrics::KeyName,
        _unit: Option<metrics::Unit>,
        _description: metrics::SharedString,
    ) {
    }

    fn describe_gauge(
        &self,
        _key: metrics::KeyName,
        _unit: Option<metrics::Unit>,
        _description: metrics::SharedString,
    ) {
    }

    fn describe_histogram(
        &self,
        _key: metrics::KeyName,
        _unit: Option<metrics::Unit>,
        _description: metrics::SharedString,
    ) {
    }

    fn register_counter(
        &self,
        key: &metrics::Key,
        _metadata: &metrics::Metadata<'_>,
    ) -> metrics::Counter {
        let mut labels = key
            .labels()
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect::<Vec<_>>();
        labels.sort();
        metrics::Counter::from_arc(Arc::new(CountingHandle {
            key: format!("{}{{{}}}", key.name(), labels.join(",")),
            counts: self.counts.clone(),
        }))
    }

    fn register_gauge(
        &self,
        _key: &metrics::Key,
        _metadata: &metrics::Metadata<'_>,
    ) -> metrics::Gauge {
        metrics::Gauge::noop()
    }

    fn register_histogram(
        &self,
        _key: &metrics::Key,
        _metadata: &metrics::Metadata<'_>,
    ) -> metrics::Histogram {
        metrics::Histogram::noop()
    }
}
