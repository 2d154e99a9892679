//! HTTP implementation of the [`HealthStore`](crate::HealthStore) trait.
//!
//! Talks JSON to a health data bridge that exposes the platform store's
//! authorization and statistics calls.

use std::collections::BTreeSet;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{HealthStore, HealthStoreError, MetricType, Quantity, TimeWindow};

/// Client for a health data bridge using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestHealthStore {
    base_url: String,
    api_key: SecretString,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct AuthorizationRequest<'a> {
    read: &'a BTreeSet<MetricType>,
    share: [MetricType; 0],
}

#[derive(Deserialize)]
struct AuthorizationResponse {
    granted: bool,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsRequest {
    quantity_type: MetricType,
    start: String,
    end: String,
    options: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsResponse {
    #[serde(default)]
    sum_quantity: Option<Quantity>,
}

impl ReqwestHealthStore {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `base_url` - Root URL of the bridge (e.g., "http://127.0.0.1:8787")
    /// * `api_key` - Bearer token sent with every request
    pub fn new(base_url: &str, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(cfg: &crate::config::Config) -> Self {
        Self::new(&cfg.base_url, cfg.api_key.clone())
    }

    /// Build an authenticated POST request.
    fn post_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
    }

    /// Execute a request and expect a JSON response.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, HealthStoreError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(resp.json::<T>().await?)
    }

    /// Extract error information from a failed response.
    async fn error_from_response(resp: reqwest::Response) -> HealthStoreError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();
        HealthStoreError::from_status(status, body_snippet)
    }
}

#[async_trait]
impl HealthStore for ReqwestHealthStore {
    async fn request_authorization(
        &self,
        read: &BTreeSet<MetricType>,
    ) -> Result<(), HealthStoreError> {
        let url = format!("{}/api/v1/authorization", self.base_url);
        let body = AuthorizationRequest { read, share: [] };
        let resp: AuthorizationResponse =
            self.execute_json(self.post_request(&url).json(&body)).await?;
        if resp.granted {
            Ok(())
        } else {
            Err(HealthStoreError::AuthorizationDenied(
                resp.reason
                    .unwrap_or_else(|| "read access was not granted".into()),
            ))
        }
    }

    async fn execute_aggregate_query(
        &self,
        metric: MetricType,
        window: &TimeWindow,
    ) -> Result<Option<Quantity>, HealthStoreError> {
        let url = format!("{}/api/v1/statistics", self.base_url);
        let body = StatisticsRequest {
            quantity_type: metric,
            start: window.start().to_rfc3339(),
            end: window.end().to_rfc3339(),
            options: "cumulativeSum",
        };
        tracing::trace!(%metric, start = %body.start, end = %body.end, "statistics query");
        let resp: StatisticsResponse =
            self.execute_json(self.post_request(&url).json(&body)).await?;
        Ok(resp.sum_quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slash() {
        let store = ReqwestHealthStore::new("http://localhost/", SecretString::new("key".into()));
        assert_eq!(store.base_url, "http://localhost");
    }

    #[test]
    fn authorization_request_never_asks_for_writes() {
        let read = MetricType::read_set();
        let body = AuthorizationRequest { read: &read, share: [] };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"read": ["stepCount", "activeEnergyBurned"], "share": []})
        );
    }

    #[test]
    fn statistics_response_accepts_null_sum() {
        let r: StatisticsResponse =
            serde_json::from_value(serde_json::json!({"sumQuantity": null})).unwrap();
        assert!(r.sum_quantity.is_none());
        let r: StatisticsResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(r.sum_quantity.is_none());
    }
}
