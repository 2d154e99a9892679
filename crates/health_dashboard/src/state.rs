use schemars::JsonSchema;
use serde::Serialize;

use crate::Activity;

#[derive(Debug, Serialize, JsonSchema, Clone, Default, PartialEq, Eq)]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Requesting,
    Granted,
    Denied(String),
}

#[derive(Debug, Serialize, JsonSchema, Clone, Default, PartialEq, Eq)]
pub enum MetricStatus {
    #[default]
    NotFetched,
    Fetching,
    Ready(Activity),
    Failed(String),
}

impl MetricStatus {
    /// No further transition happens without an explicit refresh.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MetricStatus::Ready(_) | MetricStatus::Failed(_))
    }
}
