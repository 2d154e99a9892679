use std::sync::Arc;

use health_dashboard::{AuthorizationStatus, HealthManager, MetricStatus};
use health_store_client::MetricType;
use health_store_client::http_client::ReqwestHealthStore;
use secrecy::SecretString;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_authorization(server: &MockServer, granted: bool) {
    Mock::given(method("POST"))
        .and(path("/api/v1/authorization"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"granted": granted})),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_sum(server: &MockServer, metric: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/v1/statistics"))
        .and(body_partial_json(serde_json::json!({"quantityType": metric})))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn manager(server: &MockServer) -> HealthManager {
    let store = ReqwestHealthStore::new(&server.uri(), SecretString::new("key".into()));
    HealthManager::new(Arc::new(store))
}

#[tokio::test]
async fn end_to_end_publishes_formatted_activities() {
    let mock_server = MockServer::start().await;
    mount_authorization(&mock_server, true).await;
    mount_sum(
        &mock_server,
        "stepCount",
        serde_json::json!({"sumQuantity": {"value": 4321.0, "unit": "count"}}),
    )
    .await;
    mount_sum(
        &mock_server,
        "activeEnergyBurned",
        serde_json::json!({"sumQuantity": {"value": 1234.4, "unit": "kcal"}}),
    )
    .await;

    let manager = manager(&mock_server);
    manager.start().await.expect("authorized");
    let snap = manager.wait_until_settled().await.expect("settled");

    assert_eq!(snap.activity("todaySteps").unwrap().amount(), "4321.0");
    assert_eq!(snap.activity("todayCalories").unwrap().amount(), "1,234");

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["authorization"], "Granted");
    assert_eq!(json["activities"]["todayCalories"]["image"], "flame");
}

#[tokio::test]
async fn denied_bridge_never_queries() {
    let mock_server = MockServer::start().await;
    mount_authorization(&mock_server, false).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/statistics"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let manager = manager(&mock_server);
    assert!(manager.start().await.is_err());
    let snap = manager.wait_until_settled().await.expect("settled");
    assert!(matches!(snap.authorization, AuthorizationStatus::Denied(_)));
    assert!(snap.activities.is_empty());
}

#[tokio::test]
async fn server_error_marks_metric_failed() {
    let mock_server = MockServer::start().await;
    mount_authorization(&mock_server, true).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/statistics"))
        .and(body_partial_json(serde_json::json!({"quantityType": "stepCount"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;
    mount_sum(
        &mock_server,
        "activeEnergyBurned",
        serde_json::json!({"sumQuantity": null}),
    )
    .await;

    let manager = manager(&mock_server);
    manager.start().await.expect("authorized");
    let snap = manager.wait_until_settled().await.expect("settled");

    assert!(snap.activities.is_empty());
    match snap.status(MetricType::StepCount) {
        Some(MetricStatus::Failed(reason)) => assert!(reason.contains("boom")),
        other => panic!("unexpected status: {other:?}"),
    }
    assert!(matches!(
        snap.status(MetricType::ActiveEnergyBurned),
        Some(MetricStatus::Failed(_))
    ));
}
