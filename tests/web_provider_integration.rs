//! Integration tests for the web metric provider using wiremock

use core::time::Duration;
use rollout_webmetric::expr::ConditionEvaluator;
use rollout_webmetric::metric::{AnalysisPhase, AnalysisRun, Measurement, Metric};
use rollout_webmetric::provider::{LogContext, Provider, WebMetricProvider};
use std::sync::Arc;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run_ctx() -> AnalysisRun {
    AnalysisRun::new("canary-analysis", "default")
}

/// Build a metric from YAML, substituting `{server}` with the mock server URI
fn metric_yaml(yaml: &str, server: &MockServer) -> Metric {
    Metric::from_yaml(&yaml.replace("{server}", &server.uri())).expect("valid metric definition")
}

async fn measure(metric: &Metric) -> Measurement {
    init_logging();
    let provider = WebMetricProvider::from_metric(
        LogContext::for_metric(&run_ctx(), metric),
        metric,
        Arc::new(ConditionEvaluator),
    )
    .expect("provider should build");

    provider.run(&run_ctx(), metric).await
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

#[tokio::test]
async fn test_extracts_nested_value_and_evaluates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":{"b":5}}"#))
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: success-rate
successCondition: result == 5
provider:
  web:
    url: '{server}/metrics'
    jsonPath: '{$.a.b}'
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Successful);
    assert_eq!(measurement.value, "5");
    assert!(measurement.started_at.is_some());
    assert!(measurement.finished_at.is_some());
    assert!(measurement.started_at <= measurement.finished_at);
    assert!(measurement.message.is_none());
}

#[tokio::test]
async fn test_failed_condition() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":{"b":5}}"#))
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: success-rate
successCondition: result > 10
provider:
  web:
    url: '{server}/metrics'
    jsonPath: '{.a.b}'
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Failed);
    assert_eq!(measurement.value, "5");
    assert!(measurement.finished_at.is_some());
}

#[tokio::test]
async fn test_hyphenated_field_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":{"error-rate":0.01}}"#))
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: error-rate
successCondition: result < 0.05
provider:
  web:
    url: '{server}/metrics'
    jsonPath: '{.data.error-rate}'
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Successful);
    assert_eq!(measurement.value, "0.01");
}

#[tokio::test]
async fn test_non_json_body_is_successful() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: health
failureCondition: 'true'
provider:
  web:
    url: '{server}/health'
    jsonPath: '{$.status}'
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Successful);
    assert_eq!(measurement.value, "plain text");
}

#[tokio::test]
async fn test_non_2xx_status_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"a":{"b":5}}"#))
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    url: '{server}/missing'
    jsonPath: '{$.a.b}'
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Error);
    assert!(measurement.message.as_deref().unwrap_or_default().contains("404"));
    assert!(measurement.finished_at.is_none());
    assert!(measurement.value.is_empty());
}

#[tokio::test]
async fn test_path_without_match_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":{"b":5}}"#))
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    url: '{server}/metrics'
    jsonPath: '{$.a.c}'
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Error);
    assert!(measurement.message.as_deref().unwrap_or_default().contains("no value"));
}

#[tokio::test]
async fn test_both_bodies_never_reach_network() {
    let mock_server = MockServer::start().await;

    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    method: POST
    url: '{server}/query'
    body: raw
    jsonBody:
      query: up
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Error);
    assert!(measurement.finished_at.is_none());
    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_body_with_get_never_reaches_network() {
    let mock_server = MockServer::start().await;

    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    url: '{server}/query'
    jsonBody:
      query: up
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Error);
    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_json_body_post_forces_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({"query": "up"})))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":{"value":0.99}}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: m
successCondition: result >= 0.95
provider:
  web:
    method: POST
    url: '{server}/query'
    headers:
      - key: Content-Type
        value: text/plain
    jsonBody:
      query: up
    jsonPath: '{$.data.value}'
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Successful);
    assert_eq!(measurement.value, "0.99");
}

#[tokio::test]
async fn test_string_body_put() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/query"))
        .and(body_string("sum(up)"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    method: PUT
    url: '{server}/query'
    body: sum(up)
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Successful);
    assert_eq!(measurement.value, "1");
}

#[tokio::test]
async fn test_later_header_wins() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    url: '{server}/metrics'
    headers:
      - key: X-Tenant
        value: first
      - key: X-Tenant
        value: second
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Successful);

    let requests = mock_server.received_requests().await.expect("request recording enabled");
    assert_eq!(requests.len(), 1);
    let values: Vec<_> = requests[0].headers.get_all("x-tenant").iter().collect();
    assert_eq!(values, vec!["second"]);
}

#[tokio::test]
async fn test_timeout_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("late").set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    url: '{server}/slow'
    timeoutSeconds: 1
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Error);
    assert!(measurement.finished_at.is_none());
}

#[tokio::test]
async fn test_connection_failure_is_error() {
    let mock_server = MockServer::start().await;
    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    url: '{server}/metrics'
",
        &mock_server,
    );
    drop(mock_server);

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Error);
    assert!(measurement.message.is_some());
}

#[tokio::test]
async fn test_oauth2_bearer_token_is_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-123",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/metrics"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ready":true}"#))
        .expect(2)
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: m
successCondition: result
provider:
  web:
    url: '{server}/metrics'
    jsonPath: '{.ready}'
    authentication:
      oauth2:
        tokenUrl: '{server}/oauth/token'
        clientId: rollouts
        clientSecret: s3cret
        scopes: [metrics]
",
        &mock_server,
    );

    init_logging();
    let provider = WebMetricProvider::from_metric(LogContext::new(), &metric, Arc::new(ConditionEvaluator)).unwrap();

    for _ in 0..2 {
        let measurement = provider.run(&run_ctx(), &metric).await;
        assert_eq!(measurement.phase, AnalysisPhase::Successful);
        assert_eq!(measurement.value, "true");
    }
}

#[tokio::test]
async fn test_oauth2_missing_secret_fails_before_any_request() {
    let mock_server = MockServer::start().await;

    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    url: '{server}/metrics'
    authentication:
      oauth2:
        tokenUrl: '{server}/oauth/token'
        clientId: rollouts
",
        &mock_server,
    );

    let err = WebMetricProvider::from_metric(LogContext::new(), &metric, Arc::new(ConditionEvaluator)).unwrap_err();
    assert!(err.to_string().contains("missing mandatory parameter"));
    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_oauth2_token_failure_is_error_measurement() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: m
provider:
  web:
    url: '{server}/metrics'
    authentication:
      oauth2:
        tokenUrl: '{server}/oauth/token'
        clientId: rollouts
        clientSecret: s3cret
",
        &mock_server,
    );

    let measurement = measure(&metric).await;
    assert_eq!(measurement.phase, AnalysisPhase::Error);

    let requests = mock_server.received_requests().await.expect("request recording enabled");
    assert!(requests.iter().all(|r| r.url.path() == "/oauth/token"));
}

#[tokio::test]
async fn test_concurrent_runs_share_provider() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items":[{"v":3},{"v":4}]}"#))
        .expect(8)
        .mount(&mock_server)
        .await;

    let metric = metric_yaml(
        r"
name: m
successCondition: result == 3
provider:
  web:
    url: '{server}/metrics'
    jsonPath: '{.items[*].v}'
",
        &mock_server,
    );

    init_logging();
    let provider = Arc::new(WebMetricProvider::from_metric(LogContext::new(), &metric, Arc::new(ConditionEvaluator)).unwrap());
    let metric = Arc::new(metric);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let provider = Arc::clone(&provider);
            let metric = Arc::clone(&metric);
            tokio::spawn(async move { provider.run(&AnalysisRun::new(format!("run-{i}"), ""), &metric).await })
        })
        .collect();

    for task in tasks {
        let measurement = task.await.unwrap();
        assert_eq!(measurement.phase, AnalysisPhase::Successful);
        assert_eq!(measurement.value, "3");
    }
}
