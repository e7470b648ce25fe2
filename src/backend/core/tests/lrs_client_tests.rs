//! HTTP contract tests for the LRS client against a mock statements resource.

use learnlog_core::config::{CredentialConfig, StoreConfig};
use learnlog_core::error::{ErrorCode, ErrorKind};
use learnlog_core::statement::{Learner, Statement, StatementBuilder, StatementId};
use learnlog_core::store::{CallContext, LrsClient, StatementQuery, StatementStore};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ============================================================================
// Test Utilities
// ============================================================================

async fn setup() -> (MockServer, LrsClient) {
    let server = MockServer::start().await;
    let config = StoreConfig::new(
        format!("{}/xapi/", server.uri()),
        CredentialConfig::basic("alice", "secret"),
    )
    .with_timeout(Duration::from_secs(5));
    let client = LrsClient::new(config).unwrap();
    (server, client)
}

fn learner() -> Learner {
    Learner::new("learner-1", "Ana Lima", "student")
}

fn project_event() -> Statement {
    StatementBuilder::default().build_project_event(&learner(), "p1", "define", "pt")
}

// ============================================================================
// Append
// ============================================================================

#[tokio::test]
async fn test_append_sends_protocol_headers() {
    let (server, client) = setup().await;
    let statement = project_event();
    let expected_id = statement.id.to_string();

    Mock::given(method("POST"))
        .and(path("/xapi/statements"))
        .and(header("Authorization", "Basic YWxpY2U6c2VjcmV0"))
        .and(header("X-Experience-API-Version", "1.0.3"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([expected_id])))
        .expect(1)
        .mount(&server)
        .await;

    let id = client.append(&statement, &CallContext::new()).await.unwrap();
    assert_eq!(id, statement.id);
}

#[tokio::test]
async fn test_append_posts_statement_body() {
    let (server, client) = setup().await;
    let statement = StatementBuilder::default().build_achievement_event(
        &learner(),
        "apply-ethical-guidelines",
        75.0,
        "ev",
    );

    Mock::given(method("POST"))
        .and(path("/xapi/statements"))
        .and(|req: &Request| {
            let body: serde_json::Value = match serde_json::from_slice(&req.body) {
                Ok(v) => v,
                Err(_) => return false,
            };
            body["result"]["score"]["raw"] == json!(75.0)
                && body["actor"]["account"]["homePage"] == json!("http://aiforl.edu")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["stored-1"])))
        .expect(1)
        .mount(&server)
        .await;

    let id = client.append(&statement, &CallContext::new()).await.unwrap();
    assert_eq!(id, StatementId::from("stored-1"));
}

#[tokio::test]
async fn test_invalid_statement_fails_before_io() {
    let (server, client) = setup().await;
    let mut statement = project_event();
    statement.object.definition = None;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.append(&statement, &CallContext::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_bad_request_is_rejected() {
    let (server, client) = setup().await;
    let statement = project_event();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid statement"))
        .mount(&server)
        .await;

    let err = client.append(&statement, &CallContext::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(err.details().status, Some(400));
}

#[tokio::test]
async fn test_unauthorized_is_transport() {
    let (server, client) = setup().await;
    let statement = project_event();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.append(&statement, &CallContext::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_batch_id_count_mismatch_fails_whole_call() {
    let (server, client) = setup().await;
    let builder = StatementBuilder::default();
    let batch: Vec<_> = (0..3)
        .map(|i| builder.build_project_event(&learner(), &format!("p{}", i), "define", "pt"))
        .collect();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["only-one"])))
        .mount(&server)
        .await;

    let err = client.append_batch(&batch, &CallContext::new()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidResponse);
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_batch_returns_ids_in_order() {
    let (server, client) = setup().await;
    let builder = StatementBuilder::default();
    let batch: Vec<_> = (0..3)
        .map(|i| builder.build_project_event(&learner(), &format!("p{}", i), "define", "pt"))
        .collect();
    let ids: Vec<String> = batch.iter().map(|s| s.id.to_string()).collect();

    Mock::given(method("POST"))
        .and(|req: &Request| {
            serde_json::from_slice::<Vec<serde_json::Value>>(&req.body)
                .map(|v| v.len() == 3)
                .unwrap_or(false)
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(ids)))
        .expect(1)
        .mount(&server)
        .await;

    let returned = client.append_batch(&batch, &CallContext::new()).await.unwrap();
    let expected: Vec<StatementId> = batch.iter().map(|s| s.id.clone()).collect();
    assert_eq!(returned, expected);
}

// ============================================================================
// Query & Get
// ============================================================================

#[tokio::test]
async fn test_query_sends_filters_and_follows_more() {
    let (server, client) = setup().await;
    let builder = StatementBuilder::default();
    let first = builder.build_project_event(&learner(), "p1", "define", "pt");
    let second = builder.build_project_event(&learner(), "p1", "collect", "pt");
    let actor = builder.actor_key("learner-1");
    let agent = serde_json::to_string(&actor.to_agent()).unwrap();

    Mock::given(method("GET"))
        .and(path("/xapi/statements"))
        .and(query_param("agent", agent.as_str()))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statements": [first],
            "more": "/xapi/statements?more=page-2"
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/xapi/statements"))
        .and(query_param("more", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statements": [second],
            "more": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = StatementQuery::for_actor(&actor).with_limit(1);
    let ctx = CallContext::new();

    let page = client.query(&query, &ctx).await.unwrap();
    assert_eq!(page.count, 1);
    assert!(page.more.is_some());

    let all = client.query_all(&query, &ctx).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].id, second.id);
}

#[tokio::test]
async fn test_empty_result_is_not_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/xapi/statements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"statements": []})))
        .mount(&server)
        .await;

    let page = client.query(&StatementQuery::new(), &CallContext::new()).await.unwrap();
    assert!(page.statements.is_empty());
    assert!(page.is_last());
}

#[tokio::test]
async fn test_get_by_id_round_trip_and_not_found() {
    let (server, client) = setup().await;
    let statement = StatementBuilder::default().build_achievement_event(
        &learner(),
        "design-refine-prompts",
        75.0,
        "evidence-x",
    );

    Mock::given(method("GET"))
        .and(path("/xapi/statements"))
        .and(query_param("statementId", statement.id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(statement)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/xapi/statements"))
        .and(query_param("statementId", "missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let ctx = CallContext::new();
    let back = client.get_by_id(&statement.id, &ctx).await.unwrap();
    assert_eq!(back.score_raw(), Some(75.0));

    let err = client.get_by_id(&StatementId::from("missing"), &ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Deadlines & Retryable Failures
// ============================================================================

#[tokio::test]
async fn test_deadline_exceeded_is_transport() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"statements": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let ctx = CallContext::with_timeout(Duration::from_millis(50));
    let err = client.query(&StatementQuery::new(), &ctx).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::DeadlineExceeded);
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_server_error_is_retryable_transport() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let err = client.query(&StatementQuery::new(), &CallContext::new()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    assert!(err.is_retryable());
    assert_eq!(err.details().retry_after_secs, Some(30));
}
