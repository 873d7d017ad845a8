/// End-to-end tests of the Lead Record API router
/// Runs the real axum router over the in-memory store, with the scoring provider mocked
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use lead_scoring_api::app;
use lead_scoring_api::handlers::AppState;
use lead_scoring_api::leads::LeadService;
use lead_scoring_api::models::{Industry, LeadStatus, NewLead};
use lead_scoring_api::services::ScoringService;
use lead_scoring_api::store::{LeadStore, MemoryLeadStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Address with nothing listening, standing in for an unreachable provider.
const UNREACHABLE_SCORING_URL: &str = "http://127.0.0.1:9";

fn test_app(store: &MemoryLeadStore, scoring_url: &str) -> Router {
    let state = Arc::new(AppState {
        leads: LeadService::new(
            Arc::new(store.clone()),
            ScoringService::with_base_url(scoring_url),
        ),
    });
    app::router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn acme_payload() -> Value {
    json!({
        "company_name": "Acme",
        "contact_email": "a@acme.com",
        "industry": "technology",
        "company_size": 50,
        "source": "referral"
    })
}

async fn scoring_provider(score: f64, priority: &str) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict/lead-score"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "score": score,
            "probability": score / 100.0,
            "priority": priority
        })))
        .mount(&mock_server)
        .await;
    mock_server
}

#[tokio::test]
async fn test_create_uses_provider_score() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict/lead-score"))
        .and(body_json(json!({
            "company_size": 50,
            "industry": "technology",
            "engagement_score": 0.9
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "score": 89.7,
            "probability": 0.9,
            "priority": "high"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = MemoryLeadStore::new();
    let app = test_app(&store, &mock_server.uri());

    let (status, body) = send(&app, Method::POST, "/leads", Some(acme_payload())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "new");
    assert_eq!(body["ai_score"], 89.7);
    assert_eq!(body["ai_priority"], "high");
    assert_eq!(body["company_name"], "Acme");
    assert!(body["id"].as_str().is_some());
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_with_unreachable_provider_falls_back() {
    let store = MemoryLeadStore::new();
    let app = test_app(&store, UNREACHABLE_SCORING_URL);

    let (status, body) = send(&app, Method::POST, "/leads", Some(acme_payload())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "new");
    assert_eq!(body["ai_score"], 50.0);
    assert_eq!(body["ai_priority"], "medium");
}

#[tokio::test]
async fn test_create_with_failing_provider_falls_back() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict/lead-score"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model not loaded"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = MemoryLeadStore::new();
    let app = test_app(&store, &mock_server.uri());

    let (status, body) = send(&app, Method::POST, "/leads", Some(acme_payload())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ai_score"], 50.0);
    assert_eq!(body["ai_priority"], "medium");
}

#[tokio::test]
async fn test_create_missing_company_size_is_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = MemoryLeadStore::new();
    let app = test_app(&store, &mock_server.uri());

    let mut payload = acme_payload();
    payload.as_object_mut().unwrap().remove("company_size");
    let (status, body) = send(&app, Method::POST, "/leads", Some(payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert!(body["fields"]["company_size"].is_string());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_with_malformed_body_is_bad_request() {
    let store = MemoryLeadStore::new();
    let app = test_app(&store, UNREACHABLE_SCORING_URL);

    let (status, _) = send(
        &app,
        Method::POST,
        "/leads",
        Some(json!({ "company_name": "Acme", "company_size": "fifty" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_source_gets_default_weight() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict/lead-score"))
        .and(body_json(json!({
            "company_size": 50,
            "industry": "technology",
            "engagement_score": 0.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "score": 61.0,
            "probability": 0.61,
            "priority": "medium"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = MemoryLeadStore::new();
    let app = test_app(&store, &mock_server.uri());

    let mut payload = acme_payload();
    payload["source"] = json!("billboard");
    let (status, body) = send(&app, Method::POST, "/leads", Some(payload)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ai_score"], 61.0);
    assert!(body["source"].is_null());
}

#[tokio::test]
async fn test_get_unknown_lead_is_not_found() {
    let store = MemoryLeadStore::new();
    let app = test_app(&store, UNREACHABLE_SCORING_URL);

    let (status, body) = send(
        &app,
        Method::GET,
        "/leads/6c1a3a8e-2f0b-4a8f-9d3e-8f0f6c1d2e3f",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::GET, "/leads/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let mock_server = scoring_provider(70.0, "high").await;
    let store = MemoryLeadStore::new();
    let app = test_app(&store, &mock_server.uri());

    for name in ["First", "Second", "Third"] {
        let mut payload = acme_payload();
        payload["company_name"] = json!(name);
        let (status, _) = send(&app, Method::POST, "/leads", Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, Method::GET, "/leads", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|lead| lead["company_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Third", "Second", "First"]);
}

#[tokio::test]
async fn test_update_merges_and_keeps_score() {
    let mock_server = scoring_provider(89.7, "high").await;
    let store = MemoryLeadStore::new();
    let app = test_app(&store, &mock_server.uri());

    let (_, created) = send(&app, Method::POST, "/leads", Some(acme_payload())).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/leads/{}", id),
        Some(json!({ "status": "contacted", "ai_score": 1.0, "ai_priority": "low" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "contacted");
    assert_eq!(updated["company_name"], "Acme");
    assert_eq!(updated["ai_score"], 89.7);
    assert_eq!(updated["ai_priority"], "high");

    let (_, fetched) = send(&app, Method::GET, &format!("/leads/{}", id), None).await;
    assert_eq!(fetched["status"], "contacted");
}

#[tokio::test]
async fn test_update_unknown_lead_is_not_found() {
    let store = MemoryLeadStore::new();
    let app = test_app(&store, UNREACHABLE_SCORING_URL);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/leads/6c1a3a8e-2f0b-4a8f-9d3e-8f0f6c1d2e3f",
        Some(json!({ "status": "lost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let mock_server = scoring_provider(40.0, "medium").await;
    let store = MemoryLeadStore::new();
    let app = test_app(&store, &mock_server.uri());

    let (_, kept) = send(&app, Method::POST, "/leads", Some(acme_payload())).await;
    let (_, removed) = send(&app, Method::POST, "/leads", Some(acme_payload())).await;
    let removed_uri = format!("/leads/{}", removed["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::DELETE, &removed_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = send(&app, Method::DELETE, &removed_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, "/leads/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, list) = send(&app, Method::GET, "/leads", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], kept["id"]);
}

#[tokio::test]
async fn test_bulk_actions_require_confirmation() {
    let store = MemoryLeadStore::new();
    let app = test_app(&store, UNREACHABLE_SCORING_URL);

    let (status, _) = send(&app, Method::POST, "/admin/leads/reset", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(
        &app,
        Method::POST,
        "/admin/leads/clear",
        Some(json!({ "confirm": false })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/admin/leads/reset",
        Some(json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inserted"], 5);
    assert_eq!(store.list().await.unwrap().len(), 5);

    let (status, body) = send(
        &app,
        Method::POST,
        "/admin/leads/clear",
        Some(json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 5);
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_analytics_over_demo_data() {
    let store = MemoryLeadStore::new();
    let app = test_app(&store, UNREACHABLE_SCORING_URL);

    let (_, body) = send(&app, Method::GET, "/analytics", None).await;
    assert_eq!(body["total_leads"], 0);
    assert_eq!(body["average_score"], 0.0);

    send(
        &app,
        Method::POST,
        "/admin/leads/reset",
        Some(json!({ "confirm": true })),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/analytics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_leads"], 5);
    assert_eq!(body["high_priority"], 2);
    assert_eq!(body["medium_priority"], 2);
    assert_eq!(body["low_priority"], 1);
    let total: u64 = body["leads_by_industry"]
        .as_array()
        .unwrap()
        .iter()
        .map(|group| group["count"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 5);
}

#[tokio::test]
async fn test_health() {
    let store = MemoryLeadStore::new();
    let app = test_app(&store, UNREACHABLE_SCORING_URL);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_update_out_of_range_is_rejected() {
    let mock_server = scoring_provider(89.7, "high").await;
    let store = MemoryLeadStore::new();
    let app = test_app(&store, &mock_server.uri());

    let (_, created) = send(&app, Method::POST, "/leads", Some(acme_payload())).await;
    let uri = format!("/leads/{}", created["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "company_size": -5, "company_name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["company_size"].is_string());
    assert!(body["fields"]["company_name"].is_string());

    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "company_size": 100_001 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(fetched["company_size"], 50);
    assert_eq!(fetched["company_name"], "Acme");
}

#[tokio::test]
async fn test_event_stream_announces_changes() {
    let store = MemoryLeadStore::new();
    let app = test_app(&store, UNREACHABLE_SCORING_URL);

    let request = Request::builder()
        .uri("/events/leads")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    store
        .insert(NewLead {
            company_name: "Streamed Co".into(),
            contact_email: "s@streamed.com".into(),
            contact_name: None,
            industry: Industry::Retail,
            company_size: 12,
            source: None,
            ai_score: Some(33.0),
            ai_priority: None,
            status: LeadStatus::New,
        })
        .await
        .unwrap();

    let mut frames = response.into_body().into_data_stream();
    let frame = tokio::time::timeout(Duration::from_secs(2), frames.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let frame = String::from_utf8(frame.to_vec()).unwrap();
    assert!(frame.starts_with("event: leads-changed\n"), "{}", frame);
    assert!(frame.contains(r#"data: {"kind":"insert"}"#), "{}", frame);
}
