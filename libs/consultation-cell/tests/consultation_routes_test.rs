use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use consultation_cell::{consultation_routes_with_state, ConsultationState, TavusClient};
use shared_config::AppConfig;
use shared_utils::test_utils::{InMemoryStore, JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    router: Router,
    state: Arc<ConsultationState>,
    store: Arc<InMemoryStore>,
    user: TestUser,
    token: String,
}

fn test_app(config: AppConfig) -> TestApp {
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));

    let store = Arc::new(InMemoryStore::new());
    store.set_rpc_result(
        "get_available_doctors",
        json!([
            MockSupabaseResponses::persona_response("cardio", "Cardiology", true, true),
            MockSupabaseResponses::persona_response("gp", "General Physician", false, true),
        ]),
    );

    let conversations = Arc::new(TavusClient::new(&config));
    let state = Arc::new(ConsultationState::with_providers(Arc::new(config), conversations, store.clone()));
    let router = consultation_routes_with_state(state.clone());

    TestApp { router, state, store, user, token }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token))
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

async fn mount_create(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": "c_42",
            "conversation_url": "https://tavus.daily.co/c_42",
            "status": "active"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn free_user_sees_general_physician_only() {
    let app = test_app(TestConfig::default().to_app_config());

    let (status, body) = app.send("GET", "/personas", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan_type"], "free");
    let personas = body["personas"].as_array().unwrap();
    assert_eq!(personas.len(), 1);
    assert_eq!(personas[0]["specialty"], "General Physician");
}

#[tokio::test]
async fn premium_user_sees_all_personas() {
    let app = test_app(TestConfig::default().to_app_config());
    app.store.seed("subscriptions", MockSupabaseResponses::subscription_response(&app.user.id, "monthly"));

    let (_, body) = app.send("GET", "/personas", None).await;

    assert_eq!(body["plan_type"], "monthly");
    assert_eq!(body["personas"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["personas"][0]["id"], "gp");
}

#[tokio::test]
async fn start_and_end_consultation() {
    let server = MockServer::start().await;
    mount_create(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/conversations/c_42/end"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());

    let (status, body) = app.send("POST", "/start", Some(json!({ "persona_id": "gp", "symptoms": "headache" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["status"], "active");
    assert_eq!(body["session"]["conversation_url"], "https://tavus.daily.co/c_42");
    assert_eq!(body["session"]["elapsed_seconds"], 0);

    let rows = app.store.rows("consultations");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["symptoms"], "headache");
    assert_eq!(rows[0]["tavus_conversation_id"], "c_42");

    let (status, body) = app.send("POST", "/start", Some(json!({ "persona_id": "gp" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already in progress"));

    let (status, body) = app.send("POST", "/end", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["status"], "ended");
    assert_eq!(body["session"]["elapsed_seconds"], 0);
    assert!(body["outcome"]["provider_error"].is_null());

    let (_, history) = app.send("GET", "/history", None).await;
    assert_eq!(history["consultations"][0]["status"], "completed");
}

#[tokio::test]
async fn failed_remote_end_is_queued_for_retry() {
    let server = MockServer::start().await;
    mount_create(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/conversations/c_42/end"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    app.send("POST", "/start", Some(json!({ "persona_id": "gp" }))).await;

    let (status, body) = app.send("POST", "/end", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["status"], "ended");
    assert!(body["outcome"]["provider_error"].as_str().unwrap().contains("502"));
    assert_eq!(app.state.reconciler.pending().await, vec!["c_42".to_string()]);
}

#[tokio::test]
async fn free_user_cannot_start_premium_persona() {
    let server = MockServer::start().await;
    mount_create(&server, 0).await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    let (status, _) = app.send("POST", "/start", Some(json!({ "persona_id": "cardio" }))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, session) = app.send("GET", "/session", None).await;
    assert_eq!(session["session"]["status"], "idle");
    assert!(app.store.rows("consultations").is_empty());
}

#[tokio::test]
async fn provider_failure_reports_errored_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .respond_with(ResponseTemplate::new(500).set_body_string("replica offline"))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    let (status, _) = app.send("POST", "/start", Some(json!({ "persona_id": "gp" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, session) = app.send("GET", "/session", None).await;
    assert_eq!(session["session"]["status"], "errored");
    assert!(session["session"]["error"].is_string());
}

#[tokio::test]
async fn missing_api_key_is_configuration_error() {
    let mut config = TestConfig::default().to_app_config();
    config.tavus_api_key.clear();
    let app = test_app(config);

    let (status, _) = app.send("POST", "/start", Some(json!({ "persona_id": "gp" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn end_without_session_is_conflict() {
    let app = test_app(TestConfig::default().to_app_config());
    let (status, _) = app.send("POST", "/end", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn toggles_are_local() {
    let app = test_app(TestConfig::default().to_app_config());

    let (_, body) = app.send("POST", "/session/mute", None).await;
    assert_eq!(body["muted"], true);
    let (_, body) = app.send("POST", "/session/video", None).await;
    assert_eq!(body["video_enabled"], false);
}

#[tokio::test]
async fn shutdown_ends_open_conversations() {
    let server = MockServer::start().await;
    mount_create(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/conversations/c_42/end"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    app.send("POST", "/start", Some(json!({ "persona_id": "gp" }))).await;

    app.state.shutdown().await;
}

#[tokio::test]
async fn conversation_details_are_limited_to_their_owner() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations/c_mine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": "c_mine",
            "conversation_url": "https://tavus.daily.co/c_mine",
            "status": "active"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/conversations/c_theirs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "conversation_id": "c_theirs" })))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    let someone_else = TestUser::default();
    app.store.seed(
        "consultations",
        json!({ "user_id": app.user.id, "tavus_conversation_id": "c_mine", "status": "active" }),
    );
    app.store.seed(
        "consultations",
        json!({ "user_id": someone_else.id, "tavus_conversation_id": "c_theirs", "status": "active" }),
    );

    let (status, body) = app.send("GET", "/conversations/c_mine", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversation_url"], "https://tavus.daily.co/c_mine");

    let (status, body) = app.send("GET", "/conversations/c_theirs", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["conversation_url"].is_null());
}
