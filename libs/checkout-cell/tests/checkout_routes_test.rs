use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use checkout_cell::{checkout_routes_with_state, payment_routes_with_state, CheckoutState, PaystackClient};
use shared_config::AppConfig;
use shared_utils::test_utils::{InMemoryStore, JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
    token: String,
    user: TestUser,
}

fn build_state(config: AppConfig, store: Arc<InMemoryStore>) -> Arc<CheckoutState> {
    let payments = PaystackClient::new(&config)
        .ok()
        .map(|client| Arc::new(client) as Arc<dyn checkout_cell::PaymentProvider>);
    Arc::new(CheckoutState::with_providers(Arc::new(config), payments, store))
}

fn test_app(config: AppConfig) -> TestApp {
    let user = TestUser::patient("buyer@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));
    let store = Arc::new(InMemoryStore::new());
    let router = checkout_routes_with_state(build_state(config, store.clone()));
    TestApp { router, store, token, user }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token))
            .header("content-type", "application/json");
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);

        let response = self.router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }
}

fn delivery() -> Value {
    json!({ "address": "12 Marina, Lagos", "phone": "+2348000000000", "receiverName": "Ada" })
}

async fn mount_initialize(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Authorization URL created",
            "data": { "authorization_url": "https://checkout.paystack.com/abc", "access_code": "abc" }
        })))
        .mount(server)
        .await;
}

async fn mount_verify(server: &MockServer, status: &str, amount: i64) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/transaction/verify/ref_\d+_[a-z0-9]{9}$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Verification successful",
            "data": { "reference": "ignored", "status": status, "amount": amount, "currency": "USD" }
        })))
        .mount(server)
        .await;
}

async fn fill_basket(app: &TestApp) {
    app.send("POST", "/basket/items", Some(json!({
        "id": "A", "name": "Vitamin D", "price_ngn": 15000.0, "price_usd": 10.0, "quantity": 2
    }))).await;
    app.send("POST", "/basket/items", Some(json!({
        "id": "B", "name": "Omega 3", "price_ngn": 40000.0, "price_usd": 25.0
    }))).await;
}

#[tokio::test]
async fn basket_totals_follow_currency() {
    let app = test_app(TestConfig::default().to_app_config());
    fill_basket(&app).await;

    let (status, basket) = app.send("GET", "/basket?currency=NGN", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(basket["total"], 70000.0);

    let (_, basket) = app.send("GET", "/basket?currency=USD", None).await;
    assert_eq!(basket["total"], 45.0);

    let (_, basket) = app.send("PUT", "/basket/items/A", Some(json!({ "quantity": 0 }))).await;
    assert_eq!(basket["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn successful_payment_creates_one_order_and_empties_basket() {
    let server = MockServer::start().await;
    mount_initialize(&server).await;
    mount_verify(&server, "success", 4500).await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    fill_basket(&app).await;

    let (status, handoff) = app.send("POST", "/", Some(json!({
        "delivery_info": delivery(),
        "currency": "USD"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(handoff["amount"], 4500);
    assert_eq!(handoff["currency"], "USD");
    assert_eq!(handoff["email"], "buyer@example.com");

    let reference = handoff["reference"].as_str().unwrap().to_string();
    let (status, result) = app.send("POST", "/complete", Some(json!({
        "reference": reference,
        "outcome": "success"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "completed");

    let orders = app.store.rows("purchases");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["payment_status"], "completed");
    assert_eq!(orders[0]["user_id"], app.user.id.as_str());

    let (_, basket) = app.send("GET", "/basket", None).await;
    assert_eq!(basket["items"], json!([]));
    assert_eq!(basket["total"], 0.0);
}

#[tokio::test]
async fn closed_modal_keeps_basket() {
    let server = MockServer::start().await;
    mount_initialize(&server).await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    fill_basket(&app).await;

    let (_, handoff) = app.send("POST", "/", Some(json!({ "delivery_info": delivery() }))).await;
    let (status, result) = app.send("POST", "/complete", Some(json!({
        "reference": handoff["reference"],
        "outcome": "closed"
    }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "cancelled");
    assert!(app.store.rows("purchases").is_empty());

    let (_, basket) = app.send("GET", "/basket?currency=NGN", None).await;
    assert_eq!(basket["total"], 70000.0);
}

#[tokio::test]
async fn empty_basket_is_rejected_without_provider_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    let (status, body) = app.send("POST", "/", Some(json!({ "delivery_info": delivery() }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Your basket is empty");
}

#[tokio::test]
async fn missing_payment_keys_is_configuration_error() {
    let mut config = TestConfig::default().to_app_config();
    config.paystack_secret_key.clear();
    let app = test_app(config);
    fill_basket(&app).await;

    let (status, _) = app.send("POST", "/", Some(json!({ "delivery_info": delivery() }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn provider_outage_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    fill_basket(&app).await;

    let (status, _) = app.send("POST", "/", Some(json!({ "delivery_info": delivery() }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, basket) = app.send("GET", "/basket?currency=NGN", None).await;
    assert_eq!(basket["total"], 70000.0);
}

#[tokio::test]
async fn basket_requires_authentication() {
    let app = test_app(TestConfig::default().to_app_config());
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/basket").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn payment_verify_passes_through_status() {
    let server = MockServer::start().await;
    mount_verify(&server, "failed", 4500).await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let user = TestUser::default();
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));
    let router = payment_routes_with_state(build_state(config, Arc::new(InMemoryStore::new())));

    let response = router
        .oneshot(
            Request::builder()
                .uri("/verify/ref_1700000000000_abcdefghi")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], false);
    assert_eq!(json["data"]["status"], "failed");
}

#[tokio::test]
async fn paying_an_earlier_checkout_still_records_the_order() {
    let server = MockServer::start().await;
    mount_initialize(&server).await;
    mount_verify(&server, "success", 4500).await;

    let app = test_app(TestConfig::with_mock_server(&server.uri()).to_app_config());
    fill_basket(&app).await;

    let checkout = json!({ "delivery_info": delivery(), "currency": "USD" });
    let (_, first) = app.send("POST", "/", Some(checkout.clone())).await;
    let (_, second) = app.send("POST", "/", Some(checkout)).await;

    let (_, basket) = app.send("GET", "/basket", None).await;
    assert_eq!(basket["pending_references"].as_array().map(Vec::len), Some(2));

    let (status, result) = app.send("POST", "/complete", Some(json!({
        "reference": first["reference"],
        "outcome": "success"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "completed");
    assert_eq!(app.store.rows("purchases").len(), 1);

    let (_, basket) = app.send("GET", "/basket", None).await;
    assert_eq!(basket["pending_references"], json!([second["reference"]]));
}
