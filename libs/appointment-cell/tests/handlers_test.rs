use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    app: Router,
    mock_server: MockServer,
    config: TestConfig,
}

impl TestApp {
    async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let config = TestConfig::with_supabase_url(&mock_server.uri());
        let app = appointment_routes(config.to_arc());
        Self { app, mock_server, config }
    }

    fn token_for(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, Some(1))
    }

    async fn mock_profile(&self, user: &TestUser, display_name: Option<&str>) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("uid", format!("eq.{}", user.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                MockSupabaseResponses::user_profile_response(&user.id, &user.role, display_name)
            ])))
            .mount(&self.mock_server)
            .await;
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_routes_require_a_token() {
    let test_app = TestApp::new().await;

    let request = Request::builder()
        .uri("/availability?date=2030-06-12")
        .body(Body::empty())
        .unwrap();
    let (status, _) = test_app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = TestUser::client("client@example.com");
    let expired = JwtTestUtils::create_expired_token(&user, &test_app.config.jwt_secret);
    let (status, _) = test_app.send(get("/availability?date=2030-06-12", &expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_availability_endpoint() {
    let test_app = TestApp::new().await;
    let user = TestUser::client("client@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("date", "eq.2030-06-12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "time": "09:00:00" }])))
        .mount(&test_app.mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_off_days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&test_app.mock_server)
        .await;

    let (status, body) = test_app
        .send(get("/availability?date=2030-06-12", &test_app.token_for(&user)))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["availability"]["taken_slots"], json!(["09:00"]));
    assert_eq!(body["availability"]["is_holiday"], false);
}

#[tokio::test]
async fn test_availability_rejects_bad_date() {
    let test_app = TestApp::new().await;
    let user = TestUser::client("client@example.com");

    let (status, body) = test_app
        .send(get("/availability?date=12-06-2030", &test_app.token_for(&user)))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid date format (YYYY-MM-DD)");
}

#[tokio::test]
async fn test_booking_too_far_ahead_is_rejected() {
    let test_app = TestApp::new().await;
    let user = TestUser::client("client@example.com");

    let request = send_json("POST", "/", &test_app.token_for(&user), json!({
        "service_type": "General Checkup",
        "date": "2099-01-01",
        "time": "09:00"
    }));
    let (status, body) = test_app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Appointments cannot be booked more than 2 weeks in advance.");
}

#[tokio::test]
async fn test_booking_success() {
    let test_app = TestApp::new().await;
    let user = TestUser::client("client@example.com");
    let date = (Utc::now().date_naive() + Duration::days(3)).to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("date", format!("eq.{}", date)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&test_app.mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(&user.id, &date, "09:00:00", "pending")
        ])))
        .expect(1)
        .mount(&test_app.mock_server)
        .await;

    let request = send_json("POST", "/", &test_app.token_for(&user), json!({
        "service_type": "General Checkup",
        "date": date,
        "time": "09:00"
    }));
    let (status, body) = test_app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["status"], "pending");
    assert_eq!(body["appointment"]["time"], "09:00");
}

#[tokio::test]
async fn test_booking_conflict_returns_409() {
    let test_app = TestApp::new().await;
    let user = TestUser::client("client@example.com");
    let date = (Utc::now().date_naive() + Duration::days(3)).to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "time": "09:00" }])))
        .mount(&test_app.mock_server)
        .await;

    let request = send_json("POST", "/", &test_app.token_for(&user), json!({
        "service_type": "General Checkup",
        "date": date,
        "time": "09:00"
    }));
    let (status, body) = test_app.send(request).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Selected time slot is no longer available.");
}

#[tokio::test]
async fn test_schedule_is_staff_only() {
    let test_app = TestApp::new().await;
    let client = TestUser::client("client@example.com");
    test_app.mock_profile(&client, Some("Grace")).await;

    let (status, body) = test_app.send(get("/schedule", &test_app.token_for(&client))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized: Staff access required");
}

#[tokio::test]
async fn test_staff_sets_status() {
    let test_app = TestApp::new().await;
    let desk = TestUser::front_desk("desk@example.com");
    test_app.mock_profile(&desk, Some("Front Desk")).await;
    let id = Uuid::new_v4();

    let mut row = MockSupabaseResponses::appointment_response("p1", "2030-06-12", "09:00", "confirmed");
    row["id"] = json!(id);
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&test_app.mock_server)
        .await;

    let request = send_json(
        "PATCH",
        &format!("/{}/status", id),
        &test_app.token_for(&desk),
        json!({ "status": "confirmed" }),
    );
    let (status, body) = test_app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "confirmed");
}
