use axum::Router;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use rollbook::config::cors::CorsConfig;
use rollbook::config::jwt::JwtConfig;
use rollbook::modules::users::model::UserRole;
use rollbook::router::init_router;
use rollbook::state::AppState;
use rollbook::utils::password::hash_password;

pub fn setup_test_app(pool: PgPool) -> Router {
    dotenvy::dotenv().ok();
    let state = AppState {
        db: pool,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
    };
    init_router(state)
}

#[allow(dead_code)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
}

/// Inserts a user directly. `role` is "admin" or "user".
pub async fn create_test_user(pool: &PgPool, email: &str, password: &str, role: &str) -> TestUser {
    create_test_user_with_active(pool, email, password, role, true).await
}

#[allow(dead_code)]
pub async fn create_test_user_with_active(
    pool: &PgPool,
    email: &str,
    password: &str,
    role: &str,
    is_active: bool,
) -> TestUser {
    let hashed = hash_password(password).unwrap();

    let role = match role {
        "admin" => UserRole::Admin,
        "user" => UserRole::User,
        other => panic!("Invalid role: {}", other),
    };

    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, password, first_name, last_name, role, is_active)
         VALUES ($1, $2, 'Test', 'User', $3, $4)
         RETURNING id",
    )
    .bind(email)
    .bind(&hashed)
    .bind(role)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .unwrap();

    TestUser {
        id,
        email: email.to_string(),
        password: password.to_string(),
    }
}

/// Inserts a student row directly, bypassing the API.
#[allow(dead_code)]
pub async fn insert_test_student(
    pool: &PgPool,
    student_id: &str,
    email: &str,
    status: &str,
    gpa: Option<f64>,
    program: &str,
    year: i32,
    created_by: Option<Uuid>,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO students (student_id, first_name, last_name, email, gender,
             department, program, year, semester, status, gpa, created_by_id)
         VALUES ($1, 'Student', 'Test', $2, 'other', $3, $3, $4, 1, $5::student_status, $6, $7)
         RETURNING id",
    )
    .bind(student_id)
    .bind(email)
    .bind(program)
    .bind(year)
    .bind(status)
    .bind(gpa)
    .bind(created_by)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn get_auth_token(app: &Router, email: &str, password: &str) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&json!({
                "email": email,
                "password": password
            }))
            .unwrap(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let body = response_json(response).await;
    body["access_token"]
        .as_str()
        .expect("login response should contain access_token")
        .to_string()
}

pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

/// A complete, valid student creation payload.
#[allow(dead_code)]
pub fn student_payload(student_id: &str, email: &str) -> serde_json::Value {
    json!({
        "student_id": student_id,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": email,
        "phone": "+212-600-000-000",
        "date_of_birth": "2003-04-15",
        "gender": "female",
        "address": "1 Analytical Engine Way",
        "department": "Engineering",
        "program": "Computer Science",
        "year": 2,
        "semester": 1,
        "enrollment_date": "2023-09-01",
        "gpa": 3.6,
        "status": "active"
    })
}

#[allow(dead_code)]
pub fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn authed_json(method: &str, uri: &str, token: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

#[allow(dead_code)]
pub fn authed_delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Counts audit rows with the given action tag.
#[allow(dead_code)]
pub async fn count_audit_entries(pool: &PgPool, action: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM security_logs WHERE action = $1")
        .bind(action)
        .fetch_one(pool)
        .await
        .unwrap()
}
