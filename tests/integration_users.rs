mod common;

use axum::http::StatusCode;
use common::{
    authed_delete, authed_get, authed_json, count_audit_entries, create_test_user,
    generate_unique_email, get_auth_token, insert_test_student, response_json, setup_test_app,
};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

#[sqlx::test(migrations = "./migrations")]
async fn test_get_own_profile(pool: PgPool) {
    let email = generate_unique_email();
    let user = create_test_user(&pool, &email, "Testpass123!", "user").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &email, "Testpass123!").await;

    let response = app
        .oneshot(authed_get(&format!("/api/users/{}", user.id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["email"], email);
    assert_eq!(body["student_count"], 0);
    assert!(body.get("password").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_other_profile_as_user_forbidden(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "Testpass123!", "user").await;
    let other = create_test_user(&pool, &generate_unique_email(), "Testpass123!", "user").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &email, "Testpass123!").await;

    let response = app
        .oneshot(authed_get(&format!("/api/users/{}", other.id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = response_json(response).await;
    assert_eq!(body["kind"], "forbidden");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_gets_any_profile_with_student_count(pool: PgPool) {
    let admin_email = generate_unique_email();
    create_test_user(&pool, &admin_email, "Testpass123!", "admin").await;
    let creator = create_test_user(&pool, &generate_unique_email(), "Testpass123!", "user").await;

    insert_test_student(
        &pool,
        "STU-001",
        &generate_unique_email(),
        "active",
        None,
        "Computer Science",
        1,
        Some(creator.id),
    )
    .await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin_email, "Testpass123!").await;

    let response = app
        .oneshot(authed_get(&format!("/api/users/{}", creator.id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["student_count"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_missing_user_not_found(pool: PgPool) {
    let admin_email = generate_unique_email();
    create_test_user(&pool, &admin_email, "Testpass123!", "admin").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin_email, "Testpass123!").await;

    let response = app
        .oneshot(authed_get(&format!("/api/users/{}", Uuid::new_v4()), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_self_update_names_only_ignores_other_fields(pool: PgPool) {
    let email = generate_unique_email();
    let user = create_test_user(&pool, &email, "Testpass123!", "user").await;

    let app = setup_test_app(pool.clone());
    let token = get_auth_token(&app, &email, "Testpass123!").await;

    // role and is_active in a self-update are silently ignored, not rejected
    let response = app
        .oneshot(authed_json(
            "PUT",
            &format!("/api/users/{}", user.id),
            &token,
            &json!({
                "first_name": "Renamed",
                "role": "admin",
                "is_active": false
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["first_name"], "Renamed");
    assert_eq!(body["role"], "user");
    assert_eq!(body["is_active"], true);

    assert_eq!(count_audit_entries(&pool, "UPDATE_USER").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_user_cannot_update_other_account(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "Testpass123!", "user").await;
    let other = create_test_user(&pool, &generate_unique_email(), "Testpass123!", "user").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &email, "Testpass123!").await;

    let response = app
        .oneshot(authed_json(
            "PUT",
            &format!("/api/users/{}", other.id),
            &token,
            &json!({ "first_name": "Hijacked" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_update_role_and_active_flag(pool: PgPool) {
    let admin_email = generate_unique_email();
    create_test_user(&pool, &admin_email, "Testpass123!", "admin").await;
    let target = create_test_user(&pool, &generate_unique_email(), "Testpass123!", "user").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin_email, "Testpass123!").await;

    let response = app
        .oneshot(authed_json(
            "PUT",
            &format!("/api/users/{}", target.id),
            &token,
            &json!({ "role": "admin", "is_active": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["role"], "admin");
    assert_eq!(body["is_active"], false);
    // untouched fields keep their values
    assert_eq!(body["email"], target.email);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_update_email_conflict(pool: PgPool) {
    let admin_email = generate_unique_email();
    create_test_user(&pool, &admin_email, "Testpass123!", "admin").await;
    let taken_email = generate_unique_email();
    create_test_user(&pool, &taken_email, "Testpass123!", "user").await;
    let target = create_test_user(&pool, &generate_unique_email(), "Testpass123!", "user").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin_email, "Testpass123!").await;

    let response = app
        .oneshot(authed_json(
            "PUT",
            &format!("/api/users/{}", target.id),
            &token,
            &json!({ "email": taken_email }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = response_json(response).await;
    assert_eq!(body["kind"], "conflict");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_update_password_rehashes(pool: PgPool) {
    let admin_email = generate_unique_email();
    create_test_user(&pool, &admin_email, "Testpass123!", "admin").await;
    let target = create_test_user(&pool, &generate_unique_email(), "Testpass123!", "user").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin_email, "Testpass123!").await;

    let response = app
        .clone()
        .oneshot(authed_json(
            "PUT",
            &format!("/api/users/{}", target.id),
            &token,
            &json!({ "password": "N3w!secret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // old password no longer works
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            serde_json::to_string(&json!({
                "email": target.email,
                "password": "Testpass123!"
            }))
            .unwrap(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // the new one does
    let token = get_auth_token(&app, &target.email, "N3w!secret").await;
    assert!(!token.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_user_as_non_admin_forbidden(pool: PgPool) {
    let email = generate_unique_email();
    create_test_user(&pool, &email, "Testpass123!", "user").await;
    let other = create_test_user(&pool, &generate_unique_email(), "Testpass123!", "user").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &email, "Testpass123!").await;

    let response = app
        .oneshot(authed_delete(&format!("/api/users/{}", other.id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = response_json(response).await;
    assert_eq!(body["kind"], "forbidden");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_cannot_delete_own_account(pool: PgPool) {
    let admin_email = generate_unique_email();
    let admin = create_test_user(&pool, &admin_email, "Testpass123!", "admin").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &admin_email, "Testpass123!").await;

    let response = app
        .oneshot(authed_delete(&format!("/api/users/{}", admin.id), &token))
        .await
        .unwrap();

    // self-deletion is a bad request, not a permission failure; the kind
    // distinguishes the two rejection paths
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["kind"], "bad_request");
    assert_eq!(body["error"], "Cannot delete your own account");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_delete_user_then_not_found(pool: PgPool) {
    let admin_email = generate_unique_email();
    create_test_user(&pool, &admin_email, "Testpass123!", "admin").await;
    let target = create_test_user(&pool, &generate_unique_email(), "Testpass123!", "user").await;

    let app = setup_test_app(pool.clone());
    let token = get_auth_token(&app, &admin_email, "Testpass123!").await;

    let response = app
        .clone()
        .oneshot(authed_delete(&format!("/api/users/{}", target.id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(count_audit_entries(&pool, "DELETE_USER").await, 1);

    // deletion is idempotent in effect but not in response kind
    let response = app
        .oneshot(authed_delete(&format!("/api/users/{}", target.id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleting_user_leaves_students_dangling(pool: PgPool) {
    let admin_email = generate_unique_email();
    create_test_user(&pool, &admin_email, "Testpass123!", "admin").await;
    let creator = create_test_user(&pool, &generate_unique_email(), "Testpass123!", "user").await;

    let student_id = insert_test_student(
        &pool,
        "STU-777",
        &generate_unique_email(),
        "active",
        None,
        "Mathematics",
        3,
        Some(creator.id),
    )
    .await;

    let app = setup_test_app(pool.clone());
    let token = get_auth_token(&app, &admin_email, "Testpass123!").await;

    let response = app
        .oneshot(authed_delete(&format!("/api/users/{}", creator.id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // the student survives with a dangling weak reference
    let created_by: Option<Uuid> =
        sqlx::query_scalar("SELECT created_by_id FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(created_by, None);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_empty_self_patch_changes_nothing(pool: PgPool) {
    let email = generate_unique_email();
    let user = create_test_user(&pool, &email, "Testpass123!", "user").await;

    let app = setup_test_app(pool);
    let token = get_auth_token(&app, &email, "Testpass123!").await;

    let response = app
        .oneshot(authed_json(
            "PUT",
            &format!("/api/users/{}", user.id),
            &token,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["first_name"], "Test");
    assert_eq!(body["last_name"], "User");
    assert_eq!(body["email"], email);
}
