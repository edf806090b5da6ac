// End-to-end flows against a real database. Skipped when TEST_DATABASE_URL is unreachable.

mod common;

use axum::http::{header, Method, Request, StatusCode};
use pace::config::{AppConfig, CatalogSeeder};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use serial_test::serial;
use sqlx::PgPool;

use common::{registration, send, send_request, test_config, test_pool};

async fn setup() -> Option<(PgPool, AppConfig)> {
    let pool = test_pool().await?;
    CatalogSeeder::new(pool.clone()).seed_all().await.unwrap();
    Some((pool, test_config()))
}

async fn register(pool: &PgPool, config: &AppConfig) -> (String, Value) {
    let payload = registration();
    let response = send(pool, config, Method::POST, "/api/auth/register", None, Some(payload.clone())).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

    let access = response.body["access"].as_str().unwrap().to_string();
    (access, payload)
}

async fn exercise_id(pool: &PgPool, config: &AppConfig, token: &str, name: &str) -> String {
    let uri = format!("/api/catalog/exercises?search={}", urlencoding::encode(name));
    let response = send(pool, config, Method::GET, &uri, Some(token), None).await;
    assert_eq!(response.status, StatusCode::OK);

    response.body
        .as_array()
        .unwrap()
        .iter()
        .find(|exercise| exercise["name"] == name)
        .and_then(|exercise| exercise["id"].as_str())
        .unwrap()
        .to_string()
}

fn order_of(plan: &Value) -> Vec<(String, i64)> {
    plan["exercises"]
        .as_array()
        .unwrap()
        .iter()
        .map(|exercise| {
            (
                exercise["name"].as_str().unwrap().to_string(),
                exercise["order"].as_i64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
#[serial]
async fn test_register_login_refresh_logout() {
    let Some((pool, config)) = setup().await else {
        return;
    };

    let (access, payload) = register(&pool, &config).await;
    let email = payload["email"].as_str().unwrap();

    let info = send(&pool, &config, Method::GET, "/api/auth/user-info", Some(&access), None).await;
    assert_eq!(info.status, StatusCode::OK);
    assert_eq!(info.body["email"], email);
    assert_eq!(info.body["onboarding_completed"], false);

    // Duplicate email, differently cased
    let mut duplicate = payload.clone();
    duplicate["email"] = json!(email.to_uppercase());
    let response = send(&pool, &config, Method::POST, "/api/auth/register", None, Some(duplicate)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let wrong = send(
        &pool,
        &config,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({ "email": email, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["error"], "Invalid credentials");

    // A username carrying an email logs in by email
    let login = send(
        &pool,
        &config,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({ "username": email, "password": "correct-horse-battery" })),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    let refresh = login.refresh_cookie().unwrap();

    // A blank username falls through to the email
    let blank_username = send(
        &pool,
        &config,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({ "username": "", "email": email, "password": "correct-horse-battery" })),
    )
    .await;
    assert_eq!(blank_username.status, StatusCode::OK);
    assert!(blank_username.body["access"].is_string());

    let cookie_refresh = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/token/refresh")
        .header(header::COOKIE, format!("refresh_token={refresh}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let refreshed = send_request(&pool, &config, cookie_refresh).await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert!(refreshed.body["access"].is_string());

    let onboarding = send(&pool, &config, Method::PATCH, "/api/auth/onboarding/complete", Some(&access), None).await;
    assert_eq!(onboarding.body["message"], "Onboarding marked as completed.");
    let again = send(&pool, &config, Method::PATCH, "/api/auth/onboarding/complete", Some(&access), None).await;
    assert_eq!(again.body["message"], "Onboarding already completed.");

    let logout = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/logout")
        .header(header::COOKIE, format!("refresh_token={refresh}"))
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(send_request(&pool, &config, logout).await.status, StatusCode::OK);

    // Both tokens are dead after logout
    let revoked = send(
        &pool,
        &config,
        Method::POST,
        "/api/auth/token/refresh",
        None,
        Some(json!({ "refresh": refresh })),
    )
    .await;
    assert_eq!(revoked.status, StatusCode::UNAUTHORIZED);

    let blacklisted = send(&pool, &config, Method::GET, "/api/auth/user-info", Some(&access), None).await;
    assert_eq!(blacklisted.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_profile_is_created_with_the_user() {
    let Some((pool, config)) = setup().await else {
        return;
    };
    let (access, _) = register(&pool, &config).await;

    let profile = send(&pool, &config, Method::GET, "/api/profile", Some(&access), None).await;
    assert_eq!(profile.status, StatusCode::OK);

    let updated = send(
        &pool,
        &config,
        Method::PUT,
        "/api/profile/update",
        Some(&access),
        Some(json!({ "height_cm": 180.0, "fitness_level": "intermediate" })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["height_cm"], 180.0);

    // Omitted fields keep their value
    let partial = send(
        &pool,
        &config,
        Method::PUT,
        "/api/profile",
        Some(&access),
        Some(json!({ "weight_kg": 75.5 })),
    )
    .await;
    assert_eq!(partial.body["height_cm"], 180.0);
    assert_eq!(partial.body["weight_kg"], 75.5);

    let invalid = send(
        &pool,
        &config,
        Method::PUT,
        "/api/profile",
        Some(&access),
        Some(json!({ "height_cm": 10.0 })),
    )
    .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_plan_ordering_session_logging_and_streak() {
    let Some((pool, config)) = setup().await else {
        return;
    };
    let (access, _) = register(&pool, &config).await;
    let token = Some(access.as_str());

    let squat = exercise_id(&pool, &config, &access, "Barbell Back Squat").await;
    let push_up = exercise_id(&pool, &config, &access, "Push-up").await;
    let plank = exercise_id(&pool, &config, &access, "Plank").await;

    let created = send(
        &pool,
        &config,
        Method::POST,
        "/api/plans",
        token,
        Some(json!({ "name": "Full body", "difficulty_level": "medium" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let plan_id = created.body["id"].as_str().unwrap().to_string();

    let duplicate = send(&pool, &config, Method::POST, "/api/plans", token, Some(json!({ "name": "Full body" }))).await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    // Appends, then an insert at the front shifts the rest down
    let added = send(
        &pool,
        &config,
        Method::POST,
        &format!("/api/plans/{plan_id}/exercises"),
        token,
        Some(json!({ "exercises": [
            { "exercise_id": squat, "sets": 5, "reps": 5 },
            { "exercise_id": push_up, "sets": 3, "reps": 15 },
            { "exercise_id": plank, "order": 1, "sets": 3 },
        ]})),
    )
    .await;
    assert_eq!(added.status, StatusCode::CREATED, "{}", added.body);

    let plan = send(&pool, &config, Method::GET, &format!("/api/plans/{plan_id}"), token, None).await;
    assert_eq!(
        order_of(&plan.body),
        vec![
            ("Plank".to_string(), 1),
            ("Barbell Back Squat".to_string(), 2),
            ("Push-up".to_string(), 3),
        ]
    );

    let again = send(
        &pool,
        &config,
        Method::POST,
        &format!("/api/plans/{plan_id}/exercises"),
        token,
        Some(json!({ "exercises": [{ "exercise_id": squat }] })),
    )
    .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let moved = send(
        &pool,
        &config,
        Method::PUT,
        &format!("/api/plans/{plan_id}/exercises/{push_up}"),
        token,
        Some(json!({ "order": 1 })),
    )
    .await;
    assert_eq!(moved.status, StatusCode::OK, "{}", moved.body);

    let removed = send(
        &pool,
        &config,
        Method::DELETE,
        &format!("/api/plans/{plan_id}/exercises/{plank}"),
        token,
        None,
    )
    .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);

    let plan = send(&pool, &config, Method::GET, &format!("/api/plans/{plan_id}"), token, None).await;
    assert_eq!(
        order_of(&plan.body),
        vec![("Push-up".to_string(), 1), ("Barbell Back Squat".to_string(), 2)]
    );

    // Sessions
    let missing_plan = send(&pool, &config, Method::POST, "/api/sessions", token, Some(json!({}))).await;
    assert_eq!(missing_plan.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_plan.body["message"], "plan_id is required.");

    let session = send(
        &pool,
        &config,
        Method::POST,
        "/api/sessions",
        token,
        Some(json!({ "plan_id": plan_id, "rest_period_seconds": 90 })),
    )
    .await;
    assert_eq!(session.status, StatusCode::CREATED, "{}", session.body);
    assert_eq!(session.body["plan_name"], "Full body");
    let session_id = session.body["id"].as_str().unwrap().to_string();
    let logs_uri = format!("/api/sessions/{session_id}/logs");

    // Plank left the plan, so the whole batch is rejected
    let outside = send(
        &pool,
        &config,
        Method::POST,
        &logs_uri,
        token,
        Some(json!({ "sets": [
            { "exercise_id": squat, "set_number": 1, "reps_completed": 5 },
            { "exercise_id": plank, "set_number": 1, "duration_seconds": 60 },
        ]})),
    )
    .await;
    assert_eq!(outside.status, StatusCode::BAD_REQUEST);
    let logs = send(&pool, &config, Method::GET, &logs_uri, token, None).await;
    assert_eq!(logs.body, json!([]));

    let first = send(
        &pool,
        &config,
        Method::POST,
        &logs_uri,
        token,
        Some(json!({ "sets": [{ "exercise_id": squat, "set_number": 1, "reps_completed": 5, "score": 80.0 }] })),
    )
    .await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);

    let current = send(&pool, &config, Method::GET, &format!("/api/sessions/{session_id}"), token, None).await;
    assert_eq!(current.body["completed"], false);

    // Repeating a set number updates it; logging the last exercise completes the session
    let second = send(
        &pool,
        &config,
        Method::POST,
        &logs_uri,
        token,
        Some(json!({ "sets": [
            { "exercise_id": squat, "set_number": 1, "reps_completed": 6, "score": 90.0 },
            { "exercise_id": push_up, "set_number": 1, "reps_completed": 15, "score": 70.0 },
        ]})),
    )
    .await;
    assert_eq!(second.status, StatusCode::CREATED, "{}", second.body);

    let current = send(&pool, &config, Method::GET, &format!("/api/sessions/{session_id}"), token, None).await;
    assert_eq!(current.body["completed"], true);
    let logs = current.body["logs"].as_array().unwrap().clone();
    assert_eq!(logs.len(), 2);
    let squat_log = logs.iter().find(|log| log["exercise"] == squat.as_str()).unwrap();
    assert_eq!(squat_log["reps_completed"], 6);

    let streak = send(&pool, &config, Method::GET, "/api/analytics/streak", token, None).await;
    assert_eq!(streak.body["streak_count"], 1);

    // Deleting a log never un-completes the session
    let log_id = squat_log["id"].as_str().unwrap();
    let deleted = send(&pool, &config, Method::DELETE, &format!("{logs_uri}/{log_id}"), token, None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let current = send(&pool, &config, Method::GET, &format!("/api/sessions/{session_id}"), token, None).await;
    assert_eq!(current.body["completed"], true);

    let analytics = send(&pool, &config, Method::GET, "/api/analytics", token, None).await;
    assert_eq!(analytics.status, StatusCode::OK);
    assert_eq!(analytics.body["total_workouts"], 1);
    assert_eq!(analytics.body["average_accuracy"], 70.0);
    assert_eq!(analytics.body["streak"]["streak_count"], 1);

    // Deleting the plan keeps the session
    let deleted_plan = send(&pool, &config, Method::DELETE, &format!("/api/plans/{plan_id}"), token, None).await;
    assert_eq!(deleted_plan.status, StatusCode::NO_CONTENT);
    let orphan = send(&pool, &config, Method::GET, &format!("/api/sessions/{session_id}"), token, None).await;
    assert_eq!(orphan.status, StatusCode::OK);
    assert_eq!(orphan.body["plan"], Value::Null);
}

#[tokio::test]
#[serial]
async fn test_other_users_cannot_see_plans() {
    let Some((pool, config)) = setup().await else {
        return;
    };
    let (owner, _) = register(&pool, &config).await;
    let (stranger, _) = register(&pool, &config).await;

    let created = send(&pool, &config, Method::POST, "/api/plans", Some(&owner), Some(json!({ "name": "Mine" }))).await;
    let plan_id = created.body["id"].as_str().unwrap();

    let response = send(&pool, &config, Method::GET, &format!("/api/plans/{plan_id}"), Some(&stranger), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let session = send(
        &pool,
        &config,
        Method::POST,
        "/api/sessions",
        Some(&stranger),
        Some(json!({ "plan_id": plan_id })),
    )
    .await;
    assert_eq!(session.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_set_log_patch_rules() {
    let Some((pool, config)) = setup().await else {
        return;
    };
    let (access, _) = register(&pool, &config).await;
    let token = Some(access.as_str());

    let squat = exercise_id(&pool, &config, &access, "Barbell Back Squat").await;
    let push_up = exercise_id(&pool, &config, &access, "Push-up").await;
    let plank = exercise_id(&pool, &config, &access, "Plank").await;

    let plan = send(&pool, &config, Method::POST, "/api/plans", token, Some(json!({ "name": "Push and squat" }))).await;
    let plan_id = plan.body["id"].as_str().unwrap().to_string();
    let added = send(
        &pool,
        &config,
        Method::POST,
        &format!("/api/plans/{plan_id}/exercises"),
        token,
        Some(json!({ "exercises": [{ "exercise_id": squat }, { "exercise_id": push_up }] })),
    )
    .await;
    assert_eq!(added.status, StatusCode::CREATED, "{}", added.body);

    let session = send(&pool, &config, Method::POST, "/api/sessions", token, Some(json!({ "plan_id": plan_id }))).await;
    let session_id = session.body["id"].as_str().unwrap().to_string();
    let logs_uri = format!("/api/sessions/{session_id}/logs");

    // The same set twice in one batch is one row, echoed once per submission
    let logged = send(
        &pool,
        &config,
        Method::POST,
        &logs_uri,
        token,
        Some(json!({ "sets": [
            { "exercise_id": squat, "set_number": 1, "reps_completed": 5 },
            { "exercise_id": squat, "set_number": 2, "reps_completed": 5 },
            { "exercise_id": squat, "set_number": 1, "reps_completed": 4 },
        ]})),
    )
    .await;
    assert_eq!(logged.status, StatusCode::CREATED, "{}", logged.body);
    let items = logged.body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["id"], items[2]["id"]);
    assert_eq!(items[2]["reps_completed"], 4);
    let second_set = items[1]["id"].as_str().unwrap().to_string();
    let second_uri = format!("{logs_uri}/{second_set}");

    let collision = send(&pool, &config, Method::PATCH, &second_uri, token, Some(json!({ "set_number": 1 }))).await;
    assert_eq!(collision.status, StatusCode::CONFLICT);
    assert_eq!(collision.body["error"], "CONFLICT");

    let outside = send(&pool, &config, Method::PATCH, &second_uri, token, Some(json!({ "exercise": plank }))).await;
    assert_eq!(outside.status, StatusCode::BAD_REQUEST);

    let current = send(&pool, &config, Method::GET, &format!("/api/sessions/{session_id}"), token, None).await;
    assert_eq!(current.body["completed"], false);

    // Moving the set onto the remaining exercise covers the whole plan
    let moved = send(
        &pool,
        &config,
        Method::PATCH,
        &second_uri,
        token,
        Some(json!({ "exercise": push_up, "set_number": 1, "reps_completed": 12 })),
    )
    .await;
    assert_eq!(moved.status, StatusCode::OK, "{}", moved.body);
    assert_eq!(moved.body["exercise"], push_up.as_str());
    assert_eq!(moved.body["reps_completed"], 12);

    let current = send(&pool, &config, Method::GET, &format!("/api/sessions/{session_id}"), token, None).await;
    assert_eq!(current.body["completed"], true);
    assert_eq!(current.body["logs"].as_array().unwrap().len(), 2);
}
