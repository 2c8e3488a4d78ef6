// tests/api.rs

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use leetqode_lib::api;
use leetqode_lib::database;
use leetqode_lib::models::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let conn = database::open_in_memory().unwrap();
    database::init_db(&conn, true).unwrap();
    api::router(Arc::new(AppState::new(conn)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

#[tokio::test]
async fn health_check() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn lists_and_filters_the_catalog() {
    let app = app();
    let (status, body) = send(&app, "GET", "/problems", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 100);

    let (status, body) = send(&app, "GET", "/problems?difficulty=Hard&tags=Linked%20List,Trie", None).await;
    assert_eq!(status, StatusCode::OK);
    let hard = body.as_array().unwrap();
    assert!(!hard.is_empty());
    for p in hard {
        assert_eq!(p["difficulty"], "Hard");
        let tags = p["tags"].as_array().unwrap();
        assert!(tags.contains(&json!("Linked List")) || tags.contains(&json!("Trie")));
    }

    let (status, body) = send(&app, "GET", "/problems?difficulty=Brutal", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");
}

#[tokio::test]
async fn repeated_tag_keys_are_accepted() {
    let app = app();
    let (status, body) = send(&app, "GET", "/problems?tags=Array&tags=Trie", None).await;
    assert_eq!(status, StatusCode::OK);
    let problems = body.as_array().unwrap();
    assert!(!problems.is_empty());
    assert!(problems.len() < 100);
    for p in problems {
        let tags = p["tags"].as_array().unwrap();
        assert!(tags.contains(&json!("Array")) || tags.contains(&json!("Trie")));
    }
    assert!(problems
        .iter()
        .any(|p| p["tags"].as_array().unwrap().contains(&json!("Trie"))));
}

#[tokio::test]
async fn malformed_paths_and_queries_get_json_errors() {
    let app = app();

    for uri in [
        "/users/abc/stats",
        "/users/abc/problems",
        "/users/1/problems/xyz/attempts",
    ] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"], "InvalidRequest", "{}", uri);
        assert!(body["message"].is_string(), "{}", uri);
    }

    let (status, body) = send(&app, "POST", "/users/1/problems/xyz/outcome", Some(json!({"outcome": "Solved"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");

    let (status, body) = send(&app, "GET", "/users/1/problems?confidence=high", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");
}

#[tokio::test]
async fn track_report_and_read_back() {
    let app = app();

    let (status, record) = send(&app, "POST", "/users/7/problems", Some(json!({"problem_id": 1}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["confidence"], 0);
    assert_eq!(record["attempts_count"], 0);
    assert_eq!(record["last_outcome"], Value::Null);
    let id = record["id"].as_i64().unwrap();

    // Fresh records show up on the dashboard right away.
    let (status, dash) = send(&app, "GET", "/users/7/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["total_due"], 1);
    assert_eq!(dash["due_today"][0]["problem"]["title"], "Two Sum");

    let uri = format!("/users/7/problems/{}/outcome", id);
    let (status, record) = send(&app, "POST", &uri, Some(json!({"outcome": "Solved"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["confidence"], 20);
    assert_eq!(record["attempts_count"], 1);
    assert_eq!(record["interval_days"], 1);
    assert_eq!(record["last_outcome"], "Solved");

    let (_, dash) = send(&app, "GET", "/users/7/dashboard", None).await;
    assert_eq!(dash["total_due"], 0);

    let (status, stats) = send(&app, "GET", "/users/7/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_problems"], 1);
    assert_eq!(stats["solved_problems"], 1);
    assert_eq!(stats["average_confidence"], 20.0);
    assert_eq!(stats["difficulty_breakdown"], json!({"Easy": 1, "Medium": 0, "Hard": 0}));

    let uri = format!("/users/7/problems/{}/attempts", id);
    let (status, history) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["confidence_before"], 0);
    assert_eq!(history[0]["confidence_after"], 20);
}

#[tokio::test]
async fn error_statuses_follow_the_taxonomy() {
    let app = app();

    let (status, body) = send(&app, "POST", "/users/1/problems", Some(json!({"problem_id": 5000}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ProblemNotFound");

    let (status, record) = send(&app, "POST", "/users/1/problems", Some(json!({"problem_id": 2}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = record["id"].as_i64().unwrap();

    let (status, body) = send(&app, "POST", "/users/1/problems", Some(json!({"problem_id": 2}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyTracked");

    let uri = format!("/users/1/problems/{}/outcome", id);
    let (status, body) = send(&app, "POST", &uri, Some(json!({"outcome": "Meh"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidOutcome");

    let (status, body) = send(&app, "POST", &uri, Some(json!({"outcome": 5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidOutcome");

    let (status, body) = send(&app, "POST", &uri, Some(json!({"result": "Solved"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");

    // Another user's record id is not visible.
    let uri = format!("/users/2/problems/{}/outcome", id);
    let (status, body) = send(&app, "POST", &uri, Some(json!({"outcome": "Solved"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");

    // Failed calls did not touch the record.
    let (_, list) = send(&app, "GET", "/users/1/problems", None).await;
    assert_eq!(list[0]["attempts_count"], 0);
}

#[tokio::test]
async fn user_progress_filters() {
    let app = app();
    for pid in [1, 2, 4] {
        send(&app, "POST", "/users/3/problems", Some(json!({"problem_id": pid}))).await;
    }

    let (status, list) = send(&app, "GET", "/users/3/problems?difficulty=Medium", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["problem"]["id"], 2);

    let (_, list) = send(&app, "GET", "/users/3/problems?due_today=true", None).await;
    assert_eq!(list.as_array().unwrap().len(), 3);
    assert!(list.as_array().unwrap().iter().all(|v| v["is_due"] == true));

    let (_, list) = send(&app, "GET", "/users/3/problems?confidence=10", None).await;
    assert!(list.as_array().unwrap().is_empty());

    let (status, body) = send(&app, "GET", "/users/3/problems?confidence=lots", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");
}

#[tokio::test]
async fn empty_user_has_zero_stats() {
    let app = app();
    let (status, stats) = send(&app, "GET", "/users/404/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_problems"], 0);
    assert_eq!(stats["solved_problems"], 0);
    assert_eq!(stats["average_confidence"], 0.0);
    assert_eq!(stats["due_today"], json!([]));
}
