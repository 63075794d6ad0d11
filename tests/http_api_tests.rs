#![cfg(feature = "http_api")]

use std::sync::Arc;

use axum::{
    Router,
    body::{self, Body},
    http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use day_planner::{DayPlanner, FixedClock, MemoryBlobStore, Task, http_api};
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn new_router() -> Router {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap());
    let store: http_api::SharedBlobStore = Box::new(MemoryBlobStore::new());
    let planner = DayPlanner::open(store, Arc::new(clock));
    http_api::router(http_api::AppState::new(planner))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create(app: &Router, body: Value) -> Task {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/tasks", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    serde_json::from_value(read_json(response).await).unwrap()
}

#[tokio::test]
async fn task_lifecycle_via_http_api() {
    let app = new_router();
    let task = create(
        &app,
        json!({"title": "HTTP Demo", "startTime": "09:00", "endTime": "10:00", "priority": "high"}),
    )
    .await;
    assert_eq!(task.start_time.to_string(), "09:00");

    // Fetch
    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/tasks/{}", task.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Task = serde_json::from_value(read_json(response).await).unwrap();
    assert_eq!(fetched.title, "HTTP Demo");

    // Patch
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/tasks/{}", task.id),
            json!({"title": "Renamed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["title"], "Renamed");

    // Toggle
    let response = app
        .clone()
        .oneshot(empty_request("POST", &format!("/tasks/{}/toggle", task.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["completed"], true);

    // Delete twice
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/tasks/{}", task.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/tasks/{}", task.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn overlapping_create_returns_conflict() {
    let app = new_router();
    create(
        &app,
        json!({"title": "First", "startTime": "09:00", "endTime": "10:00"}),
    )
    .await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/tasks",
            json!({"title": "Second", "startTime": "09:30", "endTime": "09:45"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["error"], "conflict");
    assert_eq!(
        body["message"],
        "This time slot conflicts with an existing task"
    );
}

#[tokio::test]
async fn invalid_times_are_bad_requests() {
    let app = new_router();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/tasks",
            json!({"title": "Backwards", "startTime": "11:00", "endTime": "10:00"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn listing_is_scoped_to_date_and_filters() {
    let app = new_router();
    create(
        &app,
        json!({"title": "Monday", "startTime": "09:00", "endTime": "10:00", "priority": "low"}),
    )
    .await;
    create(
        &app,
        json!({"title": "Tuesday", "startTime": "09:00", "endTime": "10:00", "date": "2025-06-03"}),
    )
    .await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/tasks?date=2025-06-02"))
        .await
        .unwrap();
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Monday");

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/tasks?date=2025-06-02&priority=high"))
        .await
        .unwrap();
    assert_eq!(read_json(response).await, json!([]));

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/tasks?date=2025-06-03&search=TUES"))
        .await
        .unwrap();
    assert_eq!(read_json(response).await[0]["title"], "Tuesday");

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/tasks?priority=urgent"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn move_endpoint_snaps_and_detects_conflicts() {
    let app = new_router();
    let focus = create(
        &app,
        json!({"title": "Focus", "startTime": "09:00", "endTime": "10:00"}),
    )
    .await;
    create(
        &app,
        json!({"title": "Meeting", "startTime": "12:00", "endTime": "13:00"}),
    )
    .await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/tasks/{}/move", focus.id),
            json!({"delta_px": 100}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["startTime"], "11:00");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/tasks/{}/move", focus.id),
            json!({"delta_px": 60}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        read_json(response).await["message"],
        "Cannot move task - time conflict detected"
    );
}

#[tokio::test]
async fn move_by_an_enormous_delta_is_a_bad_request() {
    let app = new_router();
    let focus = create(
        &app,
        json!({"title": "Focus", "startTime": "09:00", "endTime": "10:00"}),
    )
    .await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/tasks/{}/move", focus.id),
            json!({"delta_px": i64::MAX}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await["message"],
        "Cannot move task past the end of the day"
    );

    let response = app
        .clone()
        .oneshot(empty_request("GET", &format!("/tasks/{}", focus.id)))
        .await
        .unwrap();
    assert_eq!(read_json(response).await["startTime"], "09:00");
}

#[tokio::test]
async fn reopening_into_a_taken_slot_returns_conflict() {
    let app = new_router();
    let gym = create(
        &app,
        json!({"title": "Gym", "startTime": "09:00", "endTime": "10:00"}),
    )
    .await;
    let toggle = format!("/tasks/{}/toggle", gym.id);
    let response = app
        .clone()
        .oneshot(empty_request("POST", &toggle))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    create(
        &app,
        json!({"title": "Call", "startTime": "09:00", "endTime": "10:00"}),
    )
    .await;

    let response = app
        .clone()
        .oneshot(empty_request("POST", &toggle))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(read_json(response).await["error"], "conflict");
}

#[tokio::test]
async fn export_import_and_summary() {
    let app = new_router();
    create(
        &app,
        json!({"title": "Export me", "startTime": "09:00", "endTime": "10:30"}),
    )
    .await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("day-planner-tasks-2025-06-02.json"));
    let exported = read_json(response).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/import", json!("not an array")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/import", exported))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["imported"], 1);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/summary?date=2025-06-02"))
        .await
        .unwrap();
    let summary = read_json(response).await;
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["scheduled_minutes"], 90);
}
