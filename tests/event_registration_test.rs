//! Integration tests for event registration, capacity and duplicates

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{Value, json};

async fn add_event(app: &TestApp, admin: &str, body: Value) -> i64 {
    let (status, body) = app.post("/api/admin/add_event", Some(admin), body).await;
    assert_eq!(status, StatusCode::CREATED, "add event failed: {}", body);
    body["resp_data"]["id"].as_i64().unwrap()
}

async fn participants(app: &TestApp, event_id: i64) -> i64 {
    let (_, body) = app.get(&format!("/api/movie/event/{}", event_id), None).await;
    body["resp_data"]["event"]["current_participants"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn test_full_event_rejects_registration() {
    let app = TestApp::new().await;
    let admin = app.admin("organizer").await;
    let event_id = add_event(
        &app,
        &admin,
        json!({ "title": "小型放映会", "max_participants": 1, "event_date": "2030-05-01T19:30" }),
    )
    .await;

    let alice = app.member("alice").await;
    let bob = app.member("bob").await;
    let uri = format!("/api/movie/event/{}", event_id);

    let (status, body) = app.post(&uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(participants(&app, event_id).await, 1);

    let (status, body) = app.post(&uri, Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["msg"], "活动报名已满");
    assert_eq!(participants(&app, event_id).await, 1);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM event_registrations")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin("organizer").await;
    let event_id = add_event(&app, &admin, json!({ "title": "影评沙龙" })).await;
    let alice = app.member("alice").await;
    let uri = format!("/api/movie/event/{}", event_id);

    let (status, _) = app.post(&uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post(&uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["msg"], "您已经报名参加这个活动了");
    assert_eq!(participants(&app, event_id).await, 1);

    let (_, detail) = app.get(&uri, None).await;
    let list = detail["resp_data"]["participants"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["username"], "alice");
}

#[tokio::test]
async fn test_closed_events_reject_registration() {
    let app = TestApp::new().await;
    let admin = app.admin("organizer").await;
    let event_id = add_event(&app, &admin, json!({ "title": "露天电影" })).await;

    let (status, body) = app
        .post(
            &format!("/api/admin/event_status/{}", event_id),
            Some(&admin),
            json!({ "status": "cancelled" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["status"], "cancelled");

    let alice = app.member("alice").await;
    let (status, _) = app
        .post(&format!("/api/movie/event/{}", event_id), Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(participants(&app, event_id).await, 0);

    let (_, body) = app.get("/api/movie/events", None).await;
    assert!(body["resp_data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_event_capacity_defaults_and_validation() {
    let app = TestApp::new().await;
    let admin = app.admin("organizer").await;

    let (status, body) = app
        .post("/api/admin/add_event", Some(&admin), json!({ "title": "默认容量" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["resp_data"]["max_participants"], 50);
    assert_eq!(body["resp_data"]["current_participants"], 0);
    assert_eq!(body["resp_data"]["status"], "upcoming");

    let (status, _) = app
        .post(
            "/api/admin/add_event",
            Some(&admin),
            json!({ "title": "零容量", "max_participants": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/admin/add_event",
            Some(&admin),
            json!({ "title": "错误时间", "event_date": "下周五" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/admin/add_event",
            Some(&admin),
            json!({ "title": "不存在的电影", "movie_id": 42 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_detail_includes_linked_movie() {
    let app = TestApp::new().await;
    let admin = app.admin("organizer").await;
    let movie_id = app.add_movie(&admin, json!({ "title": "千与千寻" })).await;
    let event_id = add_event(
        &app,
        &admin,
        json!({ "title": "宫崎骏之夜", "movie_id": movie_id, "location": "放映厅" }),
    )
    .await;

    let (status, body) = app.get(&format!("/api/movie/event/{}", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["movie"]["title"], "千与千寻");

    // 删除电影后活动保留，只解除关联
    app.post(&format!("/api/admin/delete_movie/{}", movie_id), Some(&admin), json!({}))
        .await;
    let (status, body) = app.get(&format!("/api/movie/event/{}", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["resp_data"]["movie"].is_null());
    assert!(body["resp_data"]["event"]["movie_id"].is_null());
}

#[tokio::test]
async fn test_members_cannot_manage_events() {
    let app = TestApp::new().await;
    let alice = app.member("alice").await;

    let (status, body) = app
        .post("/api/admin/add_event", Some(&alice), json!({ "title": "私自加的" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 1003);
}
