//! Integration tests for friendships, logs and friend spaces

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_friend_space_hides_invisible_logs() {
    let app = TestApp::new().await;
    let alice = app.member("alice").await;
    let bob = app.member("bob").await;
    let alice_id = app.user_id("alice").await;

    let (status, _) = app
        .post(
            "/api/user/log",
            Some(&alice),
            json!({ "content": "只给自己看", "visible": false }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // bob 与 alice 不是好友，空间只按可见性过滤
    let uri = format!("/api/user/friend_space/{}", alice_id);
    let (status, body) = app.get(&uri, Some(&bob)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["friend"]["username"], "alice");
    assert!(body["resp_data"]["logs"].as_array().unwrap().is_empty());

    app.post("/api/user/log", Some(&alice), json!({ "content": "今天看了三部电影" }))
        .await;
    let (_, body) = app.get(&uri, Some(&bob)).await;
    let logs = body["resp_data"]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["content"], "今天看了三部电影");

    // 自己的日志列表包含不可见的
    let (_, body) = app.get("/api/user/logs", Some(&alice)).await;
    let own = body["resp_data"].as_array().unwrap();
    assert_eq!(own.len(), 2);
    assert_eq!(own[0]["content"], "今天看了三部电影");
    assert_eq!(own[1]["visible"], false);
}

#[tokio::test]
async fn test_friend_space_requires_login() {
    let app = TestApp::new().await;
    app.member("alice").await;
    let alice_id = app.user_id("alice").await;

    let (status, _) = app
        .get(&format!("/api/user/friend_space/{}", alice_id), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bob = app.member("bob").await;
    let (status, body) = app.get("/api/user/friend_space/9999", Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "好友不存在");
}

#[tokio::test]
async fn test_adding_friend_twice_keeps_one_edge() {
    let app = TestApp::new().await;
    let alice = app.member("alice").await;
    app.member("bob").await;

    let (status, body) = app
        .post("/api/user/friends", Some(&alice), json!({ "friend_name": "bob" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "添加好友成功");
    assert_eq!(body["resp_data"]["username"], "bob");

    let (status, body) = app
        .post("/api/user/friends", Some(&alice), json!({ "friend_name": "bob" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "已经是好友了");
    assert!(body["resp_data"].is_null());

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM friendships")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let (_, body) = app.get("/api/user/friends", Some(&alice)).await;
    assert_eq!(body["resp_data"].as_array().unwrap().len(), 1);

    // 单向关系：bob 的好友列表为空
    let bob = app.login("bob", common::PASSWORD).await;
    let (_, body) = app.get("/api/user/friends", Some(&bob)).await;
    assert!(body["resp_data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_friend_requests() {
    let app = TestApp::new().await;
    let alice = app.member("alice").await;

    let (status, _) = app
        .post("/api/user/friends", Some(&alice), json!({ "friend_name": "alice" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/user/friends", Some(&alice), json!({ "friend_name": "ghost" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/user/friends", Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_friend() {
    let app = TestApp::new().await;
    let alice = app.member("alice").await;
    app.member("bob").await;

    let (_, body) = app
        .json("DELETE", "/api/user/friends", Some(&alice), Some(json!({ "friend_name": "bob" })))
        .await;
    assert_eq!(body["msg"], "未找到好友关系");

    app.post("/api/user/friends", Some(&alice), json!({ "friend_name": "bob" }))
        .await;
    let (status, body) = app
        .json("DELETE", "/api/user/friends", Some(&alice), Some(json!({ "friend_name": "bob" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "删除好友成功");

    let (_, body) = app.get("/api/user/friends", Some(&alice)).await;
    assert!(body["resp_data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_user_list_marks_friends() {
    let app = TestApp::new().await;
    let alice = app.member("alice").await;
    app.member("bob").await;
    app.member("carol").await;
    app.post("/api/user/friends", Some(&alice), json!({ "friend_name": "carol" }))
        .await;

    let (_, body) = app.get("/api/user/users", Some(&alice)).await;
    let users = body["resp_data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    let carol = users.iter().find(|u| u["username"] == "carol").unwrap();
    let bob = users.iter().find(|u| u["username"] == "bob").unwrap();
    assert_eq!(carol["is_friend"], true);
    assert_eq!(bob["is_friend"], false);
    // 没有昵称时显示用户名
    assert_eq!(bob["nickname"], "bob");
}
