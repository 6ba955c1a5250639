//! Integration tests for the membership application workflow

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{Value, json};

async fn apply(app: &TestApp, username: &str) -> i64 {
    let (status, body) = app
        .post(
            "/api/apply",
            None,
            json!({
                "username": username,
                "realname": "张三",
                "reason": "喜欢看电影",
                "favorite_movies": "霸王别姬",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "apply failed: {}", body);
    assert_eq!(body["resp_data"]["status"], "pending");
    body["resp_data"]["id"].as_i64().unwrap()
}

async fn review(app: &TestApp, admin: &str, id: i64, action: &str) -> (StatusCode, Value) {
    app.post(
        "/api/admin/approve_application",
        Some(admin),
        json!({ "application_id": id, "action": action }),
    )
    .await
}

async fn users_named(app: &TestApp, username: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?1")
        .bind(username)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    count
}

#[tokio::test]
async fn test_approval_creates_exactly_one_member() {
    let app = TestApp::new().await;
    let admin = app.admin("reviewer").await;
    let id = apply(&app, "newbie").await;

    let (status, body) = review(&app, &admin, id, "approve").await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["resp_data"]["outcome"], "approved");
    assert_eq!(body["resp_data"]["application"]["status"], "approved");
    assert!(!body["resp_data"]["application"]["reviewed_at"].is_null());
    assert_eq!(body["resp_data"]["account"]["username"], "newbie");
    assert!(!body["resp_data"]["account"]["setup_token"]
        .as_str()
        .unwrap()
        .is_empty());

    assert_eq!(users_named(&app, "newbie").await, 1);
    let (role,): (String,) = sqlx::query_as("SELECT role FROM users WHERE username = 'newbie'")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(role, "member");

    // 重复审核不产生任何变化
    let (status, body) = review(&app, &admin, id, "approve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["outcome"], "already_resolved");
    assert!(body["resp_data"].get("account").is_none());
    assert_eq!(users_named(&app, "newbie").await, 1);

    let (_, body) = review(&app, &admin, id, "reject").await;
    assert_eq!(body["resp_data"]["outcome"], "already_resolved");
    assert_eq!(body["resp_data"]["application"]["status"], "approved");
}

#[tokio::test]
async fn test_setup_token_activates_account() {
    let app = TestApp::new().await;
    let admin = app.admin("reviewer").await;
    let id = apply(&app, "newbie").await;
    let (_, body) = review(&app, &admin, id, "approve").await;
    let token = body["resp_data"]["account"]["setup_token"]
        .as_str()
        .unwrap()
        .to_string();

    // 激活前无法登录
    let (status, body) = app
        .post(
            "/api/user/login",
            None,
            json!({ "username": "newbie", "password": "123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", body);

    let (status, _) = app
        .post(
            "/api/user/activate",
            None,
            json!({ "username": "newbie", "setup_token": "wrong", "new_password": "brandnew" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/api/user/activate",
            None,
            json!({ "username": "newbie", "setup_token": token, "new_password": "brandnew" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let session = app.login("newbie", "brandnew").await;
    let (status, body) = app.get("/api/user/profile", Some(&session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["username"], "newbie");
    assert_eq!(body["resp_data"]["nickname"], "张三");

    // 激活码只能使用一次
    let (status, _) = app
        .post(
            "/api/user/activate",
            None,
            json!({ "username": "newbie", "setup_token": token, "new_password": "another1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejection_creates_no_account() {
    let app = TestApp::new().await;
    let admin = app.admin("reviewer").await;
    let id = apply(&app, "maybe").await;

    let (status, body) = review(&app, &admin, id, "reject").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["outcome"], "rejected");
    assert_eq!(users_named(&app, "maybe").await, 0);

    let (_, body) = review(&app, &admin, id, "approve").await;
    assert_eq!(body["resp_data"]["outcome"], "already_resolved");
    assert_eq!(users_named(&app, "maybe").await, 0);
}

#[tokio::test]
async fn test_application_validation() {
    let app = TestApp::new().await;
    app.member("taken").await;

    let (status, _) = app
        .post("/api/apply", None, json!({ "username": "someone" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/apply", None, json!({ "username": "taken", "reason": "想加入" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    apply(&app, "twice").await;
    let (status, _) = app
        .post("/api/apply", None, json!({ "username": "twice", "reason": "再申请一次" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_only_admins_review_applications() {
    let app = TestApp::new().await;
    let member = app.member("alice").await;
    let id = apply(&app, "newbie").await;

    let (status, _) = review(&app, &member, id, "approve").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/admin/applications", Some(&member)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(users_named(&app, "newbie").await, 0);

    let admin = app.admin("reviewer").await;
    let (_, body) = app
        .get("/api/admin/applications?status=pending", Some(&admin))
        .await;
    assert_eq!(body["resp_data"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/admin/dashboard", Some(&admin)).await;
    assert_eq!(body["resp_data"]["pending_applications"], 1);
    assert_eq!(body["resp_data"]["users"], 2);

    let (status, _) = review(&app, &admin, 9999, "approve").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approval_rejects_when_username_was_registered_meanwhile() {
    let app = TestApp::new().await;
    let admin = app.admin("reviewer").await;
    let id = apply(&app, "carol").await;

    // 申请提交后有人抢先注册了同名账号
    app.member("carol").await;

    let (status, body) = review(&app, &admin, id, "approve").await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["resp_data"]["outcome"], "username_taken");
    assert_eq!(body["resp_data"]["application"]["status"], "rejected");
    assert!(body["msg"].as_str().unwrap().contains("已自动拒绝"));
    assert_eq!(users_named(&app, "carol").await, 1);

    let (_, body) = review(&app, &admin, id, "approve").await;
    assert_eq!(body["resp_data"]["outcome"], "already_resolved");

    let (_, body) = app
        .get("/api/admin/applications?status=pending", Some(&admin))
        .await;
    assert!(body["resp_data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_member_roster_separates_admins() {
    let app = TestApp::new().await;
    let admin = app.admin("reviewer").await;
    app.member("alice").await;
    let bob = app.member("bob").await;

    let (status, body) = app.get("/api/admin/members", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["resp_data"]["admin_count"], 1);
    assert_eq!(body["resp_data"]["member_count"], 2);
    assert_eq!(body["resp_data"]["admins"][0]["username"], "reviewer");

    let (status, _) = app.get("/api/admin/members", Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
