//! Integration tests for movie reviews and rating aggregation

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_rating_is_mean_of_all_reviews() {
    let app = TestApp::new().await;
    let admin = app.admin("curator").await;
    let movie_id = app
        .add_movie(&admin, json!({ "title": "霸王别姬", "director": "陈凯歌" }))
        .await;

    let (_, detail) = app.get(&format!("/api/movie/movie/{}", movie_id), None).await;
    assert_eq!(detail["resp_data"]["movie"]["rating"], 0.0);

    for (name, rating) in [("alice", 5), ("bob", 4), ("carol", 4)] {
        let token = app.member(name).await;
        let (status, body) = app
            .post(
                &format!("/api/movie/movie/{}", movie_id),
                Some(&token),
                json!({ "rating": rating, "review_text": "好看" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    let (status, detail) = app.get(&format!("/api/movie/movie/{}", movie_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["resp_data"]["movie"]["rating"], 4.3);
    assert_eq!(detail["resp_data"]["reviews"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_second_review_is_rejected_and_rating_unchanged() {
    let app = TestApp::new().await;
    let admin = app.admin("curator").await;
    let movie_id = app.add_movie(&admin, json!({ "title": "花样年华" })).await;
    let alice = app.member("alice").await;
    let uri = format!("/api/movie/movie/{}", movie_id);

    let (status, body) = app
        .post(&uri, Some(&alice), json!({ "rating": 2, "review_text": "一般" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["resp_data"]["movie_rating"], 2.0);

    let (status, body) = app
        .post(&uri, Some(&alice), json!({ "rating": 5, "review_text": "再看一遍" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["msg"], "您已经评论过这部电影了");

    let (_, detail) = app.get(&uri, None).await;
    assert_eq!(detail["resp_data"]["movie"]["rating"], 2.0);
    let reviews = detail["resp_data"]["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["review_text"], "一般");
}

#[tokio::test]
async fn test_review_validation() {
    let app = TestApp::new().await;
    let admin = app.admin("curator").await;
    let movie_id = app.add_movie(&admin, json!({ "title": "阳光灿烂的日子" })).await;
    let alice = app.member("alice").await;
    let uri = format!("/api/movie/movie/{}", movie_id);

    let (status, _) = app
        .post(&uri, Some(&alice), json!({ "rating": 6, "review_text": "满分" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(&uri, Some(&alice), json!({ "rating": 3, "review_text": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/movie/movie/9999",
            Some(&alice),
            json!({ "rating": 3, "review_text": "不存在" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(&uri, None, json!({ "rating": 3, "review_text": "匿名" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1002);
}

#[tokio::test]
async fn test_rating_cannot_be_set_by_admin() {
    let app = TestApp::new().await;
    let admin = app.admin("curator").await;
    let movie_id = app
        .add_movie(&admin, json!({ "title": "活着", "rating": 9.9, "release_year": "1994" }))
        .await;

    let (_, detail) = app.get(&format!("/api/movie/movie/{}", movie_id), None).await;
    assert_eq!(detail["resp_data"]["movie"]["rating"], 0.0);
    assert_eq!(detail["resp_data"]["movie"]["release_year"], 1994);

    let (status, body) = app
        .post(
            &format!("/api/admin/update_movie/{}", movie_id),
            Some(&admin),
            json!({ "rating": 5.0, "country": "中国" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["rating"], 0.0);
    assert_eq!(body["resp_data"]["country"], "中国");
    assert_eq!(body["resp_data"]["title"], "活着");
}

#[tokio::test]
async fn test_deleting_movie_removes_reviews() {
    let app = TestApp::new().await;
    let admin = app.admin("curator").await;
    let movie_id = app.add_movie(&admin, json!({ "title": "盗梦空间" })).await;
    let alice = app.member("alice").await;
    app.post(
        &format!("/api/movie/movie/{}", movie_id),
        Some(&alice),
        json!({ "rating": 4, "review_text": "烧脑" }),
    )
    .await;

    let (status, _) = app
        .post(&format!("/api/admin/delete_movie/{}", movie_id), Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&format!("/api/admin/delete_movie/{}", movie_id), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movie_reviews")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let (status, _) = app.get(&format!("/api/movie/movie/{}", movie_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
