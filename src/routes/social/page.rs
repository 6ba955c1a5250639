use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    AppState,
    error::AppError,
    extractors::{PageForm, PagePath},
    render::{PageUser, flash_error, flash_redirect, render_error, render_page},
    routes::social::model::{
        AddFriendOutcome, CreateLogRequest, FriendIdForm, FriendNameRequest, Friendship, Log,
        RemoveFriendOutcome,
    },
};

const DASHBOARD: &str = "/dashboard";

pub async fn add_friend(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PageForm(req): PageForm<FriendNameRequest>,
) -> Response {
    match Friendship::add(&state.pool, &user, req.friend_name.as_deref()).await {
        Ok(AddFriendOutcome::Added(friend)) => {
            let name = friend.nickname.as_deref().unwrap_or(&friend.username);
            flash_redirect(jar, DASHBOARD, format!("已添加 {} 为好友", name))
        }
        Ok(AddFriendOutcome::AlreadyFriends) => flash_redirect(jar, DASHBOARD, "已经是好友了"),
        Err(e) => flash_error(jar, DASHBOARD, e),
    }
}

pub async fn remove_friend(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PageForm(req): PageForm<FriendIdForm>,
) -> Response {
    let Some(friend_id) = req.friend_id else {
        return flash_error(jar, DASHBOARD, AppError::validation("好友ID不能为空"));
    };

    match Friendship::remove(&state.pool, &user, friend_id).await {
        Ok(RemoveFriendOutcome::Removed) => flash_redirect(jar, DASHBOARD, "已删除好友"),
        Ok(RemoveFriendOutcome::NotFriends) => flash_redirect(jar, DASHBOARD, "未找到好友关系"),
        Err(e) => flash_error(jar, DASHBOARD, e),
    }
}

pub async fn post_log(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PageForm(req): PageForm<CreateLogRequest>,
) -> Response {
    match Log::create(&state.pool, &user, req).await {
        Ok(_) => flash_redirect(jar, DASHBOARD, "日志发布成功"),
        Err(e) => flash_error(jar, DASHBOARD, e),
    }
}

// 好友空间
pub async fn friend_space(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PagePath(friend_id): PagePath<i64>,
) -> Response {
    match Log::friend_space(&state.pool, &user, friend_id).await {
        Ok(space) => render_page(&state, jar, Some(&user), "friend_space", json!(space)),
        Err(e) => render_error(&state, e),
    }
}
