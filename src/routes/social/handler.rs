use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppResult,
    extractors::{ApiJson, ApiPath},
    middleware::CurrentUser,
    routes::social::model::{
        AddFriendOutcome, CreateLogRequest, Friend, FriendNameRequest, FriendSpace, Friendship,
        Log, RemoveFriendOutcome,
    },
    utils::{ApiResponse, message_to_api_response, success_to_api_response},
};

pub async fn list_friends(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Friend>>>> {
    let friends = Friendship::list(&state.pool, &user).await?;
    Ok(success_to_api_response(friends))
}

// 添加好友：重复添加只提示，不报错
pub async fn add_friend(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<FriendNameRequest>,
) -> AppResult<Json<ApiResponse<Option<Friend>>>> {
    let response = match Friendship::add(&state.pool, &user, req.friend_name.as_deref()).await? {
        AddFriendOutcome::Added(friend) => message_to_api_response("添加好友成功", Some(friend)),
        AddFriendOutcome::AlreadyFriends => message_to_api_response("已经是好友了", None),
    };
    Ok(response)
}

pub async fn remove_friend(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<FriendNameRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let msg =
        match Friendship::remove_by_name(&state.pool, &user, req.friend_name.as_deref()).await? {
            RemoveFriendOutcome::Removed => "删除好友成功",
            RemoveFriendOutcome::NotFriends => "未找到好友关系",
        };
    Ok(message_to_api_response(msg, ()))
}

// 发布日志
pub async fn post_log(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateLogRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Log>>)> {
    let log = Log::create(&state.pool, &user, req).await?;
    Ok((
        StatusCode::CREATED,
        message_to_api_response("日志发布成功", log),
    ))
}

pub async fn list_logs(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Log>>>> {
    let logs = Log::list_own(&state.pool, &user).await?;
    Ok(success_to_api_response(logs))
}

// 访问好友空间
pub async fn friend_space(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(friend_id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<FriendSpace>>> {
    let space = Log::friend_space(&state.pool, &user, friend_id).await?;
    Ok(success_to_api_response(space))
}
