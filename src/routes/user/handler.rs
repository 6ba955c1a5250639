use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::AppResult,
    extractors::ApiJson,
    middleware::{CurrentUser, session_cookie, session_removal_cookie},
    routes::user::model::{
        ActivateRequest, CredentialsRequest, LoginResponse, Profile, UpdateProfileRequest, User,
        UserListItem,
    },
    utils::{ApiResponse, message_to_api_response, success_to_api_response},
};

// 注册API
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Profile>>)> {
    let user = User::register(&state.pool, req, state.config.bcrypt_cost).await?;
    Ok((
        StatusCode::CREATED,
        message_to_api_response("注册成功", Profile::from(user)),
    ))
}

// 登录API：令牌在响应体中返回，同时写入会话 Cookie
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<LoginResponse>>)> {
    let user = User::login(&state.pool, &req).await?;
    let session = LoginResponse::issue(&user, &state.config)?;
    tracing::info!("User {} logged in", user.id);

    let jar = jar.add(session_cookie(session.token.clone(), &state.config));
    Ok((jar, message_to_api_response("登录成功", session)))
}

// 激活审核通过的账号
pub async fn activate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ActivateRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let user = User::activate(&state.pool, req, state.config.bcrypt_cost).await?;
    Ok(message_to_api_response(
        "账号已激活，请使用新密码登录",
        Profile::from(user),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    (
        jar.remove(session_removal_cookie()),
        message_to_api_response("已成功退出登录", ()),
    )
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = User::profile(&state.pool, &user).await?;
    Ok(success_to_api_response(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = User::update_profile(&state.pool, &user, req).await?;
    Ok(message_to_api_response("资料已更新", profile))
}

// 用户列表（用于好友搜索）
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<UserListItem>>>> {
    let users = User::list_others(&state.pool, &user).await?;
    Ok(success_to_api_response(users))
}
