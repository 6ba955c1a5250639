use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    AppState,
    error::AppResult,
    extractors::PageForm,
    middleware::{CurrentUser, session_cookie, session_removal_cookie},
    render::{PageUser, flash_error, flash_redirect, render_error, render_page},
    routes::{
        personal::{Collection, Photo},
        social::{Friendship, Log},
        user::model::{CredentialsRequest, LoginResponse, UpdateProfileRequest, User},
    },
};

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
) -> Response {
    render_page(&state, jar, user.as_ref(), "login", json!({}))
}

pub async fn register_page(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
) -> Response {
    render_page(&state, jar, user.as_ref(), "register", json!({}))
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    PageForm(req): PageForm<CredentialsRequest>,
) -> Response {
    match User::register(&state.pool, req, state.config.bcrypt_cost).await {
        Ok(_) => flash_redirect(jar, "/login", "注册成功！请登录"),
        Err(e) => flash_error(jar, "/register", e),
    }
}

// 登录成功后管理员进入管理后台，其他用户进入会员空间
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    PageForm(req): PageForm<CredentialsRequest>,
) -> Response {
    let user = match User::login(&state.pool, &req).await {
        Ok(user) => user,
        Err(e) => return flash_error(jar, "/login", e),
    };
    let session = match LoginResponse::issue(&user, &state.config) {
        Ok(session) => session,
        Err(e) => return flash_error(jar, "/login", e),
    };
    tracing::info!("User {} logged in", user.id);

    let jar = jar.add(session_cookie(session.token, &state.config));
    let to = if user.role.is_admin() {
        "/admin/dashboard"
    } else {
        "/dashboard"
    };
    let welcome = format!(
        "欢迎回来，{}！",
        user.nickname.as_deref().unwrap_or(&user.username)
    );
    flash_redirect(jar, to, welcome)
}

pub async fn logout(jar: CookieJar) -> Response {
    flash_redirect(jar.remove(session_removal_cookie()), "/", "已成功退出登录")
}

pub async fn update_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PageForm(req): PageForm<UpdateProfileRequest>,
) -> Response {
    match User::update_profile(&state.pool, &user, req).await {
        Ok(_) => flash_redirect(jar, "/dashboard", "个人资料已更新"),
        Err(e) => flash_error(jar, "/dashboard", e),
    }
}

async fn dashboard_data(state: &AppState, user: &CurrentUser) -> AppResult<serde_json::Value> {
    let pool = &state.pool;
    Ok(json!({
        "profile": User::profile(pool, user).await?,
        "friends": Friendship::list(pool, user).await?,
        "logs": Log::list_own(pool, user).await?,
        "photos": Photo::list_own(pool, user).await?,
        "collections": Collection::list_own(pool, user).await?,
        "users": User::list_others(pool, user).await?,
    }))
}

// 会员空间
pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
) -> Response {
    match dashboard_data(&state, &user).await {
        Ok(data) => render_page(&state, jar, Some(&user), "dashboard", data),
        Err(e) => render_error(&state, e),
    }
}
