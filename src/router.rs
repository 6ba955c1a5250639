use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    middleware::{identify, log_errors},
    routes::{admin, application, event, movie, news, personal, social, user},
};

// JSON 接口，挂载在 api_base_uri 之下
fn api_routes() -> Router<AppState> {
    Router::new()
        // 用户
        .route("/user/register", post(user::handler::register))
        .route("/user/login", post(user::handler::login))
        .route("/user/activate", post(user::handler::activate))
        .route("/user/logout", post(user::handler::logout))
        .route(
            "/user/profile",
            get(user::handler::get_profile).post(user::handler::update_profile),
        )
        .route("/user/users", get(user::handler::list_users))
        // 好友与日志
        .route(
            "/user/friends",
            get(social::handler::list_friends)
                .post(social::handler::add_friend)
                .delete(social::handler::remove_friend),
        )
        .route("/user/log", post(social::handler::post_log))
        .route("/user/logs", get(social::handler::list_logs))
        .route("/user/friend_space/{id}", get(social::handler::friend_space))
        // 照片与收藏
        .route("/user/upload_photo", post(personal::handler::upload_photo))
        .route("/user/photos", get(personal::handler::list_photos))
        .route(
            "/user/collect/{item_type}/{item_id}",
            post(personal::handler::collect),
        )
        .route("/user/collections", get(personal::handler::list_collections))
        // 入会申请
        .route("/apply", post(application::handler::apply))
        // 电影与活动
        .route("/movie/movies", get(movie::handler::list_movies))
        .route(
            "/movie/movie/{id}",
            get(movie::handler::movie_detail).post(movie::handler::submit_review),
        )
        .route("/movie/events", get(event::handler::list_events))
        .route(
            "/movie/event/{id}",
            get(event::handler::event_detail).post(event::handler::register),
        )
        .route("/movie/search", get(movie::handler::search))
        // 公开信息
        .route("/public/about", get(news::handler::about))
        .route("/public/news", get(news::handler::list_news))
        .route("/public/news/{id}", get(news::handler::news_detail))
        // 管理
        .route("/admin/dashboard", get(admin::handler::dashboard))
        .route("/admin/users", get(admin::handler::list_users))
        .route("/admin/members", get(admin::handler::members))
        .route("/admin/set_role", post(admin::handler::set_role))
        .route("/admin/applications", get(admin::handler::list_applications))
        .route(
            "/admin/approve_application",
            post(admin::handler::approve_application),
        )
        .route("/admin/add_movie", post(admin::handler::add_movie))
        .route("/admin/update_movie/{id}", post(admin::handler::update_movie))
        .route("/admin/delete_movie/{id}", post(admin::handler::delete_movie))
        .route("/admin/add_event", post(admin::handler::add_event))
        .route("/admin/event_status/{id}", post(admin::handler::set_event_status))
        .route("/admin/delete_event/{id}", post(admin::handler::delete_event))
        .route("/admin/add_news", post(admin::handler::add_news))
}

// 页面与表单提交，挂载在根路径
fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(news::page::index))
        .route("/login", get(user::page::login_page))
        .route("/register", get(user::page::register_page))
        .route(
            "/apply",
            get(application::page::apply_page).post(application::page::apply),
        )
        .route("/dashboard", get(user::page::dashboard))
        .route("/friend_space/{id}", get(social::page::friend_space))
        .route("/news", get(news::page::news))
        // 表单
        .route("/user/register", post(user::page::register))
        .route("/user/login", post(user::page::login))
        .route(
            "/user/logout",
            get(user::page::logout).post(user::page::logout),
        )
        .route("/user/profile/update", post(user::page::update_profile))
        .route("/user/friend/add", post(social::page::add_friend))
        .route("/user/friend/remove", post(social::page::remove_friend))
        .route("/user/log/post_form", post(social::page::post_log))
        // 电影与活动
        .route(
            "/movie/movies",
            get(movie::page::movies).post(movie::page::add_movie),
        )
        .route("/movie/delete_movie/{id}", post(movie::page::delete_movie))
        .route(
            "/movie/movie/{id}",
            get(movie::page::movie_detail).post(movie::page::submit_review),
        )
        .route(
            "/movie/events",
            get(event::page::events).post(event::page::add_event),
        )
        .route("/movie/delete_event/{id}", post(event::page::delete_event))
        .route(
            "/movie/event/{id}",
            get(event::page::event_detail).post(event::page::register),
        )
        .route("/movie/search", get(movie::page::search))
        // 管理后台
        .route("/admin/dashboard", get(admin::page::dashboard))
        .route("/admin/members", get(admin::page::members))
        .route("/admin/applications", get(admin::page::applications))
        .route("/admin/apply_approve", post(admin::page::apply_approve))
}

/// 组装全部路由与中间件；限流等可选层由调用方追加
pub fn create_router(state: AppState) -> Router {
    let api_base = match state.config.api_base_uri.trim_end_matches('/') {
        "" => "/api".to_string(),
        base => base.to_string(),
    };

    Router::new()
        .nest(&api_base, api_routes())
        .merge(page_routes())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(from_fn_with_state(state.clone(), identify))
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
