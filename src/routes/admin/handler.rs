use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppResult,
    extractors::{ApiJson, ApiPath, ApiQuery},
    middleware::CurrentUser,
    routes::{
        admin::model::{DashboardStats, MemberRoster},
        application::{ApplicationFilter, MemberApplication, ReviewApplicationRequest, ReviewOutcome},
        event::{EventInput, EventStatusRequest, MovieEvent},
        movie::{Movie, MovieInput},
        news::{CreateNewsRequest, News},
        user::{SetRoleRequest, User, UserSummary},
    },
    utils::{ApiResponse, message_to_api_response, success_to_api_response},
};

// 以下接口均要求管理员权限，权限检查在各业务方法内完成

pub async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let stats = DashboardStats::collect(&state.pool, &user).await?;
    Ok(success_to_api_response(stats))
}

pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<UserSummary>>>> {
    let users = User::list_all(&state.pool, &user).await?;
    Ok(success_to_api_response(users))
}

pub async fn members(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<MemberRoster>>> {
    let roster = MemberRoster::collect(&state.pool, &user).await?;
    Ok(success_to_api_response(roster))
}

pub async fn set_role(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<SetRoleRequest>,
) -> AppResult<Json<ApiResponse<UserSummary>>> {
    let updated = User::set_role(&state.pool, &user, req).await?;
    Ok(message_to_api_response("角色已更新", updated))
}

pub async fn list_applications(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiQuery(filter): ApiQuery<ApplicationFilter>,
) -> AppResult<Json<ApiResponse<Vec<MemberApplication>>>> {
    let applications = MemberApplication::list(&state.pool, &user, &filter).await?;
    Ok(success_to_api_response(applications))
}

// 审核入会申请；已处理过的申请原样返回当前状态
pub async fn approve_application(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<ReviewApplicationRequest>,
) -> AppResult<Json<ApiResponse<ReviewOutcome>>> {
    let outcome =
        MemberApplication::review(&state.pool, &user, req, state.config.bcrypt_cost).await?;
    Ok(message_to_api_response(outcome.message(), outcome))
}

pub async fn add_movie(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<MovieInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Movie>>)> {
    let movie = Movie::create(&state.pool, &user, input).await?;
    Ok((
        StatusCode::CREATED,
        message_to_api_response("电影添加成功", movie),
    ))
}

pub async fn update_movie(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(movie_id): ApiPath<i64>,
    ApiJson(input): ApiJson<MovieInput>,
) -> AppResult<Json<ApiResponse<Movie>>> {
    let movie = Movie::update(&state.pool, &user, movie_id, input).await?;
    Ok(message_to_api_response("电影信息已更新", movie))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(movie_id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    Movie::delete(&state.pool, &user, movie_id).await?;
    Ok(message_to_api_response("删除电影成功", ()))
}

pub async fn add_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<EventInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<MovieEvent>>)> {
    let capacity = state.config.default_event_capacity;
    let event = MovieEvent::create(&state.pool, &user, input, capacity).await?;
    Ok((
        StatusCode::CREATED,
        message_to_api_response("活动添加成功", event),
    ))
}

pub async fn set_event_status(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(event_id): ApiPath<i64>,
    ApiJson(req): ApiJson<EventStatusRequest>,
) -> AppResult<Json<ApiResponse<MovieEvent>>> {
    let event = MovieEvent::set_status(&state.pool, &user, event_id, req).await?;
    Ok(message_to_api_response("活动状态已更新", event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(event_id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    MovieEvent::delete(&state.pool, &user, event_id).await?;
    Ok(message_to_api_response("删除活动成功", ()))
}

pub async fn add_news(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateNewsRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<News>>)> {
    let news = News::create(&state.pool, &user, req).await?;
    Ok((
        StatusCode::CREATED,
        message_to_api_response("新闻发布成功", news),
    ))
}
