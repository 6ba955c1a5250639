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
        PageQuery, Paginated,
        movie::model::{Movie, MovieDetail, Review, ReviewOutcome, ReviewRequest, SearchQuery},
    },
    utils::{ApiResponse, message_to_api_response, success_to_api_response},
};

// 电影列表，每页12部
pub async fn list_movies(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<Json<ApiResponse<Paginated<Movie>>>> {
    let movies = Movie::list(&state.pool, &query).await?;
    Ok(success_to_api_response(movies))
}

pub async fn movie_detail(
    State(state): State<AppState>,
    ApiPath(movie_id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<MovieDetail>>> {
    let detail = Movie::detail(&state.pool, movie_id).await?;
    Ok(success_to_api_response(detail))
}

// 提交影评
pub async fn submit_review(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(movie_id): ApiPath<i64>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ReviewOutcome>>)> {
    let outcome = Review::submit(&state.pool, &user, movie_id, req).await?;
    Ok((
        StatusCode::CREATED,
        message_to_api_response("评论提交成功！", outcome),
    ))
}

pub async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<ApiResponse<Vec<Movie>>>> {
    let movies = Movie::search(&state.pool, &query).await?;
    Ok(success_to_api_response(movies))
}
