use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    AppState,
    extractors::{PageForm, PageParams, PagePath},
    middleware::CurrentUser,
    render::{PageUser, flash_error, flash_redirect, render_error, render_page},
    routes::{
        PageQuery,
        movie::model::{Movie, MovieInput, Review, ReviewRequest, SearchQuery},
    },
};

const MOVIES: &str = "/movie/movies";

pub async fn movies(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
    PageParams(query): PageParams<PageQuery>,
) -> Response {
    match Movie::list(&state.pool, &query).await {
        Ok(movies) => render_page(&state, jar, user.as_ref(), "movies", json!({ "movies": movies })),
        Err(e) => render_error(&state, e),
    }
}

// 管理员在电影列表页添加电影
pub async fn add_movie(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PageForm(input): PageForm<MovieInput>,
) -> Response {
    match Movie::create(&state.pool, &user, input).await {
        Ok(_) => flash_redirect(jar, MOVIES, "添加电影成功！"),
        Err(e) => flash_error(jar, MOVIES, e),
    }
}

pub async fn delete_movie(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PagePath(movie_id): PagePath<i64>,
) -> Response {
    match Movie::delete(&state.pool, &user, movie_id).await {
        Ok(()) => flash_redirect(jar, MOVIES, "删除电影成功！"),
        Err(e) => flash_error(jar, MOVIES, e),
    }
}

pub async fn movie_detail(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
    PagePath(movie_id): PagePath<i64>,
) -> Response {
    match Movie::detail(&state.pool, movie_id).await {
        Ok(detail) => render_page(&state, jar, user.as_ref(), "movie_detail", json!(detail)),
        Err(e) => render_error(&state, e),
    }
}

pub async fn submit_review(
    State(state): State<AppState>,
    jar: CookieJar,
    PageUser(user): PageUser,
    PagePath(movie_id): PagePath<i64>,
    PageForm(req): PageForm<ReviewRequest>,
) -> Response {
    let back = format!("/movie/movie/{}", movie_id);
    match Review::submit(&state.pool, &user, movie_id, req).await {
        Ok(_) => flash_redirect(jar, &back, "评论提交成功！"),
        Err(e) => flash_error(jar, &back, e),
    }
}

pub async fn search(
    State(state): State<AppState>,
    jar: CookieJar,
    user: Option<CurrentUser>,
    PageParams(query): PageParams<SearchQuery>,
) -> Response {
    match Movie::search(&state.pool, &query).await {
        Ok(movies) => render_page(
            &state,
            jar,
            user.as_ref(),
            "search_results",
            json!({
                "movies": movies,
                "query": query.q,
                "genre": query.genre,
                "year": query.year,
            }),
        ),
        Err(e) => render_error(&state, e),
    }
}
