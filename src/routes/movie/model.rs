use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, AppResult, is_foreign_key_violation, is_unique_violation},
    middleware::CurrentUser,
    routes::{PageQuery, Paginated, lenient_number},
    utils::required,
};

pub const MOVIES_PER_PAGE: i64 = 12;

const MOVIE_COLUMNS: &str = "id, title, original_title, director, actors, genre, release_year, \
     country, duration, rating, poster_url, description, trailer_url, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub genre: Option<String>,
    pub release_year: Option<i64>,
    pub country: Option<String>,
    pub duration: Option<i64>,
    pub rating: f64,
    pub poster_url: Option<String>,
    pub description: Option<String>,
    pub trailer_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 新增或修改电影；评分只由影评计算得出，不接受外部输入
#[derive(Debug, Default, Deserialize)]
pub struct MovieInput {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub release_year: Option<i64>,
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub duration: Option<i64>,
    pub poster_url: Option<String>,
    pub description: Option<String>,
    pub trailer_url: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: i64,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ReviewWithAuthor {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub nickname: Option<String>,
    pub rating: i64,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<i64>,
    pub review_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewOutcome {
    pub review: Review,
    pub movie_rating: f64,
}

#[derive(Debug, Serialize)]
pub struct MovieDetail {
    pub movie: Movie,
    pub reviews: Vec<ReviewWithAuthor>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
}

/// 全部评分的算术平均值，保留一位小数；没有评分时为 0.0
pub fn average_rating(ratings: &[i64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let mean = ratings.iter().sum::<i64>() as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Movie {
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Self>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(movie)
    }

    pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movies")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// 按添加时间倒序分页
    pub async fn list(pool: &SqlitePool, query: &PageQuery) -> AppResult<Paginated<Self>> {
        let (page, per_page, offset) = query.resolve(MOVIES_PER_PAGE, MOVIES_PER_PAGE);

        let items = sqlx::query_as::<_, Movie>(&format!(
            r#"
            SELECT {MOVIE_COLUMNS} FROM movies
            ORDER BY created_at DESC, id DESC
            LIMIT ?1 OFFSET ?2
            "#
        ))
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(Paginated {
            items,
            total: Self::count(pool).await?,
            page,
            per_page,
        })
    }

    pub async fn all(pool: &SqlitePool) -> AppResult<Vec<Self>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(movies)
    }

    pub async fn detail(pool: &SqlitePool, id: i64) -> AppResult<MovieDetail> {
        let movie = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("电影不存在"))?;

        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
            r#"
            SELECT r.id, r.user_id, u.username, u.nickname, r.rating, r.review_text, r.created_at
            FROM movie_reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.movie_id = ?1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(MovieDetail { movie, reviews })
    }

    /// 标题或导演包含关键字（区分大小写），可叠加类型与年份的精确筛选，按评分倒序
    pub async fn search(pool: &SqlitePool, query: &SearchQuery) -> AppResult<Vec<Self>> {
        let year = match required(query.year.as_deref()) {
            Some(year) => Some(
                year.parse::<i64>()
                    .map_err(|_| AppError::validation("年份必须是整数"))?,
            ),
            None => None,
        };

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE 1 = 1"));

        if let Some(q) = query.q.as_deref().filter(|q| !q.is_empty()) {
            builder
                .push(" AND (instr(title, ")
                .push_bind(q.to_string())
                .push(") > 0 OR instr(COALESCE(director, ''), ")
                .push_bind(q.to_string())
                .push(") > 0)");
        }
        if let Some(genre) = required(query.genre.as_deref()) {
            builder.push(" AND genre = ").push_bind(genre.to_string());
        }
        if let Some(year) = year {
            builder.push(" AND release_year = ").push_bind(year);
        }
        builder.push(" ORDER BY rating DESC, id DESC");

        let movies = builder.build_query_as::<Movie>().fetch_all(pool).await?;
        Ok(movies)
    }

    pub async fn create(
        pool: &SqlitePool,
        actor: &CurrentUser,
        input: MovieInput,
    ) -> AppResult<Self> {
        actor.require_admin()?;

        let title = required(input.title.as_deref())
            .ok_or_else(|| AppError::validation("电影标题不能为空"))?
            .to_string();

        let movie = sqlx::query_as::<_, Movie>(&format!(
            r#"
            INSERT INTO movies (title, original_title, director, actors, genre, release_year,
                                country, duration, rating, poster_url, description, trailer_url,
                                created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0.0, ?9, ?10, ?11, ?12)
            RETURNING {MOVIE_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(clean(input.original_title))
        .bind(clean(input.director))
        .bind(clean(input.actors))
        .bind(clean(input.genre))
        .bind(input.release_year)
        .bind(clean(input.country))
        .bind(input.duration)
        .bind(clean(input.poster_url))
        .bind(clean(input.description))
        .bind(clean(input.trailer_url))
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        tracing::info!("Admin {} added movie {} (id {})", actor.username, movie.title, movie.id);
        Ok(movie)
    }

    /// 未提供的字段保持原值
    pub async fn update(
        pool: &SqlitePool,
        actor: &CurrentUser,
        id: i64,
        input: MovieInput,
    ) -> AppResult<Self> {
        actor.require_admin()?;

        let movie = sqlx::query_as::<_, Movie>(&format!(
            r#"
            UPDATE movies SET
                title = COALESCE(?1, title),
                original_title = COALESCE(?2, original_title),
                director = COALESCE(?3, director),
                actors = COALESCE(?4, actors),
                genre = COALESCE(?5, genre),
                release_year = COALESCE(?6, release_year),
                country = COALESCE(?7, country),
                duration = COALESCE(?8, duration),
                poster_url = COALESCE(?9, poster_url),
                description = COALESCE(?10, description),
                trailer_url = COALESCE(?11, trailer_url)
            WHERE id = ?12
            RETURNING {MOVIE_COLUMNS}
            "#
        ))
        .bind(clean(input.title))
        .bind(clean(input.original_title))
        .bind(clean(input.director))
        .bind(clean(input.actors))
        .bind(clean(input.genre))
        .bind(input.release_year)
        .bind(clean(input.country))
        .bind(input.duration)
        .bind(clean(input.poster_url))
        .bind(clean(input.description))
        .bind(clean(input.trailer_url))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("电影不存在"))?;

        Ok(movie)
    }

    /// 删除电影时影评一并删除，关联活动保留但解除关联
    pub async fn delete(pool: &SqlitePool, actor: &CurrentUser, id: i64) -> AppResult<()> {
        actor.require_admin()?;

        let result = sqlx::query("DELETE FROM movies WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("电影不存在"));
        }

        tracing::info!("Admin {} deleted movie {}", actor.username, id);
        Ok(())
    }
}

impl Review {
    /// 提交影评并按全部评分重新计算电影评分，整个过程在同一事务内完成
    pub async fn submit(
        pool: &SqlitePool,
        actor: &CurrentUser,
        movie_id: i64,
        req: ReviewRequest,
    ) -> AppResult<ReviewOutcome> {
        let (Some(rating), Some(review_text)) = (req.rating, required(req.review_text.as_deref()))
        else {
            return Err(AppError::validation("请填写完整的评论信息"));
        };
        if !(1..=5).contains(&rating) {
            return Err(AppError::validation("评分必须在1到5之间"));
        }

        // 第一条语句即写入，事务一开始就持有写锁
        let mut tx = pool.begin().await?;

        let inserted = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO movie_reviews (user_id, movie_id, rating, review_text, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, user_id, movie_id, rating, review_text, created_at
            "#,
        )
        .bind(actor.id)
        .bind(movie_id)
        .bind(rating)
        .bind(review_text)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        let review = match inserted {
            Ok(review) => review,
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::conflict("您已经评论过这部电影了"));
            }
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(AppError::not_found("电影不存在"));
            }
            Err(e) => return Err(e.into()),
        };

        let ratings: Vec<i64> =
            sqlx::query_scalar("SELECT rating FROM movie_reviews WHERE movie_id = ?1")
                .bind(movie_id)
                .fetch_all(&mut *tx)
                .await?;
        let movie_rating = average_rating(&ratings);

        sqlx::query("UPDATE movies SET rating = ?1 WHERE id = ?2")
            .bind(movie_rating)
            .bind(movie_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "User {} reviewed movie {} with {} stars, rating now {}",
            actor.id,
            movie_id,
            rating,
            movie_rating
        );
        Ok(ReviewOutcome {
            review,
            movie_rating,
        })
    }
}
