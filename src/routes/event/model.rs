use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, AppResult, is_check_violation, is_unique_violation},
    middleware::CurrentUser,
    routes::{lenient_number, movie::Movie},
    utils::required,
};

const EVENT_COLUMNS: &str = "id, title, description, movie_id, event_type, event_date, location, \
     max_participants, current_participants, status, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn accepts_registration(self) -> bool {
        matches!(self, EventStatus::Upcoming | EventStatus::Ongoing)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        })
    }
}

impl FromStr for EventStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "upcoming" => Ok(EventStatus::Upcoming),
            "ongoing" => Ok(EventStatus::Ongoing),
            "completed" => Ok(EventStatus::Completed),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(AppError::validation(format!("未知活动状态: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Registered,
    Attended,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MovieEvent {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub movie_id: Option<i64>,
    pub event_type: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub max_participants: i64,
    pub current_participants: i64,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Registration {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub registration_date: DateTime<Utc>,
    pub status: RegistrationStatus,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Participant {
    pub user_id: i64,
    pub username: String,
    pub nickname: Option<String>,
    pub registration_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EventDetail {
    pub event: MovieEvent,
    pub movie: Option<Movie>,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub movie_id: Option<i64>,
    pub event_type: Option<String>,
    pub event_date: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub max_participants: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct EventStatusRequest {
    pub status: Option<String>,
}

/// 支持 RFC 3339 以及表单 datetime-local 的 `YYYY-MM-DDTHH:MM[:SS]`（按 UTC 处理）
pub fn parse_event_date(raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::validation("活动时间格式无效"))
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl MovieEvent {
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Self>> {
        let event = sqlx::query_as::<_, MovieEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM movie_events WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(event)
    }

    pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM movie_events")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// 即将开始的活动，按活动时间排序
    pub async fn list_upcoming(pool: &SqlitePool) -> AppResult<Vec<Self>> {
        let events = sqlx::query_as::<_, MovieEvent>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM movie_events
            WHERE status = 'upcoming'
            ORDER BY event_date IS NULL, event_date, id
            "#
        ))
        .fetch_all(pool)
        .await?;
        Ok(events)
    }

    /// 管理端：全部活动，按活动时间倒序
    pub async fn list_all(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Vec<Self>> {
        actor.require_admin()?;

        let events = sqlx::query_as::<_, MovieEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM movie_events ORDER BY event_date DESC, id DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(events)
    }

    pub async fn detail(pool: &SqlitePool, id: i64) -> AppResult<EventDetail> {
        let event = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::not_found("活动不存在"))?;

        let movie = match event.movie_id {
            Some(movie_id) => Movie::find_by_id(pool, movie_id).await?,
            None => None,
        };

        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT r.user_id, u.username, u.nickname, r.registration_date
            FROM event_registrations r
            JOIN users u ON u.id = r.user_id
            WHERE r.event_id = ?1 AND r.status <> 'cancelled'
            ORDER BY r.registration_date, r.id
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(EventDetail {
            event,
            movie,
            participants,
        })
    }

    pub async fn create(
        pool: &SqlitePool,
        actor: &CurrentUser,
        input: EventInput,
        default_capacity: i64,
    ) -> AppResult<Self> {
        actor.require_admin()?;

        let title = required(input.title.as_deref())
            .ok_or_else(|| AppError::validation("活动标题不能为空"))?
            .to_string();

        let max_participants = input.max_participants.unwrap_or(default_capacity);
        if max_participants < 1 {
            return Err(AppError::validation("人数上限必须大于0"));
        }

        let event_date = match required(input.event_date.as_deref()) {
            Some(raw) => Some(parse_event_date(raw)?),
            None => None,
        };

        if let Some(movie_id) = input.movie_id {
            if Movie::find_by_id(pool, movie_id).await?.is_none() {
                return Err(AppError::not_found("关联的电影不存在"));
            }
        }

        let event = sqlx::query_as::<_, MovieEvent>(&format!(
            r#"
            INSERT INTO movie_events (title, description, movie_id, event_type, event_date,
                                      location, max_participants, current_participants, status,
                                      created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 'upcoming', ?8)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(clean(input.description))
        .bind(input.movie_id)
        .bind(clean(input.event_type))
        .bind(event_date)
        .bind(clean(input.location))
        .bind(max_participants)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        tracing::info!("Admin {} added event {} (id {})", actor.username, event.title, event.id);
        Ok(event)
    }

    pub async fn set_status(
        pool: &SqlitePool,
        actor: &CurrentUser,
        id: i64,
        req: EventStatusRequest,
    ) -> AppResult<Self> {
        actor.require_admin()?;

        let status: EventStatus = required(req.status.as_deref())
            .ok_or_else(|| AppError::validation("活动状态不能为空"))?
            .parse()?;

        let event = sqlx::query_as::<_, MovieEvent>(&format!(
            "UPDATE movie_events SET status = ?1 WHERE id = ?2 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(status)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("活动不存在"))?;

        tracing::info!("Admin {} set event {} status to {}", actor.username, id, status);
        Ok(event)
    }

    pub async fn delete(pool: &SqlitePool, actor: &CurrentUser, id: i64) -> AppResult<()> {
        actor.require_admin()?;

        let result = sqlx::query("DELETE FROM movie_events WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("活动不存在"));
        }

        tracing::info!("Admin {} deleted event {}", actor.username, id);
        Ok(())
    }
}

impl Registration {
    /// 报名活动：重复报名与名额已满都会被拒绝。
    ///
    /// 事务的第一条语句就是带条件的名额 UPDATE，先拿到写锁再读写其余数据；
    /// 并发请求依次排队，不会越过人数上限。
    pub async fn register(
        pool: &SqlitePool,
        actor: &CurrentUser,
        event_id: i64,
    ) -> AppResult<Registration> {
        let mut tx = pool.begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE movie_events
            SET current_participants = current_participants + 1
            WHERE id = ?1
              AND status IN ('upcoming', 'ongoing')
              AND current_participants < max_participants
            "#,
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await;

        match claimed {
            Ok(result) if result.rows_affected() == 1 => {}
            Ok(_) => return Err(Self::refusal(&mut *tx, actor, event_id).await?),
            Err(e) if is_check_violation(&e) => return Err(AppError::conflict("活动报名已满")),
            Err(e) => return Err(e.into()),
        }

        let inserted = sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO event_registrations (user_id, event_id, registration_date, status)
            VALUES (?1, ?2, ?3, 'registered')
            RETURNING id, user_id, event_id, registration_date, status
            "#,
        )
        .bind(actor.id)
        .bind(event_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        // 插入失败时事务回滚，名额计数随之恢复
        let registration = match inserted {
            Ok(registration) => registration,
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::conflict("您已经报名参加这个活动了"));
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        tracing::info!("User {} registered for event {}", actor.id, event_id);
        Ok(registration)
    }

    // 没能占到名额时给出具体原因
    async fn refusal(
        conn: &mut SqliteConnection,
        actor: &CurrentUser,
        event_id: i64,
    ) -> AppResult<AppError> {
        let status: Option<EventStatus> =
            sqlx::query_scalar("SELECT status FROM movie_events WHERE id = ?1")
                .bind(event_id)
                .fetch_optional(&mut *conn)
                .await?;
        let Some(status) = status else {
            return Ok(AppError::not_found("活动不存在"));
        };
        if !status.accepts_registration() {
            return Ok(AppError::conflict("活动已结束或已取消，无法报名"));
        }

        let existing: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM event_registrations
            WHERE user_id = ?1 AND event_id = ?2 AND status <> 'cancelled'
            "#,
        )
        .bind(actor.id)
        .bind(event_id)
        .fetch_optional(&mut *conn)
        .await?;
        if existing.is_some() {
            return Ok(AppError::conflict("您已经报名参加这个活动了"));
        }

        Ok(AppError::conflict("活动报名已满"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_and_iso_dates() {
        let a = parse_event_date("2024-10-15T19:30").unwrap();
        assert_eq!(a.to_rfc3339(), "2024-10-15T19:30:00+00:00");

        let b = parse_event_date("2024-10-15T19:30:00+08:00").unwrap();
        assert_eq!(b.to_rfc3339(), "2024-10-15T11:30:00+00:00");

        assert!(parse_event_date("next friday").is_err());
    }

    #[test]
    fn only_open_events_accept_registration() {
        assert!(EventStatus::Upcoming.accepts_registration());
        assert!(EventStatus::Ongoing.accepts_registration());
        assert!(!EventStatus::Completed.accepts_registration());
        assert!(!EventStatus::Cancelled.accepts_registration());
    }

    #[test]
    fn status_parses_known_values() {
        assert_eq!("cancelled".parse::<EventStatus>().unwrap(), EventStatus::Cancelled);
        assert!("postponed".parse::<EventStatus>().is_err());
    }
}
