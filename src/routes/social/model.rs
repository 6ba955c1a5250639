use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::{
    error::{AppError, AppResult, is_unique_violation},
    middleware::CurrentUser,
    routes::{lenient_bool, lenient_number, user::User},
    utils::required,
};

#[derive(Debug, Serialize, FromRow)]
pub struct Friend {
    pub id: i64,
    pub username: String,
    pub nickname: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug)]
pub enum AddFriendOutcome {
    Added(Friend),
    AlreadyFriends,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RemoveFriendOutcome {
    Removed,
    NotFriends,
}

#[derive(Debug, Deserialize)]
pub struct FriendNameRequest {
    pub friend_name: Option<String>,
}

/// 页面端删除好友表单按好友ID提交
#[derive(Debug, Deserialize)]
pub struct FriendIdForm {
    #[serde(default, deserialize_with = "lenient_number")]
    pub friend_id: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Log {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub visible: Option<bool>,
}

/// 好友空间中对外展示的日志
#[derive(Debug, Serialize, FromRow)]
pub struct PublicLog {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SpaceOwner {
    pub id: i64,
    pub username: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FriendSpace {
    pub friend: SpaceOwner,
    pub logs: Vec<PublicLog>,
}

pub struct Friendship;

impl Friendship {
    pub async fn list(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Vec<Friend>> {
        let friends = sqlx::query_as::<_, Friend>(
            r#"
            SELECT u.id, u.username, u.nickname, u.tags
            FROM friendships f
            JOIN users u ON u.id = f.friend_id
            WHERE f.user_id = ?1
            ORDER BY f.id
            "#,
        )
        .bind(actor.id)
        .fetch_all(pool)
        .await?;

        Ok(friends)
    }

    /// 单向添加好友，重复添加不会产生新记录
    pub async fn add(
        pool: &SqlitePool,
        actor: &CurrentUser,
        friend_name: Option<&str>,
    ) -> AppResult<AddFriendOutcome> {
        let friend_name =
            required(friend_name).ok_or_else(|| AppError::validation("好友用户名不能为空"))?;

        let friend = User::find_by_username(pool, friend_name)
            .await?
            .ok_or_else(|| AppError::not_found("用户不存在"))?;

        if friend.id == actor.id {
            return Err(AppError::validation("不能添加自己为好友"));
        }

        let result = sqlx::query("INSERT INTO friendships (user_id, friend_id) VALUES (?1, ?2)")
            .bind(actor.id)
            .bind(friend.id)
            .execute(pool)
            .await;

        match result {
            Ok(_) => {
                tracing::info!("User {} added friend {}", actor.id, friend.id);
                Ok(AddFriendOutcome::Added(Friend {
                    id: friend.id,
                    username: friend.username,
                    nickname: friend.nickname,
                    tags: friend.tags,
                }))
            }
            Err(e) if is_unique_violation(&e) => Ok(AddFriendOutcome::AlreadyFriends),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove_by_name(
        pool: &SqlitePool,
        actor: &CurrentUser,
        friend_name: Option<&str>,
    ) -> AppResult<RemoveFriendOutcome> {
        let friend_name =
            required(friend_name).ok_or_else(|| AppError::validation("好友用户名不能为空"))?;

        let friend = User::find_by_username(pool, friend_name)
            .await?
            .ok_or_else(|| AppError::not_found("用户不存在"))?;

        Self::remove(pool, actor, friend.id).await
    }

    pub async fn remove(
        pool: &SqlitePool,
        actor: &CurrentUser,
        friend_id: i64,
    ) -> AppResult<RemoveFriendOutcome> {
        let result = sqlx::query("DELETE FROM friendships WHERE user_id = ?1 AND friend_id = ?2")
            .bind(actor.id)
            .bind(friend_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            Ok(RemoveFriendOutcome::NotFriends)
        } else {
            tracing::info!("User {} removed friend {}", actor.id, friend_id);
            Ok(RemoveFriendOutcome::Removed)
        }
    }
}

impl Log {
    pub async fn create(
        pool: &SqlitePool,
        actor: &CurrentUser,
        req: CreateLogRequest,
    ) -> AppResult<Self> {
        let content = required(req.content.as_deref())
            .ok_or_else(|| AppError::validation("日志内容不能为空"))?;

        let log = sqlx::query_as::<_, Log>(
            r#"
            INSERT INTO logs (user_id, content, visible, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, user_id, content, visible, created_at
            "#,
        )
        .bind(actor.id)
        .bind(content)
        .bind(req.visible.unwrap_or(true))
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    /// 自己的全部日志，包含不可见的
    pub async fn list_own(pool: &SqlitePool, actor: &CurrentUser) -> AppResult<Vec<Self>> {
        let logs = sqlx::query_as::<_, Log>(
            r#"
            SELECT id, user_id, content, visible, created_at
            FROM logs
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(actor.id)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    /// 访问他人空间：只按可见性过滤，不校验好友关系
    pub async fn friend_space(
        pool: &SqlitePool,
        _viewer: &CurrentUser,
        owner_id: i64,
    ) -> AppResult<FriendSpace> {
        let owner = User::find_by_id(pool, owner_id)
            .await?
            .ok_or_else(|| AppError::not_found("好友不存在"))?;

        let logs = sqlx::query_as::<_, PublicLog>(
            r#"
            SELECT id, content, created_at
            FROM logs
            WHERE user_id = ?1 AND visible = 1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner.id)
        .fetch_all(pool)
        .await?;

        Ok(FriendSpace {
            friend: SpaceOwner {
                id: owner.id,
                username: owner.username,
                nickname: owner.nickname,
                avatar: owner.avatar,
                tags: owner.tags,
            },
            logs,
        })
    }
}
