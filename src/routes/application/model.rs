use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    routes::{
        lenient_number,
        user::{User, validate_username},
    },
    utils::required,
};

const APPLICATION_COLUMNS: &str = "id, username, realname, reason, favorite_movies, \
     movie_experience, status, created_at, reviewed_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        })
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberApplication {
    pub id: i64,
    pub username: String,
    pub realname: Option<String>,
    pub reason: String,
    pub favorite_movies: Option<String>,
    pub movie_experience: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub username: Option<String>,
    pub realname: Option<String>,
    pub reason: Option<String>,
    pub favorite_movies: Option<String>,
    pub movie_experience: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct ReviewApplicationRequest {
    #[serde(default, alias = "id", deserialize_with = "lenient_number")]
    pub application_id: Option<i64>,
    pub action: Option<ReviewAction>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
}

/// 审核通过后开通的账号，激活码只在此时返回一次
#[derive(Debug, Serialize)]
pub struct ProvisionedAccount {
    pub user_id: i64,
    pub username: String,
    pub setup_token: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReviewOutcome {
    Approved {
        application: MemberApplication,
        account: ProvisionedAccount,
    },
    Rejected {
        application: MemberApplication,
    },
    /// 审核时用户名已被他人注册，申请自动拒绝
    UsernameTaken {
        application: MemberApplication,
    },
    /// 申请已处理过，本次操作不生效
    AlreadyResolved {
        application: MemberApplication,
    },
}

impl ReviewOutcome {
    pub fn message(&self) -> String {
        match self {
            ReviewOutcome::Approved { .. } => "申请已通过，账号已开通".to_string(),
            ReviewOutcome::Rejected { .. } => "申请已拒绝".to_string(),
            ReviewOutcome::UsernameTaken { application } => {
                format!("用户名 {} 已被注册，申请已自动拒绝", application.username)
            }
            ReviewOutcome::AlreadyResolved { application } => {
                format!("申请已处理（{}），无需重复操作", application.status)
            }
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl MemberApplication {
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Self>> {
        let application = sqlx::query_as::<_, MemberApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM member_applications WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(application)
    }

    pub async fn count_pending(pool: &SqlitePool) -> AppResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM member_applications WHERE status = 'pending'")
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// 提交入会申请，无需登录
    pub async fn submit(pool: &SqlitePool, req: ApplyRequest) -> AppResult<Self> {
        let (Some(username), Some(reason)) = (
            required(req.username.as_deref()),
            required(req.reason.as_deref()),
        ) else {
            return Err(AppError::validation("请填写完整信息"));
        };
        validate_username(username)?;

        if User::find_by_username(pool, username).await?.is_some() {
            return Err(AppError::conflict("用户名已存在"));
        }

        let pending: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM member_applications WHERE username = ?1 AND status = 'pending'",
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;
        if pending.is_some() {
            return Err(AppError::conflict("该用户名已有待审核的申请"));
        }

        let application = sqlx::query_as::<_, MemberApplication>(&format!(
            r#"
            INSERT INTO member_applications (username, realname, reason, favorite_movies,
                                             movie_experience, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(clean(req.realname))
        .bind(reason)
        .bind(clean(req.favorite_movies))
        .bind(clean(req.movie_experience))
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        tracing::info!(
            "New membership application {} for {}",
            application.id,
            application.username
        );
        Ok(application)
    }

    pub async fn list(
        pool: &SqlitePool,
        actor: &CurrentUser,
        filter: &ApplicationFilter,
    ) -> AppResult<Vec<Self>> {
        actor.require_admin()?;

        let applications = sqlx::query_as::<_, MemberApplication>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS} FROM member_applications
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.status)
        .fetch_all(pool)
        .await?;

        Ok(applications)
    }

    async fn username_taken(conn: &mut SqliteConnection, username: &str) -> AppResult<bool> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(existing.is_some())
    }

    /// 审核入会申请。只有待审核的申请可以流转，且流转不可逆；
    /// 通过时在同一事务内开通会员账号。
    pub async fn review(
        pool: &SqlitePool,
        actor: &CurrentUser,
        req: ReviewApplicationRequest,
        bcrypt_cost: u32,
    ) -> AppResult<ReviewOutcome> {
        actor.require_admin()?;

        let (Some(id), Some(action)) = (req.application_id, req.action) else {
            return Err(AppError::validation("申请ID和审核操作不能为空"));
        };

        let mut tx = pool.begin().await?;

        let next_status = match action {
            ReviewAction::Approve => ApplicationStatus::Approved,
            ReviewAction::Reject => ApplicationStatus::Rejected,
        };

        let transitioned = sqlx::query_as::<_, MemberApplication>(&format!(
            r#"
            UPDATE member_applications
            SET status = ?1, reviewed_at = ?2
            WHERE id = ?3 AND status = 'pending'
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(next_status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(application) = transitioned else {
            let current = sqlx::query_as::<_, MemberApplication>(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM member_applications WHERE id = ?1"
            ))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("申请不存在"))?;

            return Ok(ReviewOutcome::AlreadyResolved {
                application: current,
            });
        };

        // 申请提交后用户名可能已被注册
        let username_taken = action == ReviewAction::Approve
            && Self::username_taken(&mut *tx, &application.username).await?;

        let outcome = match action {
            ReviewAction::Approve if username_taken => {
                let application = sqlx::query_as::<_, MemberApplication>(&format!(
                    r#"
                    UPDATE member_applications SET status = 'rejected'
                    WHERE id = ?1
                    RETURNING {APPLICATION_COLUMNS}
                    "#
                ))
                .bind(application.id)
                .fetch_one(&mut *tx)
                .await?;

                tracing::warn!(
                    "Application {} auto-rejected, username {} already registered",
                    application.id,
                    application.username
                );
                ReviewOutcome::UsernameTaken { application }
            }
            ReviewAction::Approve => {
                let (user, setup_token) = User::create_pending_activation(
                    &mut *tx,
                    &application.username,
                    application.realname.as_deref(),
                    bcrypt_cost,
                )
                .await?;

                tracing::info!(
                    "Admin {} approved application {}, provisioned user {} (id {})",
                    actor.username,
                    application.id,
                    user.username,
                    user.id
                );
                ReviewOutcome::Approved {
                    application,
                    account: ProvisionedAccount {
                        user_id: user.id,
                        username: user.username,
                        setup_token,
                    },
                }
            }
            ReviewAction::Reject => {
                tracing::info!(
                    "Admin {} rejected application {}",
                    actor.username,
                    application.id
                );
                ReviewOutcome::Rejected { application }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }
}
