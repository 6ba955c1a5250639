//! Shared helpers for the integration tests: an in-memory database with
//! migrations applied, the full router, and JSON/form request shortcuts.
#![allow(dead_code)]

use std::path::PathBuf;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use cineclub::{
    AppState,
    config::Config,
    create_router, db,
    routes::user::{Role, User},
};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt; // For `oneshot` method

pub const PASSWORD: &str = "secret123";

pub fn test_config(upload_dir: PathBuf) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        redis_url: None,
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_secs: 3600,
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        api_base_uri: "/api".to_string(),
        upload_dir,
        max_upload_bytes: 1024 * 1024,
        default_event_capacity: 50,
        bcrypt_cost: 4,
        cookie_secure: false,
        club_name: "测试影社".to_string(),
        club_intro: "测试用简介".to_string(),
        admin_username: None,
        admin_password: None,
    }
}

fn temp_path(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()))
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub config: Config,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(test_config(temp_path("cineclub-test"))).await
    }

    /// Uses a database file so that several pooled connections can race each other.
    pub async fn on_disk() -> Self {
        let mut config = test_config(temp_path("cineclub-test"));
        config.database_url = format!(
            "sqlite://{}?mode=rwc",
            temp_path("cineclub-db").with_extension("db").display()
        );
        Self::build(config).await
    }

    async fn build(config: Config) -> Self {
        let pool = db::connect(&config.database_url)
            .await
            .expect("Failed to create test database");
        db::migrate(&pool).await.expect("Failed to run migrations");

        let router = create_router(AppState::new(pool.clone(), config.clone()));
        Self {
            pool,
            config,
            router,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Posts an urlencoded form the way a browser does, with the page it came from.
    pub async fn form_from(
        &self,
        uri: &str,
        referer: &str,
        session: Option<&str>,
        body: &str,
    ) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::REFERER, format!("http://localhost{}", referer));
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, format!("session={}", session));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Sends a JSON request and returns the status with the decoded `ApiResponse` body.
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.json("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.json("POST", uri, token, Some(body)).await
    }

    /// Posts an urlencoded form, optionally carrying the session cookie.
    pub async fn form(&self, uri: &str, session: Option<&str>, body: &str) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, format!("session={}", session));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn page(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/user/login",
                None,
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["resp_data"]["token"].as_str().unwrap().to_string()
    }

    /// Registers a member through the API and returns a bearer token.
    pub async fn member(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/api/user/register",
                None,
                json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        self.login(username, PASSWORD).await
    }

    pub async fn admin(&self, username: &str) -> String {
        self.user_with_role(username, Role::Admin).await
    }

    pub async fn user_with_role(&self, username: &str, role: Role) -> String {
        User::create(&self.pool, username, PASSWORD, role, self.config.bcrypt_cost)
            .await
            .unwrap();
        self.login(username, PASSWORD).await
    }

    pub async fn user_id(&self, username: &str) -> i64 {
        User::find_by_username(&self.pool, username)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    pub async fn add_movie(&self, admin: &str, body: Value) -> i64 {
        let (status, body) = self.post("/api/admin/add_movie", Some(admin), body).await;
        assert_eq!(status, StatusCode::CREATED, "add movie failed: {}", body);
        body["resp_data"]["id"].as_i64().unwrap()
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Returns the raw values of every `Set-Cookie` header with the given name.
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", name)))
        .map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim_start_matches(&format!("{}=", name))
                .to_string()
        })
}

/// Decodes the hex-encoded flash message set by a form redirect.
pub fn flash_message(response: &Response) -> Option<String> {
    let raw = set_cookie(response, "flash")?;
    String::from_utf8(hex::decode(raw).ok()?).ok()
}
