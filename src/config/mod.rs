use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub default_event_capacity: i64,
    pub bcrypt_cost: u32,
    pub cookie_secure: bool,
    pub club_name: String,
    pub club_intro: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

// 读取可选环境变量，解析失败时使用默认值
fn var_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.trim_end_matches('h').parse::<u64>().ok())
            .unwrap_or(24);

        Ok(Config {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://cineclub.db?mode=rwc".into()),
            redis_url: non_empty("REDIS_URL"),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            rate_limit_window_secs: var_or("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: var_or("RATE_LIMIT_REQUESTS", 100),
            server_host: non_empty("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: var_or("SERVER_PORT", 3000),
            api_base_uri: non_empty("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            upload_dir: non_empty("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static/uploads")),
            max_upload_bytes: var_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            default_event_capacity: var_or("DEFAULT_EVENT_CAPACITY", 50),
            bcrypt_cost: var_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            cookie_secure: var_or("COOKIE_SECURE", false),
            club_name: non_empty("CLUB_NAME").unwrap_or_else(|| "电影协会".into()),
            club_intro: non_empty("CLUB_INTRO")
                .unwrap_or_else(|| "以影会友，欢迎热爱电影的同学加入。".into()),
            admin_username: non_empty("ADMIN_USERNAME"),
            admin_password: non_empty("ADMIN_PASSWORD"),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
