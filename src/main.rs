use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use cineclub::{
    AppState,
    config::Config,
    create_router, db,
    middleware::{RateLimiter, rate_limit},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration, is JWT_SECRET set?");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池并执行迁移
    let pool = db::connect(&config.database_url)
        .await
        .expect("Failed to connect to SQLite");
    db::migrate(&pool).await.expect("Failed to run migrations");
    db::ensure_admin(&pool, &config)
        .await
        .expect("Failed to create bootstrap admin");

    // 设置应用状态
    let state = AppState::new(pool, config.clone());
    let router = create_router(state);

    // 配置了 Redis 时启用限流
    let router = match &config.redis_url {
        Some(url) => {
            let redis_client = redis::Client::open(url.as_str()).expect("Failed to create Redis client");
            let rate_limiter = Arc::new(RateLimiter::new(redis_client, &config));
            tracing::info!(
                "Rate limiting enabled: {} requests per {}s",
                config.rate_limit_requests,
                config.rate_limit_window_secs
            );
            router.layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit))
        }
        None => router,
    };

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
