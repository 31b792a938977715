use axum::{
    http::{HeaderValue, Method},
    middleware,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipfeed::{
    config::Config,
    routes,
    services::{
        scheduler::TaskHandle, sync::spawn_sync_loop, AppController, FeedStore, FileStore,
        HttpGenerator, IntervalTrigger, LocalCache, MediaGenerator, RemoteStore, SurrealStore,
        SyncEngine,
    },
    state::AppState,
    utils::middleware::request_id_middleware,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();

    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("LOG_LEVEL").unwrap_or_else(|_| "clipfeed=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clipfeed service...");
    let config = Config::from_env()?;

    // 本地缓存：上次的工作集立即可用，不等远程
    let cache = LocalCache::new(Arc::new(FileStore::open(&config.local_cache_dir)?));
    let feed = FeedStore::load(cache);

    // 远程存储不可达时以离线模式启动，同步循环会持续重试
    let store = SurrealStore::new(&config);
    match store.verify_connection().await {
        Ok(()) => info!("Remote store connection established successfully"),
        Err(e) => warn!("Remote store unavailable, starting in offline mode: {}", e),
    }
    let remote: Arc<dyn RemoteStore> = Arc::new(store);

    let generator: Arc<dyn MediaGenerator> = Arc::new(HttpGenerator::new(&config)?);
    let controller = Arc::new(AppController::new(
        config.clone(),
        feed.clone(),
        remote.clone(),
        generator,
    ));
    let sync_engine = Arc::new(SyncEngine::new(remote, feed));

    let app_state = Arc::new(AppState::new(config.clone(), controller.clone(), sync_engine.clone()));

    // 启动后台任务
    let _sync_loop = start_background_tasks(&config, sync_engine);

    // 配置 CORS
    let origins = config
        .cors_allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(origins);

    let app = routes::api_router()
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    controller.shutdown();
    info!("clipfeed stopped");
    Ok(())
}

fn start_background_tasks(config: &Config, sync_engine: Arc<SyncEngine>) -> TaskHandle {
    info!(
        "Starting sync loop every {}ms",
        config.sync_interval().as_millis()
    );
    spawn_sync_loop(sync_engine, IntervalTrigger::new(config.sync_interval()))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
