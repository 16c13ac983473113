use task_reminder::{
    application::task_service::TaskServiceImpl,
    config::{ServerConfig, StoreLocation},
    domain::repository::TaskRepository,
    http::{routes::tasks, routing},
    infrastructure::{json_file_repo::JsonFileTaskRepository, sqlite_repo::SqliteTaskRepository},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env()?;
    match &config.store {
        StoreLocation::JsonFile(path) => serve(JsonFileTaskRepository::new(path), &config).await,
        StoreLocation::Sqlite(url) => serve(SqliteTaskRepository::connect(url).await?, &config).await,
    }
}

async fn serve<R: TaskRepository + Clone>(repo: R, config: &ServerConfig) -> anyhow::Result<()> {
    repo.init().await?;
    let service = TaskServiceImpl::new(repo);
    let router = routing::app(tasks::router(tasks::AppState { service }));

    tracing::info!(addr = %config.addr, store = %config.store, "listening");
    axum::serve(tokio::net::TcpListener::bind(config.addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}
