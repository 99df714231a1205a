use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

mod app;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "snapdrift_gateway=info,snapdrift_scheduler=info,snapdrift_delivery=info,tower_http=debug".into()
            }),
        )
        .init();

    // load config: explicit path via SNAPDRIFT_CONFIG env > ~/.snapdrift/snapdrift.toml
    let config_path = std::env::var("SNAPDRIFT_CONFIG").ok();
    let config = snapdrift_core::SnapdriftConfig::load(config_path.as_deref())?;
    config.validate()?;

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // run all schema migrations (idempotent)
    snapdrift_images::db::init_db(&db)?;
    snapdrift_scheduler::db::init_db(&db)?;
    info!("database migrations complete");
    drop(db);

    // build subsystems — each gets its own connection for thread safety
    let images: Arc<dyn snapdrift_images::ImageStore> = Arc::new(
        snapdrift_images::SqliteImageStore::new(rusqlite::Connection::open(&db_path)?),
    );
    let schedule = Arc::new(snapdrift_scheduler::ScheduleStore::new(
        rusqlite::Connection::open(&db_path)?,
    ));
    let delivery = snapdrift_delivery::build_client(&config.delivery)
        .ok_or_else(|| anyhow::anyhow!("delivery provider credentials missing after validation"))?;

    let (engine, scheduler) = snapdrift_scheduler::Engine::new(
        config.scheduler.clone(),
        config.delivery.recipient.clone(),
        images,
        delivery,
        schedule,
    )?;
    tokio::spawn(engine.run());

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config, scheduler));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
