use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use conveyor_api::config::{AsCodeConfig, ServerConfig};
use conveyor_api::router::build_app_router;
use conveyor_api::state::AppState;
use conveyor_ascode::{
    AsCodeDeps, AsCodeOrchestrator, BackgroundRunner, HttpGitOperationService,
    JsonWorkflowExporter, MokaOperationCache, OperationReconciler, ReconcileSettings,
};
use conveyor_db::store::PgStore;
use conveyor_events::{EventBus, EventLogger};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file if present (ignored in production).
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "conveyor_api=debug,conveyor_ascode=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let ascode_config = AsCodeConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = conveyor_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    conveyor_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    conveyor_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));

    // --- As-code synchronization ---
    let store = Arc::new(PgStore::new(pool.clone()));
    let git = Arc::new(HttpGitOperationService::new(
        ascode_config.repositories_service_url.clone(),
    ));
    let cache = Arc::new(MokaOperationCache::with_ttl(Duration::from_secs(
        ascode_config.operation_cache_ttl_secs,
    )));
    let reconciler = Arc::new(OperationReconciler::new(
        git.clone(),
        cache.clone(),
        store.clone(),
        ReconcileSettings {
            poll_interval: Duration::from_millis(ascode_config.reconcile_poll_interval_ms),
            max_attempts: ascode_config.reconcile_max_attempts,
        },
    ));
    let runner = BackgroundRunner::new(ascode_config.max_background_tasks);

    let ascode = Arc::new(AsCodeOrchestrator::new(AsCodeDeps {
        workflows: store.clone(),
        entities: store.clone(),
        git,
        exporter: Arc::new(JsonWorkflowExporter::new(store.clone(), store.clone())),
        cache,
        reconciler,
        events: Arc::clone(&event_bus),
        runner: runner.clone(),
    }));
    tracing::info!(
        repositories_service = %ascode_config.repositories_service_url,
        max_background_tasks = ascode_config.max_background_tasks,
        "As-code orchestrator ready"
    );

    let state = AppState {
        pool: Some(pool),
        config: Arc::new(config.clone()),
        workflows: store.clone(),
        entities: store,
        ascode,
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server stopped accepting connections, cleaning up");

    // Let in-flight reconciliations finish so their events get published.
    let drained = runner
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    if drained {
        tracing::info!("Background tasks drained");
    } else {
        tracing::warn!(active = runner.active(), "Background tasks still running at shutdown");
    }

    // Dropping the last sender closes the channel and ends the logger.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
