//! LearnForge Server
//!
//! Production server for the learning-platform REST APIs:
//! - Checkout and payment-gateway transition hooks
//! - Course/chapter management with new-course backfill
//! - Account creation with retroactive chapter unlocks
//! - Reconciliation administration (repair trigger, status queries)
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LF_API_PORT` | `8080` | HTTP API port |
//! | `LF_DATABASE_URL` | `sqlite://learnforge.db?mode=rwc` | SQLite database URL |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use lf_entitlement::db;
use lf_entitlement::repository::{
    AccountRepository, ChapterAccessRepository, ChapterRepository, CourseRepository,
    LedgerRepository,
};
use lf_entitlement::{
    ChapterAccessCascade, EntitlementResolver, GrantEngine, IdentityLinker,
    ReconciliationScheduler, SeriesStatusService,
};
use lf_platform::api::{
    accounts_router, checkout_router, courses_router, ledger_router, reconciliation_router,
    AccountsState, CoursesState, LedgerState, ReconciliationState,
};
use lf_platform::PlatformApiDoc;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting LearnForge Server");

    // Configuration from environment
    let api_port: u16 = env_or_parse("LF_API_PORT", 8080);
    let database_url = env_or("LF_DATABASE_URL", "sqlite://learnforge.db?mode=rwc");

    // Connect and prepare the store
    info!("Connecting to database: {}", database_url);
    let pool = db::connect(&database_url).await?;
    db::init_schema(&pool).await?;
    info!("Database schema ready");

    // Initialize repositories
    let course_repo = Arc::new(CourseRepository::new(pool.clone()));
    let chapter_repo = Arc::new(ChapterRepository::new(pool.clone()));
    let account_repo = Arc::new(AccountRepository::new(pool.clone()));
    let ledger_repo = Arc::new(LedgerRepository::new(pool.clone()));
    let access_repo = Arc::new(ChapterAccessRepository::new(pool.clone()));
    info!("Repositories initialized");

    // Wire the entitlement engine
    let identity = IdentityLinker::new(account_repo.clone());
    let cascade = ChapterAccessCascade::new(identity, chapter_repo.clone(), access_repo.clone());
    let resolver = EntitlementResolver::new(course_repo.clone(), ledger_repo.clone());
    let grants = GrantEngine::new(ledger_repo.clone());
    let scheduler = Arc::new(ReconciliationScheduler::new(
        resolver,
        grants,
        cascade.clone(),
        course_repo.clone(),
        ledger_repo.clone(),
    ));
    let status = SeriesStatusService::new(ledger_repo.clone());
    info!("Entitlement engine initialized");

    // Build API states
    let ledger_state = LedgerState {
        ledger_repo: ledger_repo.clone(),
        course_repo: course_repo.clone(),
        scheduler: scheduler.clone(),
    };
    let courses_state = CoursesState {
        course_repo: course_repo.clone(),
        chapter_repo: chapter_repo.clone(),
        scheduler: scheduler.clone(),
    };
    let accounts_state = AccountsState {
        account_repo,
        ledger_repo: ledger_repo.clone(),
        cascade,
    };
    let reconciliation_state = ReconciliationState { scheduler, status };

    // Build platform API router
    let app = Router::new()
        .nest("/api/checkout", checkout_router(ledger_state.clone()))
        .nest("/api/ledger", ledger_router(ledger_state))
        .nest("/api/courses", courses_router(courses_state))
        .nest("/api/accounts", accounts_router(accounts_state))
        .nest("/api/admin/reconciliation", reconciliation_router(reconciliation_state))
        .route("/health", get(health_handler))
        // OpenAPI / Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", PlatformApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    // Start API server
    let api_addr = format!("0.0.0.0:{}", api_port);
    info!("API server listening on http://{}", api_addr);

    let api_listener = TcpListener::bind(&api_addr).await?;
    let api_task = tokio::spawn(async move {
        axum::serve(api_listener, app).await.unwrap();
    });

    info!("LearnForge Server started");
    info!("Press Ctrl+C to shutdown");

    // Wait for shutdown
    shutdown_signal().await;
    info!("Shutdown signal received...");

    api_task.abort();

    info!("LearnForge Server shutdown complete");
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
