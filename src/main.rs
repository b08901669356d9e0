use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod store;

use services::{auth::AuthService, media::MediaStore};
use state::AppState;
use store::{memory::MemoryStore, sqlite::SqliteStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting pinboard with config: {:?}", cfg);
    if cfg.jwt_secret == config::DEFAULT_JWT_SECRET {
        tracing::warn!("PINBOARD_JWT_SECRET is unset; using the development default");
    }

    // --- Ensure uploads directory exists ---
    if !Path::new(&cfg.uploads_dir).exists() {
        fs::create_dir_all(&cfg.uploads_dir)?;
        tracing::info!("Created uploads directory at {}", cfg.uploads_dir);
    }

    // --- Pick the store backend: SQLite, or demo mode if unreachable ---
    // The choice is made once here and holds for the process lifetime.
    let store: Arc<dyn Store> = match connect_database(&cfg.database_url).await {
        Ok(pool) => {
            run_migrations(&pool).await?;
            if migrate {
                tracing::info!("Database migration complete.");
                return Ok(()); // exit after migration
            }
            tracing::info!("Database connected");
            Arc::new(SqliteStore::new(pool))
        }
        Err(err) => {
            if migrate {
                anyhow::bail!("cannot migrate: database unreachable: {err}");
            }
            tracing::warn!("Database error: {err}");
            tracing::warn!("Using demo mode (data resets on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Build shared state + router ---
    let state = AppState::new(
        store,
        MediaStore::new(&cfg.uploads_dir),
        AuthService::new(&cfg.jwt_secret),
    );

    let frontend_origin = cfg
        .frontend_url
        .parse::<HeaderValue>()
        .map_err(|err| anyhow::anyhow!("invalid PINBOARD_FRONTEND_URL: {err}"))?;
    let cors = CorsLayer::new()
        .allow_origin(frontend_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let app = routes::routes::routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the SQLite pool, creating the database file if needed.
async fn connect_database(db_url: &str) -> Result<sqlx::SqlitePool> {
    // Extract the local file path SQLx will use
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    // Create parent directory if needed
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // SQLx will not create the file itself; touch it first
    match fs::OpenOptions::new().create(true).write(true).open(db_path) {
        Ok(_) => tracing::debug!("Database file can be created/opened."),
        Err(e) => tracing::warn!("Failed to open database file: {}", e),
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;
    Ok(pool)
}

/// Run SQLite migrations from the SQL file. The statements are idempotent
/// (`IF NOT EXISTS`), so this also runs on every normal startup.
async fn run_migrations(db: &sqlx::SqlitePool) -> Result<()> {
    let path = "migrations/0001_init.sql";

    if !Path::new(path).exists() {
        anyhow::bail!("Migration file not found: {}", path);
    }

    let sql = fs::read_to_string(path)?;
    let statements = sql
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}
