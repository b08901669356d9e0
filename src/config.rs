use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub uploads_dir: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub frontend_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("uploads_dir", &self.uploads_dir)
            .field("database_url", &self.database_url)
            .field("jwt_secret", &"<redacted>")
            .field("frontend_url", &self.frontend_url)
            .finish()
    }
}

pub const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Pinboard image-sharing API")]
pub struct Args {
    /// Host to bind to (overrides PINBOARD_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PINBOARD_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded images are stored (overrides PINBOARD_UPLOADS_DIR)
    #[arg(long)]
    pub uploads_dir: Option<String>,

    /// Database URL (overrides PINBOARD_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Frontend origin allowed by CORS (overrides PINBOARD_FRONTEND_URL)
    #[arg(long)]
    pub frontend_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("PINBOARD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("PINBOARD_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PINBOARD_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 5000,
            Err(err) => return Err(err).context("reading PINBOARD_PORT"),
        };
        let env_uploads =
            env::var("PINBOARD_UPLOADS_DIR").unwrap_or_else(|_| "./data/uploads".into());
        let env_db = env::var("PINBOARD_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/pinboard.db".into());
        let env_secret =
            env::var("PINBOARD_JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.into());
        let env_frontend =
            env::var("PINBOARD_FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".into());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            uploads_dir: args.uploads_dir.unwrap_or(env_uploads),
            database_url: args.database_url.unwrap_or(env_db),
            jwt_secret: env_secret,
            frontend_url: args.frontend_url.unwrap_or(env_frontend),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
