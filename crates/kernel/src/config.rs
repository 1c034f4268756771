//! Configuration loaded from environment variables.
//!
//! Read exactly once at process start and handed to `AppState::new`;
//! nothing below the bootstrap layer touches the environment.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// HMAC secret for verifying bearer tokens.
    pub jwt_secret: String,

    /// Path to the local attachment directory (default: ./uploads).
    pub uploads_dir: PathBuf,

    /// Base URL for serving attachments (default: /files).
    pub files_url: String,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// S3 bucket for attachments. When None, attachments stay on local disk.
    /// Only honored when the `s3` feature is compiled in.
    pub s3_bucket: Option<String>,

    /// Key prefix inside the S3 bucket.
    pub s3_prefix: Option<String>,

    /// Custom S3 endpoint (MinIO and friends).
    pub s3_endpoint: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let jwt_secret =
            env::var("JWT_SECRET").context("JWT_SECRET environment variable is required")?;

        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let files_url = env::var("FILES_URL").unwrap_or_else(|_| "/files".to_string());

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let s3_bucket = env::var("S3_BUCKET").ok();
        let s3_prefix = env::var("S3_PREFIX").ok();
        let s3_endpoint = env::var("S3_ENDPOINT").ok();

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            jwt_secret,
            uploads_dir,
            files_url,
            cors_allowed_origins,
            s3_bucket,
            s3_prefix,
            s3_endpoint,
        })
    }
}
