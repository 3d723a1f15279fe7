use std::path::PathBuf;

use tally_core::attachment::DEFAULT_MAX_UPLOAD_BYTES;

use crate::auth::jwt::JwtConfig;

/// Default lifetime of staged (not yet promoted) uploads.
pub const DEFAULT_STAGED_FILE_TTL_HOURS: i64 = 24;

/// Which storage backend the server wires at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Postgres repositories with attachment content on local disk.
    Postgres {
        database_url: String,
        attachment_dir: PathBuf,
    },
    /// Everything in process memory. Nothing survives a restart.
    Memory,
}

/// Credentials for the admin account created on first start.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background jobs, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub storage: StorageBackend,
    /// Upper bound for a single attachment upload.
    pub max_upload_bytes: u64,
    /// Staged uploads older than this are purged.
    pub staged_file_ttl_hours: i64,
    /// Whether the session cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `3000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                       |
    /// | `STORAGE_BACKEND`           | `postgres`                 |
    /// | `DATABASE_URL`              | required for `postgres`    |
    /// | `ATTACHMENT_DIR`            | `storage/attachments`      |
    /// | `MAX_UPLOAD_BYTES`          | `10485760` (10 MiB)        |
    /// | `STAGED_FILE_TTL_HOURS`     | `24`                       |
    /// | `COOKIE_SECURE`             | `false`                    |
    /// | `BOOTSTRAP_ADMIN_USERNAME`  | unset                      |
    /// | `BOOTSTRAP_ADMIN_PASSWORD`  | unset                      |
    /// | `BOOTSTRAP_ADMIN_EMAIL`     | `<username>@localhost`     |
    ///
    /// # Panics
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let storage = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "postgres" => StorageBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .expect("DATABASE_URL must be set when STORAGE_BACKEND=postgres"),
                attachment_dir: std::env::var("ATTACHMENT_DIR")
                    .unwrap_or_else(|_| "storage/attachments".into())
                    .into(),
            },
            other => panic!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };

        let max_upload_bytes: u64 = std::env::var("MAX_UPLOAD_BYTES")
            .map(|v| v.parse().expect("MAX_UPLOAD_BYTES must be a valid u64"))
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let staged_file_ttl_hours: i64 = std::env::var("STAGED_FILE_TTL_HOURS")
            .map(|v| v.parse().expect("STAGED_FILE_TTL_HOURS must be a valid i64"))
            .unwrap_or(DEFAULT_STAGED_FILE_TTL_HOURS);

        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let bootstrap_admin = match (
            std::env::var("BOOTSTRAP_ADMIN_USERNAME"),
            std::env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                let email = std::env::var("BOOTSTRAP_ADMIN_EMAIL")
                    .unwrap_or_else(|_| format!("{username}@localhost"));
                Some(BootstrapAdmin {
                    username,
                    password,
                    email,
                })
            }
            _ => None,
        };

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            storage,
            max_upload_bytes,
            staged_file_ttl_hours,
            cookie_secure,
            bootstrap_admin,
            jwt,
        }
    }
}
