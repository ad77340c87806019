//! Server configuration for the ERx HTTP API.
//!
//! This module provides configuration types for the server, supporting
//! both programmatic configuration and environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ERX_SERVER_PORT` | 5001 | Server port |
//! | `ERX_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `ERX_LOG_LEVEL` | info | Log level |
//! | `ERX_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `ERX_ENABLE_CORS` | true | Enable CORS |
//! | `ERX_CORS_ORIGINS` | * | Allowed origins |
//! | `ERX_DATABASE_URL` | erx.db | SQLite database path (`:memory:` for in-memory) |
//! | `ERX_JWT_SECRET` | - | HS256 signing secret (required) |
//! | `ERX_JWT_EXPIRY_HOURS` | 168 | Token lifetime |
//! | `ERX_REDIS_URL` | - | Redis URL; in-process cache when unset |
//! | `ERX_CACHE_TTL_SECS` | 300 | Cache entry lifetime |
//! | `ERX_AUDIT_RETENTION_DAYS` | 90 | Audit entries older than this are purged |
//! | `ERX_UPLOAD_BASE_URL` | - | Accepted prefix for profile picture URLs |
//! | `ERX_GOOGLE_CLIENT_ID` | - | Enables the Google sign-in entry point |
//!
//! # Example
//!
//! ```rust
//! use erx_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     jwt_secret: "change-me".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use clap::Parser;

/// Server configuration for the ERx HTTP API.
#[derive(Debug, Clone, Parser)]
#[command(name = "erx")]
#[command(about = "ERx e-prescription server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "ERX_SERVER_PORT", default_value = "5001")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "ERX_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "ERX_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in seconds.
    #[arg(long, env = "ERX_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "ERX_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "ERX_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "ERX_CORS_METHODS",
        default_value = "GET,POST,PUT,PATCH,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "ERX_CORS_HEADERS",
        default_value = "Content-Type,Authorization,Accept,X-Request-Id"
    )]
    pub cors_headers: String,

    /// Enable request ID tracking.
    #[arg(long, env = "ERX_ENABLE_REQUEST_ID", default_value = "true")]
    pub enable_request_id: bool,

    /// SQLite database path.
    #[arg(long, env = "ERX_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Secret used to sign access tokens.
    #[arg(long, env = "ERX_JWT_SECRET", default_value = "", hide_env_values = true)]
    pub jwt_secret: String,

    /// Access token lifetime in hours.
    #[arg(long, env = "ERX_JWT_EXPIRY_HOURS", default_value = "168")]
    pub jwt_expiry_hours: i64,

    /// Redis connection URL for the shared cache.
    #[arg(long, env = "ERX_REDIS_URL")]
    pub redis_url: Option<String>,

    /// Cache entry lifetime in seconds.
    #[arg(long, env = "ERX_CACHE_TTL_SECS", default_value = "300")]
    pub cache_ttl_secs: u64,

    /// Default page size for prescription listings.
    #[arg(long, env = "ERX_DEFAULT_PAGE_SIZE", default_value = "10")]
    pub default_page_size: usize,

    /// Maximum page size for cursor listings.
    #[arg(long, env = "ERX_MAX_PAGE_SIZE", default_value = "50")]
    pub max_page_size: usize,

    /// Default page size for the medicine catalog.
    #[arg(long, env = "ERX_MEDICINE_PAGE_SIZE", default_value = "50")]
    pub medicine_page_size: usize,

    /// Cap on catalog search results.
    #[arg(long, env = "ERX_SEARCH_RESULT_LIMIT", default_value = "20")]
    pub search_result_limit: usize,

    /// Days audit entries are retained.
    #[arg(long, env = "ERX_AUDIT_RETENTION_DAYS", default_value = "90")]
    pub audit_retention_days: u32,

    /// Maintain the full-text index over the medicine catalog.
    #[arg(long, env = "ERX_ENABLE_TEXT_INDEX", default_value = "true")]
    pub enable_text_index: bool,

    /// Base URL that uploaded profile pictures must live under.
    #[arg(long, env = "ERX_UPLOAD_BASE_URL")]
    pub upload_base_url: Option<String>,

    /// Google OAuth client id.
    #[arg(long, env = "ERX_GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PUT,PATCH,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Authorization,Accept,X-Request-Id".to_string(),
            enable_request_id: true,
            database_url: None,
            jwt_secret: String::new(),
            jwt_expiry_hours: 168,
            redis_url: None,
            cache_ttl_secs: 300,
            default_page_size: 10,
            max_page_size: 50,
            medicine_page_size: 50,
            search_result_limit: 20,
            audit_retention_days: 90,
            enable_text_index: true,
            upload_base_url: None,
            google_client_id: None,
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the database path, defaulting to `erx.db`.
    pub fn database_path(&self) -> &str {
        self.database_url.as_deref().unwrap_or("erx.db")
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.jwt_secret.trim().is_empty() {
            errors.push("JWT secret must be set".to_string());
        }

        if self.jwt_expiry_hours <= 0 {
            errors.push("JWT expiry must be positive".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            request_timeout: 30,
            enable_cors: false,
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            enable_request_id: false,
            database_url: Some(":memory:".to_string()),
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            cache_ttl_secs: 60,
            ..Default::default()
        }
    }
}
