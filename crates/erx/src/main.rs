//! ERx e-prescription server
//!
//! Runs the HTTP API by default. Two maintenance subcommands share the same
//! database configuration: `import-medicines` loads the catalog from a CSV
//! export and `promote-admin` grants the admin role to an existing account.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use erx_rest::{AppState, ServerConfig, create_app_with_state, init_logging};
use tracing::{info, warn};

#[cfg(feature = "sqlite")]
use erx_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};

#[derive(Debug, Parser)]
#[command(name = "erx", version, about = "ERx e-prescription server")]
struct Cli {
    #[command(flatten)]
    config: ServerConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (the default).
    Serve,

    /// Load medicines from a CSV export into the catalog.
    ImportMedicines {
        /// CSV file with a `product_name` column.
        path: PathBuf,
    },

    /// Grant the admin role to an existing account.
    PromoteAdmin {
        /// Email address of the account.
        email: String,
    },
}

/// Creates and initializes a SQLite backend from the server configuration.
#[cfg(feature = "sqlite")]
fn create_sqlite_backend(config: &ServerConfig) -> anyhow::Result<SqliteBackend> {
    let db_path = config.database_path();
    info!(database = %db_path, "Initializing SQLite backend");

    let backend_config = SqliteBackendConfig {
        enable_text_index: config.enable_text_index,
        ..Default::default()
    };

    let backend = SqliteBackend::with_config(db_path, backend_config)?;
    backend.init_schema()?;

    Ok(backend)
}

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config;
    init_logging(&config.log_level);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            if let Err(errors) = config.validate() {
                for error in &errors {
                    eprintln!("Configuration error: {}", error);
                }
                std::process::exit(1);
            }

            info!(
                port = config.port,
                host = %config.host,
                database = %config.database_path(),
                "Starting ERx server"
            );
            start_sqlite(config).await
        }
        Command::ImportMedicines { path } => import_medicines(&config, path).await,
        Command::PromoteAdmin { email } => promote_admin(&config, &email).await,
    }
}

/// Starts the server with the SQLite backend.
#[cfg(feature = "sqlite")]
async fn start_sqlite(config: ServerConfig) -> anyhow::Result<()> {
    let backend = create_sqlite_backend(&config)?;
    let state = AppState::new(Arc::new(backend), config.clone());
    let state = attach_shared_cache(state, &config).await;

    let app = create_app_with_state(state);
    serve(app, &config).await
}

/// Fallback when sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
async fn start_sqlite(_config: ServerConfig) -> anyhow::Result<()> {
    anyhow::bail!(
        "The sqlite backend requires the 'sqlite' feature. \
         Build with: cargo build -p erx-server --features sqlite"
    )
}

/// Replaces the in-process cache with Redis when a URL is configured.
///
/// An unreachable Redis is logged and the in-process cache stays in place.
#[cfg(feature = "redis")]
async fn attach_shared_cache<S>(state: AppState<S>, config: &ServerConfig) -> AppState<S>
where
    S: erx_persistence::core::Storage,
{
    use erx_rest::cache::RedisCache;

    let Some(url) = config.redis_url.as_deref() else {
        return state;
    };
    match RedisCache::connect(url).await {
        Ok(cache) => state.with_cache(Arc::new(cache)),
        Err(e) => {
            warn!(error = %e, "Redis unavailable, using the in-process cache");
            state
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn attach_shared_cache<S>(state: AppState<S>, config: &ServerConfig) -> AppState<S>
where
    S: erx_persistence::core::Storage,
{
    if config.redis_url.is_some() {
        warn!("ERX_REDIS_URL is set but the 'redis' feature is not enabled; ignoring it");
    }
    state
}

#[cfg(feature = "sqlite")]
async fn import_medicines(config: &ServerConfig, path: PathBuf) -> anyhow::Result<()> {
    use erx_persistence::import::import_medicines_csv;

    let backend = create_sqlite_backend(config)?;
    let report = import_medicines_csv(&backend, &path).await?;

    info!(
        rows = report.rows_read,
        inserted = report.inserted,
        skipped = report.skipped,
        "Import finished"
    );
    println!(
        "Imported {} medicines ({} rows skipped)",
        report.inserted, report.skipped
    );
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn import_medicines(_config: &ServerConfig, _path: PathBuf) -> anyhow::Result<()> {
    anyhow::bail!("Importing requires the 'sqlite' feature")
}

#[cfg(feature = "sqlite")]
async fn promote_admin(config: &ServerConfig, email: &str) -> anyhow::Result<()> {
    use erx_persistence::core::UserStorage;
    use erx_persistence::types::Role;

    let backend = create_sqlite_backend(config)?;
    let email = email.trim().to_ascii_lowercase();

    let Some(user) = backend.find_user_by_email(&email).await? else {
        anyhow::bail!("No account registered with email {}", email);
    };
    if user.role == Role::Admin {
        println!("{} is already an admin", email);
        return Ok(());
    }

    backend.set_role(&user.id, Role::Admin).await?;
    info!(user = %user.id, previous = %user.role, "Promoted account to admin");
    println!("{} is now an admin", email);
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn promote_admin(_config: &ServerConfig, _email: &str) -> anyhow::Result<()> {
    anyhow::bail!("Promoting an admin requires the 'sqlite' feature")
}

#[cfg(not(feature = "sqlite"))]
compile_error!("At least one database backend feature must be enabled");
