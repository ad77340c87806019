//! Application state for the ERx HTTP API.
//!
//! This module defines the shared application state that is available to all
//! request handlers: the storage backend, configuration, token service, cache
//! and the handles to the background audit and notification workers.

use std::sync::Arc;
use std::time::Duration;

use erx_persistence::core::Storage;

use crate::audit::AuditSink;
use crate::auth::TokenService;
use crate::cache::{self, Cache};
use crate::config::ServerConfig;
use crate::notify::NotificationDispatcher;

/// Shared application state for the REST API.
///
/// # Type Parameters
///
/// * `S` - The storage backend type (must implement [`Storage`])
///
/// # Example
///
/// ```rust,no_run
/// use erx_rest::{AppState, ServerConfig};
/// use erx_persistence::backends::sqlite::SqliteBackend;
/// use erx_persistence::core::Backend;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = SqliteBackend::in_memory()?;
/// backend.init_schema()?;
/// let state = AppState::new(Arc::new(backend), ServerConfig::for_testing());
/// assert_eq!(state.storage().name(), "sqlite");
/// # Ok(())
/// # }
/// ```
pub struct AppState<S> {
    /// The storage backend.
    storage: Arc<S>,

    /// Server configuration.
    config: Arc<ServerConfig>,

    /// Access token issuer and verifier.
    tokens: Arc<TokenService>,

    /// Response cache.
    cache: Arc<dyn Cache>,

    /// Audit trail writer.
    audit: AuditSink,

    /// Notification delivery.
    notifier: NotificationDispatcher,
}

// Manually implement Clone since S is wrapped in Arc and doesn't need to be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: Arc::clone(&self.config),
            tokens: Arc::clone(&self.tokens),
            cache: Arc::clone(&self.cache),
            audit: self.audit.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S: Storage> AppState<S> {
    /// Creates the state and starts the audit and notification workers.
    ///
    /// The cache defaults to the in-process cache for `config`; use
    /// [`AppState::with_cache`] to swap in a shared one. Must be called from
    /// within a Tokio runtime.
    pub fn new(storage: Arc<S>, config: ServerConfig) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expiry_hours);
        let cache = cache::local_cache(&config);
        let audit = AuditSink::spawn(Arc::clone(&storage), config.audit_retention_days);
        let notifier = NotificationDispatcher::spawn(Arc::clone(&storage));

        Self {
            storage,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            cache,
            audit,
            notifier,
        }
    }

    /// Replaces the cache.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    /// Returns a reference to the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns a clone of the storage Arc.
    pub fn storage_arc(&self) -> Arc<S> {
        Arc::clone(&self.storage)
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the token service.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Returns the cache.
    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    /// Lifetime of cache entries.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache_ttl_secs)
    }

    /// Returns the audit sink.
    pub fn audit(&self) -> &AuditSink {
        &self.audit
    }

    /// Returns the notification dispatcher.
    pub fn notifier(&self) -> &NotificationDispatcher {
        &self.notifier
    }

    /// Returns the default page size for prescription listings.
    pub fn default_page_size(&self) -> usize {
        self.config.default_page_size
    }

    /// Returns the maximum page size for cursor listings.
    pub fn max_page_size(&self) -> usize {
        self.config.max_page_size
    }
}
