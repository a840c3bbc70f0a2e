use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::error::{AppError, Result};
use crate::repositories::{
    ContentStore, FsContentStore, MemoryContentStore, MemoryStore, PgStore, RedisSessionStore,
    SessionStore, UserStore,
};
use crate::services::{
    access::AccessController,
    auth::AccountService,
    envelopes::{EnvelopeService, EnvelopeStores},
    sessions::SessionManager,
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// Registration, login and session verification.
    pub accounts: AccountService,
    /// Expiry and ownership checks.
    pub access: AccessController,
    /// Envelope lifecycle for shared links and cloud files.
    pub envelopes: EnvelopeService,
}

impl AppState {
    /// Creates a new `AppState` backed by the configured stores.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("⚠️ Using in-memory stores, nothing survives a restart");
                Ok(Self::in_memory(config.clone()))
            }
            StorageBackend::Postgres => {
                let database_url = config.database_url.as_deref().ok_or_else(|| {
                    AppError::Internal("DATABASE_URL is required for the postgres backend".to_string())
                })?;

                let pool = crate::db::create_pool(database_url)?;
                crate::db::ensure_schema(&pool).await?;
                tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");

                let records = PgStore::new(pool);
                let sessions = RedisSessionStore::connect(&config.redis_url).await?;
                let share_blobs = FsContentStore::open(config.content_dir.join("shared")).await?;
                let cloud_blobs = FsContentStore::open(config.content_dir.join("cloud")).await?;

                Ok(Self::assemble(
                    config.clone(),
                    Arc::new(records.clone()),
                    Arc::new(sessions),
                    EnvelopeStores {
                        shared_files: Arc::new(records.clone()),
                        cloud_files: Arc::new(records),
                        share_blobs: Arc::new(share_blobs),
                        cloud_blobs: Arc::new(cloud_blobs),
                    },
                ))
            }
        }
    }

    /// State over fresh in-memory stores.
    pub fn in_memory(config: Config) -> Self {
        let records = MemoryStore::new();
        let share_blobs: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());
        let cloud_blobs: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());

        Self::assemble(
            config,
            Arc::new(records.clone()),
            Arc::new(records.clone()),
            EnvelopeStores {
                shared_files: Arc::new(records.clone()),
                cloud_files: Arc::new(records),
                share_blobs,
                cloud_blobs,
            },
        )
    }

    fn assemble(
        config: Config,
        users: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
        stores: EnvelopeStores,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            session_store,
            chrono::Duration::hours(config.session_ttl_hours),
        ));
        let access = AccessController::new(sessions.clone());
        let accounts = AccountService::new(users, sessions);
        let envelopes = EnvelopeService::new(stores, access.clone(), config.max_share_ttl_hours);

        tracing::info!(
            "✅ AppState initialized (session TTL {}h, max share TTL {}h)",
            config.session_ttl_hours,
            config.max_share_ttl_hours
        );

        AppState {
            config: Arc::new(config),
            accounts,
            access,
            envelopes,
        }
    }
}
