use crate::auth::AccountService;
use crate::blob::BlobService;
use crate::config::AppConfig;
use crate::error::Result;
use crate::service::StorefrontService;
use crate::store::Store;
use chrono::Duration;
use std::sync::Arc;

/// Everything a request handler needs; cheap to clone per worker.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub storefront: StorefrontService,
    pub blobs: BlobService,
    pub store: Store,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Store, config: Arc<AppConfig>) -> Self {
        Self {
            accounts: AccountService::new(store.clone(), Duration::hours(config.session_ttl_hours)),
            storefront: StorefrontService::new(store.clone()),
            blobs: BlobService::new(store.clone(), config.public_base_url.clone()),
            store,
            config,
        }
    }

    /// Opens the store under `config.data_dir`, creates the bootstrap admin if
    /// configured and sweeps expired sessions.
    pub fn initialise(config: AppConfig) -> Result<Self> {
        let store = Store::open(&config.data_dir)?;
        let state = Self::new(store, Arc::new(config));
        if let (Some(email), Some(password)) =
            (&state.config.admin_email, &state.config.admin_password)
        {
            state.accounts.ensure_admin(email, password)?;
        }
        state.accounts.purge_expired_sessions()?;
        Ok(state)
    }
}
