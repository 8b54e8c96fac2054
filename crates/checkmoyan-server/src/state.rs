use std::sync::Arc;

use anyhow::Result;

use checkmoyan_core::{
    config::Config, entitlements::Entitlements, payments::PaymentConfig, store::EntitlementStore,
};

use crate::auth::password::hash_password;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Entitlement engine over the storage backend chosen at startup.
    pub entitlements: Arc<Entitlements>,

    /// Payment contacts, pricing and limits, loaded once from the secrets file.
    pub payments: Arc<PaymentConfig>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Argon2id hash of the admin password. The plaintext is not retained.
    admin_password_hash: Option<String>,
}

impl AppState {
    /// Wire the engine to `store` with the limits from `payments`.
    ///
    /// Hashes the configured admin password, if any, with
    /// `config.argon2_memory_kb`.
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        config: Config,
        payments: PaymentConfig,
    ) -> Result<Self> {
        let admin_password_hash = match config.admin_password.as_deref() {
            Some(pw) => Some(hash_password(pw, config.argon2_memory_kb)?),
            None => None,
        };
        let entitlements = Entitlements::new(store, payments.limits(), config.timezone);
        Ok(Self {
            entitlements: Arc::new(entitlements),
            payments: Arc::new(payments),
            config: Arc::new(config),
            admin_password_hash,
        })
    }

    pub fn admin_password_hash(&self) -> Option<&str> {
        self.admin_password_hash.as_deref()
    }
}
