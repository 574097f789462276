//! Shared application state handed to every handler.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::{Config, ConfigError},
    db::DbPool,
    middleware::{TrustedProxies, rate_limit::RateLimiter},
    security::jwt::TokenKeys,
};

/// Everything a request may need. Cloning is cheap: the pool and the rest are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenKeys>,
    pub limiter: Arc<RateLimiter>,
    pub proxies: TrustedProxies,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Result<Self, ConfigError> {
        let limiter = RateLimiter::from_config(&config)?;
        let proxies = TrustedProxies::from_config(&config)?;
        let tokens = TokenKeys::from_config(&config);

        Ok(Self {
            pool,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            limiter: Arc::new(limiter),
            proxies,
        })
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for TrustedProxies {
    fn from_ref(state: &AppState) -> Self {
        state.proxies.clone()
    }
}
