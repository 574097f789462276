//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Throttle clients
//! - Short-circuit requests (reject unauthorized or untrusted ones)

use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{Extensions, HeaderMap, request::Parts},
};

use crate::config::{Config, ConfigError};

/// Bearer token authentication middleware
pub mod auth;
/// Per-client request throttling
pub mod rate_limit;
/// Host header allow-list for production
pub mod trusted_host;

/// Reverse proxies whose `X-Forwarded-For` header is believed.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<Vec<IpAddr>>);

impl TrustedProxies {
    pub fn new(proxies: Vec<IpAddr>) -> Self {
        Self(Arc::new(proxies))
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.trusted_proxies()?))
    }

    fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }

    /// Address used to key per-client limits and audit logs.
    ///
    /// This is the socket peer. `X-Forwarded-For` is only consulted when the
    /// peer itself is a trusted proxy, and then the right-most hop that is not
    /// a trusted proxy wins. Without connection info the result is `"unknown"`.
    pub fn client_ip(&self, headers: &HeaderMap, extensions: &Extensions) -> String {
        let Some(ConnectInfo(peer)) = extensions.get::<ConnectInfo<SocketAddr>>() else {
            return "unknown".to_string();
        };
        let peer = peer.ip();

        if !self.contains(&peer) {
            return peer.to_string();
        }

        let forwarded = headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
            .collect::<Vec<_>>();

        forwarded
            .into_iter()
            .rev()
            .find(|hop| !self.contains(hop))
            .unwrap_or(peer)
            .to_string()
    }
}

/// Client address as resolved by [`TrustedProxies::client_ip`], used for audit logging.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    TrustedProxies: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let proxies = TrustedProxies::from_ref(state);
        Ok(ClientIp(proxies.client_ip(&parts.headers, &parts.extensions)))
    }
}
