//! Host header allow-list.
//!
//! Only enforced in production, where the service answers for a fixed set of
//! domains. Patterns may be exact host names, `*.example.com` for any
//! subdomain, or `*` for everything.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::Response,
};

use crate::{config::Config, error::AppError};

#[derive(Debug, Clone)]
pub struct TrustedHosts {
    enforce: bool,
    patterns: Arc<Vec<String>>,
}

impl TrustedHosts {
    pub fn new(enforce: bool, patterns: Vec<String>) -> Self {
        Self {
            enforce,
            patterns: Arc::new(patterns.into_iter().map(|p| p.to_ascii_lowercase()).collect()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.is_production(), config.allowed_hosts())
    }

    /// Whether a request carrying this `Host` value may proceed.
    pub fn allows(&self, host: Option<&str>) -> bool {
        if !self.enforce {
            return true;
        }
        let Some(host) = host.map(strip_port) else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        self.patterns.iter().any(|pattern| {
            if pattern == "*" {
                return true;
            }
            match pattern.strip_prefix("*.") {
                Some(suffix) => host
                    .strip_suffix(suffix)
                    .is_some_and(|prefix| prefix.ends_with('.')),
                None => *pattern == host,
            }
        })
    }
}

/// `example.com:8000` -> `example.com`, `[::1]:8000` -> `[::1]`.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}

pub async fn trusted_host_middleware(
    State(hosts): State<TrustedHosts>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().host());

    if hosts.allows(host) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(host = ?host, path = %request.uri().path(), "request for untrusted host rejected");
    Err(AppError::BadRequest("Invalid host header".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production(patterns: &[&str]) -> TrustedHosts {
        TrustedHosts::new(true, patterns.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn not_enforced_outside_production() {
        let hosts = TrustedHosts::new(false, vec!["api.yourdomain.com".into()]);
        assert!(hosts.allows(Some("evil.example")));
        assert!(hosts.allows(None));
    }

    #[test]
    fn exact_match_ignores_port_and_case() {
        let hosts = production(&["api.yourdomain.com"]);
        assert!(hosts.allows(Some("API.yourdomain.com:443")));
        assert!(!hosts.allows(Some("yourdomain.com")));
        assert!(!hosts.allows(None));
    }

    #[test]
    fn wildcard_subdomains() {
        let hosts = production(&["*.vercel.app"]);
        assert!(hosts.allows(Some("genbi-backend-5.vercel.app")));
        assert!(!hosts.allows(Some("vercel.app")));
        assert!(!hosts.allows(Some("evilvercel.app")));

        assert!(production(&["*"]).allows(Some("anything.test")));
    }

    #[test]
    fn ipv6_port_is_stripped() {
        assert_eq!(strip_port("[::1]:8000"), "[::1]");
        assert_eq!(strip_port("localhost:8000"), "localhost");
        assert_eq!(strip_port("localhost"), "localhost");
    }
}
