//! Per-client rate limiting.
//!
//! Each limit class (login, registration, booking, general API) has its own
//! token bucket per client address. Limits are written the way operators
//! configure them: `"5/minute"`, `"3/hour"`, `"100/minute"`.

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    config::{Config, ConfigError},
    error::AppError,
    middleware::TrustedProxies,
};

/// Buckets are swept once the map grows past this many entries.
const PRUNE_THRESHOLD: usize = 10_000;

/// `requests` per `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: u32,
    pub period: Duration,
}

#[derive(Debug, thiserror::Error)]
#[error("expected \"<count>/<second|minute|hour|day>\"")]
pub struct ParseRateLimitError;

impl FromStr for RateLimit {
    type Err = ParseRateLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, unit) = s.trim().split_once('/').ok_or(ParseRateLimitError)?;

        let requests: u32 = count.trim().parse().map_err(|_| ParseRateLimitError)?;
        if requests == 0 {
            return Err(ParseRateLimitError);
        }

        let unit = unit.trim().to_ascii_lowercase();
        let seconds = match unit.trim_end_matches('s') {
            "" | "sec" | "second" => 1,
            "m" | "min" | "minute" => 60,
            "h" | "hour" => 60 * 60,
            "d" | "day" => 60 * 60 * 24,
            _ => return Err(ParseRateLimitError),
        };

        Ok(Self {
            requests,
            period: Duration::from_secs(seconds),
        })
    }
}

impl RateLimit {
    fn capacity(&self) -> f64 {
        f64::from(self.requests)
    }

    fn refill_per_sec(&self) -> f64 {
        f64::from(self.requests) / self.period.as_secs_f64()
    }
}

/// Which bucket a route draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitClass {
    Login,
    Register,
    Booking,
    Api,
}

impl fmt::Display for LimitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LimitClass::Login => "login",
            LimitClass::Register => "register",
            LimitClass::Booking => "booking",
            LimitClass::Api => "api",
        })
    }
}

/// A simple token bucket: starts full, refills continuously.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, now: Instant, limit: &RateLimit) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * limit.refill_per_sec()).min(limit.capacity());
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state.
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    limits: HashMap<LimitClass, RateLimit>,
    buckets: Mutex<HashMap<(LimitClass, String), TokenBucket>>,
}

impl RateLimiter {
    pub fn new(enabled: bool, limits: HashMap<LimitClass, RateLimit>) -> Self {
        Self {
            enabled,
            limits,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let classes = [
            LimitClass::Login,
            LimitClass::Register,
            LimitClass::Booking,
            LimitClass::Api,
        ];

        let mut limits = HashMap::new();
        for (class, (name, value)) in classes.into_iter().zip(config.rate_limit_settings()) {
            let limit: RateLimit = value.parse().map_err(|_| ConfigError::RateLimit {
                name,
                value: value.to_string(),
            })?;
            limits.insert(class, limit);
        }

        Ok(Self::new(config.rate_limit_enabled, limits))
    }

    /// Consume one request for `client` in `class`. Returns false when throttled.
    pub fn check(&self, class: LimitClass, client: &str) -> bool {
        self.check_at(class, client, Instant::now())
    }

    fn check_at(&self, class: LimitClass, client: &str, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(limit) = self.limits.get(&class) else {
            return true;
        };

        // A poisoned lock only means another request panicked mid-update; the counters are still usable.
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        if buckets.len() > PRUNE_THRESHOLD {
            self.prune(&mut buckets, now);
        }

        buckets
            .entry((class, client.to_string()))
            .or_insert_with(|| TokenBucket::new(limit.capacity(), now))
            .try_acquire(now, limit)
    }

    /// Drop buckets that have had time to refill completely.
    fn prune(&self, buckets: &mut HashMap<(LimitClass, String), TokenBucket>, now: Instant) {
        buckets.retain(|(class, _), bucket| {
            self.limits
                .get(class)
                .is_some_and(|limit| now.saturating_duration_since(bucket.last_update) < limit.period)
        });
    }
}

/// Middleware function for rate limiting; the state names the limiter, how
/// clients are identified and the bucket class.
pub async fn rate_limit_middleware(
    State((limiter, proxies, class)): State<(Arc<RateLimiter>, TrustedProxies, LimitClass)>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = proxies.client_ip(request.headers(), request.extensions());

    if limiter.check(class, &client) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(
            client = %client,
            path = %request.uri().path(),
            limit = %class,
            "rate limit exceeded"
        );
        Err(AppError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(class: LimitClass, limit: &str) -> RateLimiter {
        RateLimiter::new(true, HashMap::from([(class, limit.parse().unwrap())]))
    }

    #[test]
    fn parses_operator_syntax() {
        let limit: RateLimit = "5/minute".parse().unwrap();
        assert_eq!(limit.requests, 5);
        assert_eq!(limit.period, Duration::from_secs(60));

        assert_eq!("3/hour".parse::<RateLimit>().unwrap().period, Duration::from_secs(3600));
        assert_eq!("1000/day".parse::<RateLimit>().unwrap().requests, 1000);
        assert_eq!("10 / Seconds".parse::<RateLimit>().unwrap().period, Duration::from_secs(1));

        assert!("five/minute".parse::<RateLimit>().is_err());
        assert!("0/minute".parse::<RateLimit>().is_err());
        assert!("5/fortnight".parse::<RateLimit>().is_err());
        assert!("5".parse::<RateLimit>().is_err());
    }

    #[test]
    fn bucket_allows_burst_then_throttles() {
        let limiter = limiter(LimitClass::Login, "5/minute");
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at(LimitClass::Login, "10.0.0.1", now));
        }
        assert!(!limiter.check_at(LimitClass::Login, "10.0.0.1", now));
    }

    #[test]
    fn bucket_refills_over_time() {
        let limiter = limiter(LimitClass::Login, "5/minute");
        let start = Instant::now();

        for _ in 0..5 {
            limiter.check_at(LimitClass::Login, "10.0.0.1", start);
        }
        assert!(!limiter.check_at(LimitClass::Login, "10.0.0.1", start));

        // One token every 12 seconds
        let later = start + Duration::from_secs(12);
        assert!(limiter.check_at(LimitClass::Login, "10.0.0.1", later));
        assert!(!limiter.check_at(LimitClass::Login, "10.0.0.1", later));
    }

    #[test]
    fn clients_and_classes_are_isolated() {
        let limiter = RateLimiter::new(
            true,
            HashMap::from([
                (LimitClass::Register, "1/hour".parse().unwrap()),
                (LimitClass::Api, "1/hour".parse().unwrap()),
            ]),
        );
        let now = Instant::now();

        assert!(limiter.check_at(LimitClass::Register, "a", now));
        assert!(!limiter.check_at(LimitClass::Register, "a", now));
        assert!(limiter.check_at(LimitClass::Register, "b", now));
        assert!(limiter.check_at(LimitClass::Api, "a", now));
    }

    #[test]
    fn disabled_limiter_and_unknown_class_pass() {
        let disabled = RateLimiter::new(false, HashMap::from([(LimitClass::Login, "1/hour".parse().unwrap())]));
        let now = Instant::now();
        assert!(disabled.check_at(LimitClass::Login, "a", now));
        assert!(disabled.check_at(LimitClass::Login, "a", now));

        let only_login = limiter(LimitClass::Login, "1/hour");
        assert!(only_login.check_at(LimitClass::Booking, "a", now));
        assert!(only_login.check_at(LimitClass::Booking, "a", now));
    }

    #[test]
    fn prune_drops_refilled_buckets() {
        let limiter = limiter(LimitClass::Api, "1/second");
        let start = Instant::now();
        limiter.check_at(LimitClass::Api, "a", start);

        let mut buckets = limiter.buckets.lock().unwrap();
        limiter.prune(&mut buckets, start + Duration::from_secs(2));
        assert!(buckets.is_empty());
    }

    #[test]
    fn built_from_config_defaults() {
        let config = Config::from_vars(Vec::new()).unwrap();
        let limiter = RateLimiter::from_config(&config).unwrap();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at(LimitClass::Register, "x", now));
        }
        assert!(!limiter.check_at(LimitClass::Register, "x", now));
    }
}
