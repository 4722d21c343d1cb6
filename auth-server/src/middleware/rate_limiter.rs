// auth-server/src/middleware/rate_limiter.rs
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Instant, Duration};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{header, StatusCode},
    Error, ResponseError,
    HttpResponse
};
use common::RateLimitConfig;
use dashmap::DashMap;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error("Rate limit exceeded")]
struct RateLimitExceeded {
    retry_after_secs: u64,
}

impl ResponseError for RateLimitExceeded {
    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, self.retry_after_secs.to_string()))
            .json(json!({
                "error": "Rate limit exceeded. Please try again later."
            }))
    }
}

// Drop idle clients from the store every this many checks
const SWEEP_EVERY: usize = 256;

/// Sliding-window request limit per client IP on selected path prefixes.
///
/// Clients are keyed by the TCP peer address. `Forwarded` / `X-Forwarded-For`
/// are only believed when the peer is one of the trusted proxies.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Arc<Vec<String>>,
    max_requests: usize,
    window: Duration,
    trusted_proxies: Arc<Vec<IpAddr>>,
    // Request times per client IP, oldest first
    store: Arc<DashMap<String, Vec<Instant>>>,
    checks: Arc<AtomicUsize>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, max_requests: usize, window: Duration) -> Self {
        Self {
            paths: Arc::new(paths),
            max_requests,
            window,
            trusted_proxies: Arc::new(Vec::new()),
            store: Arc::new(DashMap::new()),
            checks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = Arc::new(proxies);
        self
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        // Entries are checked by Config::validate
        let proxies = config
            .trusted_proxies
            .iter()
            .filter_map(|proxy| proxy.parse().ok())
            .collect();

        Self::new(
            config.paths.clone(),
            config.max_requests,
            Duration::from_secs(config.window_secs),
        )
        .with_trusted_proxies(proxies)
    }

    fn applies_to(&self, path: &str) -> bool {
        self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    fn client_key(&self, req: &ServiceRequest) -> String {
        let peer = match req.peer_addr() {
            Some(addr) => addr.ip(),
            None => return "unknown".to_string(),
        };

        if self.trusted_proxies.contains(&peer) {
            if let Some(forwarded) = req.connection_info().realip_remote_addr() {
                return forwarded.to_string();
            }
        }
        peer.to_string()
    }

    fn sweep(&self, now: Instant) {
        let window = self.window;
        self.store.retain(|_, hits| {
            hits.last().map_or(false, |last| now.duration_since(*last) < window)
        });
    }

    fn tracked_clients(&self) -> usize {
        self.store.len()
    }

    fn is_rate_limited(&self, ip: &str) -> bool {
        let now = Instant::now();
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now);
        }

        let mut hits = self.store.entry(ip.to_string()).or_default();

        hits.retain(|time| now.duration_since(*time) < self.window);

        if hits.len() >= self.max_requests {
            true
        } else {
            hits.push(now);
            false
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.limiter.applies_to(req.path()) {
            let ip = self.limiter.client_key(&req);

            if self.limiter.is_rate_limited(&ip) {
                tracing::warn!("Rate limit exceeded for IP: {} on {}", ip, req.path());

                let retry_after_secs = self.limiter.window.as_secs().max(1);
                return Box::pin(async move {
                    Err(RateLimitExceeded { retry_after_secs }.into())
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            fut.await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_ip() {
        let limiter = RateLimiter::new(vec!["/login".into()], 2, Duration::from_secs(60));
        assert!(!limiter.is_rate_limited("10.0.0.1"));
        assert!(!limiter.is_rate_limited("10.0.0.1"));
        assert!(limiter.is_rate_limited("10.0.0.1"));
        assert!(!limiter.is_rate_limited("10.0.0.2"));
    }

    #[test]
    fn test_window_expires() {
        let limiter = RateLimiter::new(vec!["/login".into()], 1, Duration::from_millis(20));
        assert!(!limiter.is_rate_limited("10.0.0.1"));
        assert!(limiter.is_rate_limited("10.0.0.1"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(!limiter.is_rate_limited("10.0.0.1"));
    }

    #[test]
    fn test_idle_clients_are_swept() {
        let limiter = RateLimiter::new(vec!["/login".into()], 5, Duration::from_millis(20));
        for i in 0..10 {
            limiter.is_rate_limited(&format!("10.0.0.{}", i));
        }
        assert_eq!(limiter.tracked_clients(), 10);

        std::thread::sleep(Duration::from_millis(30));
        limiter.is_rate_limited("10.0.1.1");
        limiter.sweep(Instant::now());
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_sweep_runs_periodically() {
        let limiter = RateLimiter::new(vec!["/login".into()], 1, Duration::from_millis(10));
        for i in 0..SWEEP_EVERY - 1 {
            limiter.is_rate_limited(&format!("client-{}", i));
        }
        std::thread::sleep(Duration::from_millis(20));
        limiter.is_rate_limited("fresh");
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_from_config_reads_trusted_proxies() {
        let config = RateLimitConfig {
            trusted_proxies: vec!["10.0.0.1".into()],
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::from_config(&config);
        assert_eq!(*limiter.trusted_proxies, vec!["10.0.0.1".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn test_path_prefixes() {
        let limiter = RateLimiter::from_config(&RateLimitConfig::default());
        assert!(limiter.applies_to("/login"));
        assert!(limiter.applies_to("/invite"));
        assert!(!limiter.applies_to("/validate-session"));
        assert!(!limiter.applies_to("/user"));
    }
}
