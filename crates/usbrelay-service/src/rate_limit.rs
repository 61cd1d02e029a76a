//! Per-client sliding-window rate limiting.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Length of the sliding window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Bucket used when the peer address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Default)]
struct Buckets {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl Buckets {
    /// Drop clients with no request inside the window, at most once per window.
    fn sweep(&mut self, now: Instant) {
        let due = self
            .last_sweep
            .is_none_or(|last| now.saturating_duration_since(last) >= WINDOW);
        if !due {
            return;
        }
        self.last_sweep = Some(now);
        self.clients.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|t| now.saturating_duration_since(*t) < WINDOW)
        });
    }
}

/// Limits each client to `limit` requests per [`WINDOW`].
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    /// A limiter allowing `limit` requests per minute. `limit` must be > 0.
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit as usize,
            buckets: Mutex::new(Buckets::default()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of clients currently holding a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().clients.len()
    }

    /// Count a request from `client` at `now`.
    ///
    /// # Errors
    ///
    /// Returns the `Retry-After` value in seconds when the client is over its
    /// limit. Rejected requests are not counted.
    pub fn check(&self, client: &str, now: Instant) -> Result<(), u64> {
        let mut buckets = self.buckets.lock();
        buckets.sweep(now);
        let timestamps = buckets.clients.entry(client.to_string()).or_default();

        while timestamps
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= WINDOW)
        {
            timestamps.pop_front();
        }

        if timestamps.len() >= self.limit {
            let oldest = timestamps.front().copied().unwrap_or(now);
            let remaining = WINDOW.saturating_sub(now.saturating_duration_since(oldest));
            return Err(remaining.as_secs() + 1);
        }

        timestamps.push_back(now);
        Ok(())
    }
}

/// Middleware answering 429 once a client exceeds the configured rate.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiter) = state.limiter.as_deref() {
        let client = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(|| UNKNOWN_CLIENT.to_string(), |info| info.0.ip().to_string());

        if let Err(retry_after) = limiter.check(&client, Instant::now()) {
            debug!(client = %client, retry_after, "Rate limit exceeded");
            return Err(ApiError::RateLimited { retry_after });
        }
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(3);
        let now = Instant::now();
        assert!(limiter.check("10.0.0.1", now).is_ok());
        assert!(limiter.check("10.0.0.1", now).is_ok());
        assert!(limiter.check("10.0.0.1", now).is_ok());
        assert_eq!(limiter.check("10.0.0.1", now), Err(61));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1);
        let now = Instant::now();
        assert!(limiter.check("10.0.0.1", now).is_ok());
        assert!(limiter.check("10.0.0.2", now).is_ok());
        assert!(limiter.check("10.0.0.1", now).is_err());
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        assert!(limiter.check("c", start).is_ok());
        assert!(limiter.check("c", start + Duration::from_secs(30)).is_ok());

        // Oldest request is 45 s old: 15 s left, plus one.
        assert_eq!(
            limiter.check("c", start + Duration::from_secs(45)),
            Err(16)
        );

        // The first request has left the window.
        assert!(limiter.check("c", start + Duration::from_secs(60)).is_ok());
        assert!(limiter.check("c", start + Duration::from_secs(61)).is_err());
    }

    #[test]
    fn test_idle_clients_are_swept() {
        let limiter = RateLimiter::new(5);
        let start = Instant::now();
        for i in 0..100 {
            assert!(limiter.check(&format!("10.0.0.{i}"), start).is_ok());
        }
        assert_eq!(limiter.tracked_clients(), 100);

        // Within the window nothing is dropped.
        assert!(limiter.check("10.0.1.1", start + Duration::from_secs(30)).is_ok());
        assert_eq!(limiter.tracked_clients(), 101);

        // A window later only the client seen at 30 s is still active.
        assert!(limiter.check("10.0.2.1", start + Duration::from_secs(61)).is_ok());
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_rejected_requests_are_not_counted() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        assert!(limiter.check("c", start).is_ok());
        for s in 1..10 {
            assert!(limiter.check("c", start + Duration::from_secs(s)).is_err());
        }
        assert!(limiter.check("c", start + WINDOW).is_ok());
    }
}
