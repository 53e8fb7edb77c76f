use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::app::AppState;
use crate::auth::extractors::ClientIp;
use crate::error::AppError;

/// Upper bound on the number of clients tracked at once.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// In-memory sliding-window rate limiter keyed by client IP.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    max_keys: usize,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests: usize::try_from(max_requests.max(1)).unwrap_or(usize::MAX),
            window: Duration::from_secs(window_secs.max(1)),
            max_keys: MAX_TRACKED_CLIENTS,
            hits: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys.max(1);
        self
    }

    /// `Ok(())` if the request may go through (and counts it), or
    /// `Err(seconds_until_retry)` if `key` is over its budget.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        let mut map = self.hits.lock().unwrap_or_else(PoisonError::into_inner);

        if !map.contains_key(key) && map.len() >= self.max_keys {
            self.make_room(&mut map, now);
        }

        let hits = map.entry(key.to_string()).or_default();
        while hits
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            let retry_after = hits
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(retry_after.as_secs().max(1));
        }

        hits.push_back(now);
        Ok(())
    }

    /// Drops clients idle for a whole window; if the map is still full, the
    /// client whose last hit is the oldest goes.
    fn make_room(&self, map: &mut HashMap<String, VecDeque<Instant>>, now: Instant) {
        map.retain(|_, hits| {
            hits.back()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });
        if map.len() < self.max_keys {
            return;
        }

        let stalest = map
            .iter()
            .min_by_key(|(_, hits)| hits.back().copied())
            .map(|(key, _)| key.clone());
        if let Some(key) = stalest {
            map.remove(&key);
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.hits.lock().map(|map| map.len()).unwrap_or_default()
    }
}

/// Middleware placed in front of `/auth/login` and the password reset routes.
pub async fn limit_by_ip(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let ClientIp(ip) = ClientIp::from_parts(&parts, state.trusted_proxies);

    if let Err(retry_after_secs) = state.rate_limiter.check(&ip) {
        tracing::warn!(%ip, retry_after_secs, "Login rate limit exceeded");
        return AppError::TooManyRequests { retry_after_secs }.into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_refuses() {
        let limiter = RateLimiter::new(3, 60);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", now).is_ok());
        }
        assert_eq!(limiter.check_at("10.0.0.1", now), Err(60));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("a", now).is_ok());
        assert!(limiter.check_at("b", now).is_ok());
        assert!(limiter.check_at("a", now).is_err());
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();

        assert!(limiter.check_at("ip", start).is_ok());
        assert!(limiter.check_at("ip", start + Duration::from_secs(30)).is_ok());

        let later = start + Duration::from_secs(45);
        assert_eq!(limiter.check_at("ip", later), Err(15));

        // the first hit has left the window
        assert!(limiter.check_at("ip", start + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn tracked_clients_stay_bounded() {
        let limiter = RateLimiter::new(5, 60).with_max_keys(3);
        let now = Instant::now();

        for n in 0..50 {
            let at = now + Duration::from_millis(n);
            assert!(limiter.check_at(&format!("10.0.0.{n}"), at).is_ok());
            assert!(limiter.tracked_clients() <= 3);
        }
    }

    #[test]
    fn idle_clients_are_dropped_before_active_ones() {
        let limiter = RateLimiter::new(1, 60).with_max_keys(2);
        let start = Instant::now();

        assert!(limiter.check_at("idle", start).is_ok());
        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("active", later).is_ok());
        assert!(limiter.check_at("new", later).is_ok());

        // "active" kept its budget: it is still refused
        assert!(limiter.check_at("active", later).is_err());
        assert_eq!(limiter.tracked_clients(), 2);
    }
}
