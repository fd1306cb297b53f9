/// Per-client rate limiting with Redis-backed counters
///
/// Fixed window: every client may make `max_requests` requests per
/// `window_secs`. The counter lives in Redis under
/// `studiobook:ratelimit:{client}` and is created by the client's first
/// request with a TTL of one window, so all API instances share it.
///
/// Clients are identified by the socket peer address. The first
/// `X-Forwarded-For` hop is only used when `TRUST_PROXY` is enabled, i.e.
/// when the server sits behind a proxy that overwrites that header.
///
/// Health checks (`/api/health...`) and paths containing `/test` are never
/// counted.
///
/// # Headers
///
/// Every counted response carries:
/// - `X-RateLimit-Limit`: Requests allowed per window
/// - `X-RateLimit-Remaining`: Requests left in the current window
/// - `X-RateLimit-Reset`: Unix timestamp at which the window ends
///
/// Rejected requests get `429` with `Retry-After`. When Redis cannot be
/// reached the request is answered with `503`.
///
/// # Implementation
///
/// One Lua script keeps increment and expiry atomic:
/// ```lua
/// local count = redis.call('INCR', KEYS[1])
/// if count == 1 or redis.call('TTL', KEYS[1]) < 0 then
///     redis.call('EXPIRE', KEYS[1], ARGV[1])
/// end
/// return {count, redis.call('TTL', KEYS[1])}
/// ```

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::{aio::ConnectionManager, RedisError, Script};
use std::net::SocketAddr;

const KEY_PREFIX: &str = "studiobook:ratelimit:";

const WINDOW_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('TTL', KEYS[1]) < 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return {count, redis.call('TTL', KEYS[1])}
"#;

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,

    /// Whole seconds until the window ends, at least 1
    pub reset_after: u64,
}

impl Decision {
    /// Interprets the counter value and TTL returned by the window script
    pub fn from_counter(count: i64, ttl_secs: i64, limit: u32) -> Self {
        let limit_i64 = i64::from(limit);

        Decision {
            allowed: count <= limit_i64,
            limit,
            remaining: (limit_i64 - count).clamp(0, limit_i64) as u32,
            reset_after: ttl_secs.max(1) as u64,
        }
    }
}

/// Fixed-window limiter over a shared Redis connection
#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    script: Script,
    window_secs: u64,
    max_requests: u32,
}

impl RateLimiter {
    /// Connects to Redis at `url`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or Redis cannot be reached.
    pub async fn connect(url: &str, window_secs: u64, max_requests: u32) -> Result<Self, RedisError> {
        let client = redis::Client::open(url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            redis,
            script: Script::new(WINDOW_SCRIPT),
            window_secs: window_secs.max(1),
            max_requests,
        })
    }

    /// Counts one request from `client`
    pub async fn check(&self, client: &str) -> Result<Decision, RedisError> {
        let mut conn = self.redis.clone();

        let (count, ttl): (i64, i64) = self
            .script
            .key(format!("{KEY_PREFIX}{client}"))
            .arg(self.window_secs)
            .invoke_async(&mut conn)
            .await?;

        Ok(Decision::from_counter(count, ttl, self.max_requests))
    }
}

fn is_exempt(path: &str) -> bool {
    path.starts_with("/api/health") || path.contains("/test")
}

/// Socket peer address, or the first `X-Forwarded-For` hop behind a trusted proxy
fn client_key(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());

        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(headers: &mut HeaderMap, decision: &Decision) {
    let reset_at = chrono::Utc::now().timestamp() + decision.reset_after as i64;

    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at));
}

/// Rate limiting middleware
///
/// A no-op when no limiter is configured (`REDIS_URL` unset outside
/// production).
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return next.run(request).await;
    };

    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let client = client_key(&request, state.config.rate_limit.trust_proxy);

    let decision = match limiter.check(&client).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!(error = %e, client = %client, "Rate limit check failed");
            return ApiError::ServiceUnavailable("Rate limit service unavailable".to_string())
                .into_response();
        }
    };

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
        ApiError::RateLimited {
            retry_after: decision.reset_after,
            message: "Too many requests, please try again later".to_string(),
        }
        .into_response()
    };

    apply_headers(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(peer: [u8; 4], forwarded: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/v1/studios");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }

        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 4000))));
        request
    }

    #[test]
    fn test_decision_within_limit() {
        let first = Decision::from_counter(1, 900, 3);
        assert!(first.allowed);
        assert_eq!(first.remaining, 2);
        assert_eq!(first.reset_after, 900);

        let last = Decision::from_counter(3, 12, 3);
        assert!(last.allowed);
        assert_eq!(last.remaining, 0);
    }

    #[test]
    fn test_decision_over_limit() {
        let blocked = Decision::from_counter(4, 40, 3);
        assert!(!blocked.allowed);
        assert_eq!(blocked.remaining, 0);
        assert_eq!(blocked.reset_after, 40);
    }

    #[test]
    fn test_decision_reset_is_at_least_one_second() {
        assert_eq!(Decision::from_counter(1, 0, 3).reset_after, 1);
        assert_eq!(Decision::from_counter(1, -2, 3).reset_after, 1);
    }

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/api/health"));
        assert!(is_exempt("/api/health/db"));
        assert!(is_exempt("/api/v1/test/reset"));
        assert!(!is_exempt("/api/v1/bookings"));
    }

    #[test]
    fn test_forwarded_for_ignored_without_trusted_proxy() {
        for hop in ["10.9.9.1", "10.9.9.2", "10.9.9.3"] {
            let request = request_from([198, 51, 100, 7], Some(hop));
            assert_eq!(client_key(&request, false), "198.51.100.7");
        }
    }

    #[test]
    fn test_forwarded_for_used_behind_trusted_proxy() {
        let request = request_from([10, 0, 0, 2], Some("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_key(&request, true), "203.0.113.7");

        let request = request_from([10, 0, 0, 2], None);
        assert_eq!(client_key(&request, true), "10.0.0.2");
    }

    #[test]
    fn test_client_key_without_peer() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_key(&request, false), "unknown");
    }
}
