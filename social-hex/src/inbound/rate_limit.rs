//! Fixed-window rate limiting middleware.
//!
//! Each client key gets `limit` requests per `window`. Counters live in a
//! sharded `DashMap`; an elapsed window is reset lazily on the next request
//! from that key, and a single background sweeper evicts idle keys so memory
//! stays bounded.

use std::{
    net::SocketAddr,
    sync::{Arc, Weak},
    time::Duration,
};

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde_json::json;
use tokio::{task::JoinHandle, time::Instant};

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub permitted: bool,
    /// Zero when permitted, otherwise the full window length.
    pub retry_after: Duration,
}

#[derive(Debug)]
struct Window {
    count: u32,
    started: Instant,
}

/// Per-key fixed-window counter shared across requests.
pub struct FixedWindowLimiter {
    windows: DashMap<String, Window>,
    limit: u32,
    window: Duration,
    trust_forwarded: bool,
}

impl FixedWindowLimiter {
    /// Creates a limiter allowing `limit` requests per `window` for each key.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
            trust_forwarded: true,
        }
    }

    /// Whether `X-Forwarded-For` / `X-Real-IP` identify the client. Turn off
    /// unless a proxy in front overwrites them, since callers control both.
    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }

    /// Counts a request for `key` and decides whether it may proceed.
    pub fn allow(&self, key: &str) -> Admission {
        let now = Instant::now();

        // Over-budget keys are answered under the shared shard lock.
        if let Some(entry) = self.windows.get(key) {
            if !self.elapsed(&entry, now) && entry.count >= self.limit {
                return self.rejected();
            }
        }

        let mut entry = self.windows.entry(key.to_owned()).or_insert(Window {
            count: 0,
            started: now,
        });

        if self.elapsed(&entry, now) {
            *entry = Window {
                count: 0,
                started: now,
            };
        }

        if entry.count >= self.limit {
            return self.rejected();
        }

        entry.count += 1;
        Admission {
            permitted: true,
            retry_after: Duration::ZERO,
        }
    }

    /// Number of keys currently holding a counter.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drops every counter whose window has elapsed. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        // `retain` holds each shard's write lock, so a window re-opened by a
        // concurrent `allow` is seen here and kept.
        self.windows.retain(|_, w| now.duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Spawns the single background sweeper. It stops once the limiter is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let limiter: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                let evicted = limiter.sweep();
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = limiter.tracked_keys(), "rate limiter sweep");
                }
            }
        })
    }

    fn elapsed(&self, window: &Window, now: Instant) -> bool {
        now.duration_since(window.started) >= self.window
    }

    fn rejected(&self) -> Admission {
        Admission {
            permitted: false,
            retry_after: self.window,
        }
    }
}

/// Identifies the caller: first `X-Forwarded-For` hop, then `X-Real-IP`,
/// then the peer address. Forwarding headers are skipped unless `trust_forwarded`.
pub fn client_key(request: &Request<Body>, trust_forwarded: bool) -> String {
    let headers = request.headers();

    if !trust_forwarded {
        return peer_ip(request);
    }

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    peer_ip(request)
}

fn peer_ip(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware. Rejects with 429 and `Retry-After` in seconds.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&request, limiter.trust_forwarded);
    let admission = limiter.allow(&key);

    if !admission.permitted {
        let secs = admission.retry_after.as_secs_f64().ceil() as u64;
        tracing::warn!(client = %key, method = %request.method(), path = %request.uri().path(), "rate limit exceeded");

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": format!("rate limit exceeded, retry after: {}s", secs),
                "code": 429
            })),
        )
            .into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(secs));
        return response;
    }

    next.run(request).await
}
