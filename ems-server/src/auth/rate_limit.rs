//! Application-layer rate limiting for public routes

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::security_log;
use crate::state::AppState;

struct IpEntry {
    count: u32,
    window_start: Instant,
}

/// Per-route limit: `max_requests` per `window_secs` per client IP
#[derive(Debug, Clone, Copy)]
pub struct RateRule {
    pub route: &'static str,
    pub max_requests: u32,
    pub window_secs: u64,
}

pub const LOGIN: RateRule = RateRule {
    route: "login",
    max_requests: 5,
    window_secs: 60,
};
pub const REGISTRATION: RateRule = RateRule {
    route: "registration",
    max_requests: 10,
    window_secs: 60,
};
pub const COUPON_VALIDATE: RateRule = RateRule {
    route: "coupon_validate",
    max_requests: 20,
    window_secs: 60,
};
pub const PANEL_INTEREST: RateRule = RateRule {
    route: "panel_interest",
    max_requests: 3,
    window_secs: 60,
};
pub const STAFF_VERIFY: RateRule = RateRule {
    route: "staff_verify",
    max_requests: 120,
    window_secs: 60,
};

/// Entries idle longer than this are dropped by [`RateLimiter::cleanup`]
const ENTRY_TTL: Duration = Duration::from_secs(300);

#[derive(Clone, Default)]
pub struct RateLimiter {
    /// route name -> (IP -> entry)
    inner: Arc<Mutex<HashMap<&'static str, HashMap<String, IpEntry>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub async fn check(&self, rule: RateRule, ip: &str) -> bool {
        let mut map = self.inner.lock().await;
        let route_map = map.entry(rule.route).or_default();
        let now = Instant::now();

        let entry = route_map.entry(ip.to_owned()).or_insert_with(|| IpEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start).as_secs() >= rule.window_secs {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= rule.max_requests
    }

    /// Remove entries older than 5 minutes
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        for route_map in map.values_mut() {
            route_map.retain(|_, entry| now.duration_since(entry.window_start) < ENTRY_TTL);
        }
        map.retain(|_, route_map| !route_map.is_empty());
    }

    #[cfg(test)]
    async fn tracked_ips(&self) -> usize {
        self.inner.lock().await.values().map(HashMap::len).sum()
    }
}

/// Extract client IP: X-Forwarded-For header first (load balancer), then peer address.
pub fn extract_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

async fn enforce(
    state: &AppState,
    rule: RateRule,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = extract_ip(&request);
    if !state.rate_limiter.check(rule, &ip).await {
        security_log!("WARN", "rate_limited", route = rule.route, ip = ip);
        return Err(AppError::too_many_requests());
    }
    Ok(next.run(request).await)
}

/// Admin login: 5 requests/minute per IP
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, LOGIN, request, next).await
}

/// Registration: 10 requests/minute per IP
pub async fn registration_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, REGISTRATION, request, next).await
}

/// Coupon validation: 20 requests/minute per IP
pub async fn coupon_validate_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, COUPON_VALIDATE, request, next).await
}

/// Panel interest form: 3 requests/minute per IP
pub async fn panel_interest_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, PANEL_INTEREST, request, next).await
}

/// Door scanners: 120 requests/minute per IP
pub async fn staff_verify_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, STAFF_VERIFY, request, next).await
}
