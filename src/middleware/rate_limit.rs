//! IP-keyed rate limiting for the credential-bearing routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

use crate::error::AppError;

pub type IpRateLimiter =
    Arc<RateLimiter<SocketAddr, DashMapStateStore<SocketAddr>, DefaultClock>>;

/// Keyed limiter allowing `per_second` sustained requests with a `burst`
/// allowance per client IP.
pub fn create_ip_rate_limiter(per_second: u32, burst: u32) -> IpRateLimiter {
    let per_second = NonZeroU32::new(per_second.max(1)).expect("clamped to at least 1");
    let burst = NonZeroU32::new(burst.max(1)).expect("clamped to at least 1");
    let quota = Quota::per_second(per_second).allow_burst(burst);

    Arc::new(RateLimiter::dashmap(quota))
}


/// Limits by the first `x-forwarded-for` hop, falling back to the socket
/// address. A request whose IP cannot be determined passes through with a
/// warning rather than being dropped.
pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let forwarded_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<std::net::IpAddr>().ok());

    let addr = if let Some(ip) = forwarded_ip {
        Some(SocketAddr::new(ip, 0))
    } else {
        request
            .extensions()
            .get::<axum::extract::ConnectInfo<SocketAddr>>()
            .map(|axum::extract::ConnectInfo(addr)| *addr)
    };

    match addr {
        Some(addr) => match limiter.check_key(&addr) {
            Ok(_) => Ok(next.run(request).await),
            Err(negative) => {
                let wait_time = negative.wait_time_from(DefaultClock::default().now());
                tracing::warn!(ip = %addr.ip(), "rate limit exceeded");
                Err(AppError::TooManyRequests(Some(wait_time.as_secs())))
            }
        },
        None => {
            tracing::warn!("could not determine client IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}
