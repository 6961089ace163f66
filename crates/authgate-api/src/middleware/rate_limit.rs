//! 로그인 요청 제한 middleware.
//!
//! 클라이언트 IP별 토큰 버킷. 버킷 용량은 분당 허용량 전체이며 1분에 걸쳐
//! 연속으로 채워집니다. 로그인 라우트에만 `route_layer`로 붙습니다.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use authgate_core::RateLimitSettings;

use crate::error::{ApiError, ResponseCode};
use crate::metrics::record_rate_limit;

/// 요청 제한 설정.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 클라이언트당 분당 로그인 시도 수
    pub requests_per_minute: u32,
    /// `X-Forwarded-For`/`X-Real-IP`를 클라이언트 주소로 인정할지 여부.
    /// 프록시 뒤에서만 켭니다. 꺼져 있으면 헤더 위조로 제한을 피할 수 없습니다.
    pub trust_forwarded_for: bool,
    /// 이 시간 동안 요청이 없던 클라이언트의 버킷은 정리됩니다
    pub idle_ttl: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(30)
    }
}

impl RateLimitConfig {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            trust_forwarded_for: false,
            idle_ttl: Duration::from_secs(300),
        }
    }

    /// `[rate_limit]` 설정에서 생성.
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self {
            trust_forwarded_for: settings.trust_forwarded_for,
            ..Self::new(settings.login_per_minute)
        }
    }

    fn capacity(&self) -> f64 {
        f64::from(self.requests_per_minute.max(1))
    }

    /// 초당 보충량.
    fn refill_per_sec(&self) -> f64 {
        self.capacity() / 60.0
    }
}

/// 요청 제한 판정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Limited {
        /// `Retry-After` 초 (최소 1)
        retry_after: u64,
    },
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    available: f64,
    updated_at: Instant,
}

/// 클라이언트 IP별 로그인 시도 제한기.
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    buckets: Arc<Mutex<HashMap<IpAddr, Bucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 현재 시각 기준으로 시도 하나를 소모합니다.
    pub async fn check(&self, client: IpAddr) -> Admission {
        self.check_at(client, Instant::now()).await
    }

    /// `now` 시각 기준 판정. 처음 보는 클라이언트는 가득 찬 버킷으로 시작합니다.
    pub async fn check_at(&self, client: IpAddr, now: Instant) -> Admission {
        let capacity = self.config.capacity();
        let rate = self.config.refill_per_sec();

        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(client).or_insert(Bucket {
            available: capacity,
            updated_at: now,
        });

        let elapsed = now.saturating_duration_since(bucket.updated_at).as_secs_f64();
        bucket.available = (bucket.available + elapsed * rate).min(capacity);
        bucket.updated_at = bucket.updated_at.max(now);

        if bucket.available >= 1.0 {
            bucket.available -= 1.0;
            return Admission::Allowed;
        }

        let wait = (1.0 - bucket.available) / rate;
        Admission::Limited {
            retry_after: (wait.ceil() as u64).max(1),
        }
    }

    /// `now` 기준 `idle_ttl` 이상 갱신되지 않은 버킷을 제거하고 제거 수를 반환합니다.
    pub async fn prune_idle_at(&self, now: Instant) -> usize {
        let ttl = self.config.idle_ttl;
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.updated_at) < ttl);
        before - buckets.len()
    }

    /// 추적 중인 클라이언트 수.
    pub async fn tracked_clients(&self) -> usize {
        self.buckets.lock().await.len()
    }

    /// `idle_ttl` 주기로 유휴 버킷을 정리하는 태스크. `shutdown` 취소 시 종료합니다.
    pub fn spawn_cleanup(&self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        let period = self.config.idle_ttl;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let pruned = limiter.prune_idle_at(Instant::now()).await;
                        if pruned > 0 {
                            debug!(pruned, "Pruned idle login rate limit buckets");
                        }
                    }
                }
            }
            debug!("Rate limiter cleanup task stopped");
        })
    }
}

/// 미들웨어 상태.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: RateLimiter,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: RateLimiter::new(config),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

/// 로그인 요청 제한 미들웨어.
///
/// 초과 시 429 `C006` 실패 봉투와 `Retry-After` 헤더로 응답합니다.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request, state.limiter.config().trust_forwarded_for);

    match state.limiter.check(client).await {
        Admission::Allowed => {
            record_rate_limit("allowed");
            next.run(request).await
        }
        Admission::Limited { retry_after } => {
            record_rate_limit("limited");
            warn!(client_ip = %client, retry_after, "Login rate limit exceeded");

            ApiError::new(ResponseCode::TooManyRequests)
                .with_request_info(request.method(), request.uri())
                .with_retry_after(retry_after)
                .into_response()
        }
    }
}

fn forwarded_ip(request: &Request) -> Option<IpAddr> {
    let headers = request.headers();
    let first_hop = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse().ok())
    };

    first_hop("x-forwarded-for").or_else(|| first_hop("x-real-ip"))
}

/// 클라이언트 주소. 연결 정보가 없으면 (테스트, `oneshot`) loopback.
fn client_ip(request: &Request, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_ip(request) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
