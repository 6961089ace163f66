//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/login`, `/auth/login` - 로그인
//! - `/auth/refresh-token` - Access Token 재발급
//! - `/auth/logout` - 로그아웃
//! - `/auth/credential` - 비밀번호 변경
//! - `/me` - 현재 사용자
//! - `/admin/status` - 서버 상태 (ADMIN)
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/metrics` - Prometheus 메트릭

pub mod admin;
pub mod auth;
pub mod health;
pub mod me;

pub use admin::{admin_router, AdminStatusResponse};
pub use auth::{
    auth_router, ChangeCredentialRequest, LoginRequest, LoginResponse, LogoutResponse,
};
pub use health::{
    health_router, ComponentHealth, ComponentState, ComponentStatus, HealthResponse,
};
pub use me::{me_router, MeResponse};

use axum::{extract::State, routing::get, Router};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult, ResponseCode};
use crate::middleware::RateLimitState;
use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// `login_limit`은 로그인 경로에만 적용됩니다.
pub fn create_api_router(login_limit: Option<RateLimitState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth_router(login_limit))
        .merge(me_router())
        .nest("/admin", admin_router())
        .nest("/health", health_router())
        .route("/metrics", get(metrics_handler))
}

/// /metrics 엔드포인트 핸들러.
///
/// 레코더가 설치되지 않았으면 404.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> ApiResult<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| ApiError::new(ResponseCode::NotFound))
}
