//! JWT 인증 게이트 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 토큰 발급/검증 ([`auth::TokenCodec`])
//! - 비밀번호 검증 ([`auth::CredentialVerifier`])
//! - 로그인/재발급/로그아웃 ([`auth::AuthenticationService`])
//! - 요청 단위 인증/인가 ([`auth::AccessGate`])
//! - 로그인 요청 제한, Prometheus 메트릭, OpenAPI 문서
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`app`]: 전체 라우터 조립
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: JWT 인증 및 접근 제어
//! - [`repository`]: MySQL 데이터 접근 협력자
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어
//! - [`openapi`]: OpenAPI 문서 및 Swagger UI

pub mod app;
pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod state;

pub use app::{create_router, RouterOptions};
pub use auth::{
    AccessGate, AccessPolicy, AuthenticationService, Claims, CredentialVerifier, CurrentIdentity,
    TokenCodec,
};
pub use error::{ApiError, ApiErrorResponse, ApiResponse, ApiResult, ResponseCode};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use state::AppState;
