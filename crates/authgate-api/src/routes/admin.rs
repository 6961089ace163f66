//! 관리자 endpoint.
//!
//! 기본 정책에서 `/admin/**`는 `ADMIN` 역할이 필요합니다.

use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CurrentIdentity;
use crate::error::ApiResponse;
use crate::state::AppState;

/// 서버 상태 요약.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminStatusResponse {
    /// API 버전
    pub version: String,
    /// 서버 업타임(초)
    pub uptime_secs: i64,
    /// 토큰 폐기 목록 사용 여부
    pub revocation_enabled: bool,
    /// 접근 규칙 수
    pub access_rules: usize,
    /// 요청한 관리자
    pub requested_by: String,
}

/// 서버 상태 조회.
///
/// GET /admin/status
#[utoipa::path(
    get,
    path = "/admin/status",
    responses(
        (status = 200, description = "서버 상태", body = ApiResponse<AdminStatusResponse>),
        (status = 401, description = "인증 필요", body = crate::error::ApiErrorResponse),
        (status = 403, description = "권한 없음 (A002)", body = crate::error::ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn admin_status(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
) -> ApiResponse<AdminStatusResponse> {
    ApiResponse::success(AdminStatusResponse {
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        revocation_enabled: state.has_token_registry(),
        access_rules: state.gate.policy().rules().len(),
        requested_by: identity.username,
    })
}

/// 관리자 라우터.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(admin_status))
}
