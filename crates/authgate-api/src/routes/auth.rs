//! 인증 endpoint.
//!
//! 로그인, 토큰 재발급, 로그아웃, 비밀번호 변경을 제공합니다.
//!
//! # 엔드포인트
//!
//! - `POST /login`, `POST /auth/login` - 로그인
//! - `POST /auth/refresh-token` - Access Token 재발급 (Bearer Refresh Token)
//! - `POST /auth/logout` - 로그아웃 (항상 200)
//! - `PUT /auth/credential` - 비밀번호 변경 (인증 필요)

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    middleware,
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{bearer_token, CurrentIdentity, LoginTokens};
use crate::error::{ApiError, ApiResponse, ApiResult, ResponseCode};
use crate::middleware::{rate_limit_middleware, RateLimitState};
use crate::state::AppState;

// ==================== 요청/응답 타입 ====================

/// 로그인 요청.
///
/// `email`, `password` 필드명도 허용합니다.
#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// 로그인 이름 (이메일)
    #[serde(alias = "email")]
    #[validate(length(min = 1, max = 255, message = "로그인 이름은 1-255자여야 합니다"))]
    pub username: String,

    /// 비밀번호
    #[serde(alias = "password")]
    #[validate(length(min = 1, max = 1024, message = "비밀번호를 입력하세요"))]
    pub secret: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// 로그인/재발급 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Access Token
    pub access_token: String,
    /// Refresh Token
    pub refresh_token: String,
    /// 항상 "Bearer"
    pub token_type: String,
    /// Access Token 만료까지 남은 시간 (초)
    pub expires_in: i64,
    /// Refresh Token 만료까지 남은 시간 (초)
    pub refresh_expires_in: i64,
}

impl From<LoginTokens> for LoginResponse {
    fn from(tokens: LoginTokens) -> Self {
        Self {
            access_token: tokens.access.token,
            refresh_token: tokens.refresh.token,
            token_type: "Bearer".to_string(),
            expires_in: tokens.access.expires_in_secs,
            refresh_expires_in: tokens.refresh.expires_in_secs,
        }
    }
}

/// 로그아웃 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    /// 폐기 목록에서 토큰이 폐기되었는지 여부
    pub revoked: bool,
}

/// 비밀번호 변경 요청.
#[derive(Deserialize, Validate, ToSchema)]
pub struct ChangeCredentialRequest {
    /// 현재 비밀번호
    #[serde(alias = "current_password")]
    #[validate(length(min = 1, message = "현재 비밀번호를 입력하세요"))]
    pub current_secret: String,

    /// 새 비밀번호
    #[serde(alias = "new_password")]
    #[validate(length(min = 1, max = 1024, message = "새 비밀번호를 입력하세요"))]
    pub new_secret: String,
}

// ==================== 핸들러 ====================

/// 로그인.
///
/// 사용자 없음과 비밀번호 불일치는 같은 401 A005로 응답합니다.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = ApiResponse<LoginResponse>),
        (status = 400, description = "잘못된 요청", body = crate::error::ApiErrorResponse),
        (status = 401, description = "인증 실패 (A005)", body = crate::error::ApiErrorResponse),
        (status = 429, description = "요청 한도 초과 (C006)", body = crate::error::ApiErrorResponse),
        (status = 500, description = "서버 오류")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    let Json(request) = payload?;
    request.validate()?;

    debug!(username = %request.username, "POST /auth/login");

    let tokens = state.auth.login(&request.username, &request.secret).await?;
    Ok(ApiResponse::success(LoginResponse::from(tokens)))
}

/// Access Token 재발급.
#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    responses(
        (status = 200, description = "재발급 성공", body = ApiResponse<LoginResponse>),
        (status = 401, description = "유효하지 않은 Refresh Token", body = crate::error::ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<ApiResponse<LoginResponse>> {
    let token = bearer_token(&headers).ok_or_else(|| ApiError::new(ResponseCode::Unauthorized))?;

    let tokens = state.auth.refresh(token).await?;
    Ok(ApiResponse::success(LoginResponse::from(tokens)))
}

/// 로그아웃.
///
/// 토큰이 없거나 폐기 목록 처리에 실패해도 200으로 응답합니다.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "로그아웃 완료", body = ApiResponse<LogoutResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResponse<LogoutResponse> {
    let revoked = match bearer_token(&headers) {
        Some(token) => match state.auth.logout(token).await {
            Ok(revoked) => revoked,
            Err(e) => {
                warn!(error = %e, "Token revocation failed during logout");
                false
            }
        },
        None => false,
    };

    ApiResponse::success(LogoutResponse { revoked })
}

/// 비밀번호 변경.
///
/// 성공하면 사용자의 모든 토큰이 폐기되므로 다시 로그인해야 합니다.
#[utoipa::path(
    put,
    path = "/auth/credential",
    request_body = ChangeCredentialRequest,
    responses(
        (status = 200, description = "변경 완료"),
        (status = 400, description = "새 비밀번호 요건 미충족 (C003)", body = crate::error::ApiErrorResponse),
        (status = 401, description = "인증 실패", body = crate::error::ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn change_credential(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
    payload: Result<Json<ChangeCredentialRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<Option<String>>> {
    let Json(request) = payload?;
    request.validate()?;

    state
        .auth
        .change_credential(&identity, &request.current_secret, &request.new_secret)
        .await?;

    Ok(ApiResponse::success(None))
}

// ==================== 라우터 ====================

/// 인증 라우터 생성.
///
/// `login_limit`이 있으면 로그인 경로에만 요청 제한을 적용합니다.
pub fn auth_router(login_limit: Option<RateLimitState>) -> Router<Arc<AppState>> {
    let login_routes = Router::new()
        .route("/login", post(login))
        .route("/auth/login", post(login));

    let login_routes = match login_limit {
        Some(limit) => {
            login_routes.route_layer(middleware::from_fn_with_state(limit, rate_limit_middleware))
        }
        None => login_routes,
    };

    Router::new()
        .merge(login_routes)
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/auth/credential", put(change_credential))
}
