//! Axum 접근 게이트 미들웨어 및 추출기.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .layer(middleware::from_fn_with_state(gate, access_gate));
//!
//! async fn me(CurrentIdentity(identity): CurrentIdentity) -> impl IntoResponse {
//!     format!("Hello, {}!", identity.username)
//! }
//! ```

use authgate_core::Identity;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::context::RequestContext;
use super::gate::{AccessGate, GateDecision};
use crate::error::{ApiError, ResponseCode};
use crate::metrics::record_gate_decision;

/// 접근 게이트 미들웨어 함수.
///
/// 통과하면 [`RequestContext`]를 요청 extensions에 넣고 다음 핸들러를 호출합니다.
/// 거부되면 핸들러를 호출하지 않고 실패 봉투로 응답합니다.
pub async fn access_gate(
    State(gate): State<AccessGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let decision = gate
        .evaluate(request.method(), request.uri().path(), request.headers())
        .await;

    match decision {
        GateDecision::Authorized(context) => {
            record_gate_decision(if context.is_authenticated() {
                "authorized"
            } else {
                "permitted"
            });
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        GateDecision::Rejected(rejection) => {
            record_gate_decision(rejection.label());
            ApiError::from(rejection)
                .with_request_info(request.method(), request.uri())
                .into_response()
        }
    }
}

/// 인증된 사용자 추출기.
///
/// 게이트가 넣은 컨텍스트에 신원이 없으면 401 A001.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .and_then(RequestContext::identity)
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(|| {
                ApiError::new(ResponseCode::Unauthorized)
                    .with_request_info(&parts.method, &parts.uri)
            })
    }
}

/// 요청 컨텍스트 추출기. 익명 요청이면 빈 컨텍스트.
#[derive(Debug, Clone)]
pub struct AuthContext(pub RequestContext);

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AuthContext(
            parts
                .extensions
                .get::<RequestContext>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}
