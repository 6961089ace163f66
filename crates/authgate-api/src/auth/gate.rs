//! 요청 접근 게이트.
//!
//! 요청마다 다음 순서로 판정합니다.
//!
//! 1. 정책에서 규칙 조회. `Permit`이면 토큰을 보지 않고 통과.
//! 2. `Authorization: Bearer` 헤더가 없으면 `Unauthenticated`.
//! 3. 토큰 검증 (서명, 만료, 종류), 폐기 목록 확인.
//! 4. `sub`로 신원 조회. 조회된 신원의 ID가 `uid`와 다르면 무효.
//! 5. 요구 역할이 신원의 역할에 모두 포함되는지 확인.
//!
//! [`AccessGate::evaluate`]는 어떤 경우에도 [`GateDecision`]을 반환합니다.

use std::sync::Arc;

use authgate_core::{IdentityStore, TokenRegistry};
use axum::http::{header::AUTHORIZATION, HeaderMap, Method};
use tracing::{debug, error, warn};

use super::context::RequestContext;
use super::jwt::{TokenCodec, TokenError};
use super::policy::{Access, AccessPolicy};

/// 게이트 거부 사유.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateRejection {
    /// 토큰 없음
    #[error("인증이 필요합니다")]
    Unauthenticated,
    /// 토큰 만료
    #[error("인증 토큰이 만료되었습니다")]
    TokenExpired,
    /// 서명/형식/종류 오류, 폐기된 토큰, 알 수 없는 주체
    #[error("유효하지 않은 토큰입니다")]
    InvalidToken,
    /// 역할 부족
    #[error("접근 권한이 없습니다")]
    Forbidden,
    /// 신원 저장소 장애
    #[error("인증 저장소를 사용할 수 없습니다")]
    Unavailable(String),
}

impl GateRejection {
    /// 메트릭 라벨.
    pub fn label(&self) -> &'static str {
        match self {
            GateRejection::Unauthenticated => "unauthenticated",
            GateRejection::TokenExpired => "expired",
            GateRejection::InvalidToken => "invalid_token",
            GateRejection::Forbidden => "forbidden",
            GateRejection::Unavailable(_) => "unavailable",
        }
    }
}

impl From<TokenError> for GateRejection {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => GateRejection::TokenExpired,
            _ => GateRejection::InvalidToken,
        }
    }
}

/// 게이트 판정 결과.
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// 통과. 허용 경로에서는 익명 컨텍스트.
    Authorized(RequestContext),
    Rejected(GateRejection),
}

impl GateDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, GateDecision::Authorized(_))
    }
}

/// `Authorization` 헤더에서 Bearer 토큰 추출.
///
/// 스킴은 대소문자를 구분하지 않습니다. 빈 토큰은 `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// 요청 접근 게이트.
#[derive(Clone)]
pub struct AccessGate {
    codec: TokenCodec,
    store: Arc<dyn IdentityStore>,
    policy: Arc<AccessPolicy>,
    registry: Option<Arc<dyn TokenRegistry>>,
}

impl AccessGate {
    /// 새 게이트 생성.
    pub fn new(codec: TokenCodec, store: Arc<dyn IdentityStore>, policy: AccessPolicy) -> Self {
        Self {
            codec,
            store,
            policy: Arc::new(policy),
            registry: None,
        }
    }

    /// 폐기 목록 확인 활성화.
    #[must_use]
    pub fn with_token_registry(mut self, registry: Arc<dyn TokenRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 적용 중인 정책.
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// 요청을 판정합니다.
    pub async fn evaluate(&self, method: &Method, path: &str, headers: &HeaderMap) -> GateDecision {
        let required = match self.policy.resolve(method, path) {
            Access::Permit => return GateDecision::Authorized(RequestContext::anonymous()),
            Access::Authenticated => None,
            Access::Roles(roles) => Some(roles),
        };

        let Some(token) = bearer_token(headers) else {
            debug!(%method, path, "No bearer token presented");
            return GateDecision::Rejected(GateRejection::Unauthenticated);
        };

        let claims = match self.codec.validate_access(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(%method, path, error = %e, "Token rejected");
                return GateDecision::Rejected(e.into());
            }
        };

        if let Some(registry) = &self.registry {
            match registry.is_active(token).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(username = %claims.sub, "Token revoked or not recorded");
                    return GateDecision::Rejected(GateRejection::InvalidToken);
                }
                Err(e) => {
                    error!(error = %e, "Token registry unavailable");
                    return GateDecision::Rejected(GateRejection::Unavailable(e.to_string()));
                }
            }
        }

        let identity = match self.store.find_identity_by_username(&claims.sub).await {
            Ok(Some(identity)) if identity.id == claims.uid => identity,
            Ok(Some(identity)) => {
                warn!(
                    username = %claims.sub,
                    token_uid = %claims.uid,
                    identity_id = %identity.id,
                    "Token issued to a different identity with the same username"
                );
                return GateDecision::Rejected(GateRejection::InvalidToken);
            }
            Ok(None) => {
                warn!(username = %claims.sub, "Token subject not found");
                return GateDecision::Rejected(GateRejection::InvalidToken);
            }
            Err(e) => {
                error!(error = %e, "Identity store unavailable");
                return GateDecision::Rejected(GateRejection::Unavailable(e.to_string()));
            }
        };

        if let Some(required) = required {
            if !identity.has_roles(required) {
                debug!(
                    username = %identity.username,
                    %method,
                    path,
                    "Required roles missing"
                );
                return GateDecision::Rejected(GateRejection::Forbidden);
            }
        }

        GateDecision::Authorized(RequestContext::authenticated(identity, token, claims))
    }
}
