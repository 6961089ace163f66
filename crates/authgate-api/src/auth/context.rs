//! 요청 단위 인증 컨텍스트.

use authgate_core::Identity;

use super::jwt::Claims;

/// 요청 범위 인증 정보.
///
/// 게이트가 요청 extensions에 넣고, 요청과 함께 폐기됩니다.
/// 허용(permit) 경로에서는 익명 컨텍스트가 들어갑니다.
#[derive(Clone, Default)]
pub struct RequestContext {
    identity: Option<Identity>,
    token: Option<String>,
    claims: Option<Claims>,
}

impl RequestContext {
    /// 익명 컨텍스트.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 인증된 컨텍스트.
    pub fn authenticated(identity: Identity, token: impl Into<String>, claims: Claims) -> Self {
        Self {
            identity: Some(identity),
            token: Some(token.into()),
            claims: Some(claims),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("identity", &self.identity)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("claims", &self.claims.as_ref().map(|c| &c.jti))
            .finish()
    }
}
