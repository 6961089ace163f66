//! JWT 토큰 처리.
//!
//! HS256으로 서명된 Access Token / Refresh Token 발급과 검증.
//! 키는 프로세스 시작 시 한 번 만들어 모든 요청이 공유합니다.

use std::sync::Arc;

use authgate_core::{Identity, RoleSet, TokenKind};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// JWT 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 로그인 이름
    pub sub: String,
    /// 외부 사용자 ID
    pub uid: String,
    /// 발급 시점의 역할
    pub roles: RoleSet,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
    /// 토큰 종류
    pub typ: TokenKind,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// 새로운 Claims 생성.
    ///
    /// # Arguments
    ///
    /// * `identity` - 토큰 주체
    /// * `roles` - 토큰에 담을 역할
    /// * `kind` - 토큰 종류
    /// * `issued_at` - 발급 시각
    /// * `ttl` - 유효 기간
    ///
    /// 만료 시각이 표현 가능한 범위를 넘으면 `TokenError::InvalidTtl`.
    pub fn new(
        identity: &Identity,
        roles: &RoleSet,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or(TokenError::InvalidTtl)?;

        Ok(Self {
            sub: identity.username.clone(),
            uid: identity.id.clone(),
            roles: roles.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            typ: kind,
            iss: None,
        })
    }

    /// 토큰이 만료되었는지 확인.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// 만료 시각.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// 발급된 토큰.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// 인코딩된 JWT 문자열
    pub token: String,
    /// 만료 시각
    pub expires_at: DateTime<Utc>,
    /// 만료까지 남은 시간 (초)
    pub expires_in_secs: i64,
}

/// 토큰 처리 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("잘못된 토큰 형식")]
    Malformed,
    #[error("토큰이 만료되었습니다")]
    Expired,
    #[error("토큰 서명이 올바르지 않습니다")]
    InvalidSignature,
    #[error("토큰 종류가 올바르지 않습니다 (기대값: {expected})")]
    WrongTokenType { expected: TokenKind },
    #[error("토큰 유효 기간은 0보다 크고 표현 가능한 범위 안이어야 합니다")]
    InvalidTtl,
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

struct CodecKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
}

/// 토큰 발급/검증기.
///
/// 부작용이 없고, 복제 비용이 낮습니다 (키는 `Arc` 뒤에 있음).
#[derive(Clone)]
pub struct TokenCodec {
    keys: Arc<CodecKeys>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("issuer", &self.keys.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// 서명 키와 선택적 issuer로 생성.
    pub fn new(secret: &SecretString, issuer: Option<String>) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);
        if let Some(iss) = &issuer {
            validation.set_issuer(&[iss]);
        }

        Self {
            keys: Arc::new(CodecKeys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                validation,
                issuer,
            }),
        }
    }

    /// Access Token 발급.
    ///
    /// # Arguments
    ///
    /// * `identity` - 토큰 주체
    /// * `roles` - 토큰에 담을 역할
    /// * `ttl` - 유효 기간 (0보다 커야 함)
    pub fn issue(
        &self,
        identity: &Identity,
        roles: &RoleSet,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_kind(identity, roles, TokenKind::Access, ttl)
    }

    /// Refresh Token 발급.
    pub fn issue_refresh(&self, identity: &Identity, ttl: Duration) -> Result<IssuedToken, TokenError> {
        self.issue_kind(identity, &identity.roles, TokenKind::Refresh, ttl)
    }

    fn issue_kind(
        &self,
        identity: &Identity,
        roles: &RoleSet,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        if ttl <= Duration::zero() {
            return Err(TokenError::InvalidTtl);
        }

        let claims = Claims::new(identity, roles, kind, Utc::now(), ttl)?;
        let token = self.sign(&claims)?;

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
            expires_in_secs: ttl.num_seconds(),
        })
    }

    /// 주어진 Claims에 서명합니다.
    ///
    /// 설정된 issuer가 있으면 `iss`를 덮어씁니다.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let owned;
        let claims = match &self.keys.issuer {
            Some(iss) if claims.iss.as_ref() != Some(iss) => {
                owned = Claims {
                    iss: Some(iss.clone()),
                    ..claims.clone()
                };
                &owned
            }
            _ => claims,
        };

        encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// 토큰 디코딩 및 검증.
    ///
    /// 서명, 만료(leeway 0), 필수 클레임을 확인합니다. 토큰 종류는 확인하지 않습니다.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.keys.decoding, &self.keys.validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)
    }

    /// Access Token 검증.
    pub fn validate_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_kind(token, TokenKind::Access)
    }

    /// Refresh Token 검증.
    pub fn validate_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_kind(token, TokenKind::Refresh)
    }

    fn validate_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.validate(token)?;
        if claims.typ != expected {
            return Err(TokenError::WrongTokenType { expected });
        }
        Ok(claims)
    }
}
