//! 인증 서비스.
//!
//! 로그인, 토큰 재발급, 로그아웃, 비밀번호 변경을 조율합니다.
//! 외부로 드러나는 로그인 실패는 [`AuthError::AuthenticationFailed`] 하나뿐입니다.

use std::sync::Arc;

use authgate_core::{
    AuthConfig, Identity, IdentityStore, StoreError, TokenKind, TokenRecord, TokenRegistry,
};
use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use super::jwt::{IssuedToken, TokenCodec, TokenError};
use super::verifier::{CredentialVerifier, VerifyError};
use crate::metrics::record_login;

/// 토큰 수명 설정.
#[derive(Debug, Clone, Copy)]
pub struct TokenSettings {
    /// Access Token 수명
    pub access_ttl: Duration,
    /// Refresh Token 수명
    pub refresh_ttl: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }
}

impl TokenSettings {
    /// `[auth]` 설정 섹션에서 생성.
    ///
    /// 범위는 `AppConfig::validate`가 확인합니다. 표현할 수 없는 값은 `Duration::MAX`가
    /// 되어 발급 시 `TokenError::InvalidTtl`로 거부됩니다.
    pub fn from_config(config: &AuthConfig) -> Self {
        let ttl = |secs: i64| Duration::try_seconds(secs).unwrap_or(Duration::MAX);
        Self {
            access_ttl: ttl(config.access_token_ttl_secs),
            refresh_ttl: ttl(config.refresh_token_ttl_secs),
        }
    }
}

/// 로그인/재발급 결과.
#[derive(Debug, Clone)]
pub struct LoginTokens {
    /// Access Token
    pub access: IssuedToken,
    /// Refresh Token
    pub refresh: IssuedToken,
}

/// 인증 서비스 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// 사용자 없음과 비밀번호 불일치를 구분하지 않습니다.
    #[error("인증에 실패했습니다")]
    AuthenticationFailed,
    #[error("새 비밀번호가 요건을 충족하지 않습니다: {0}")]
    WeakSecret(String),
    #[error("인증 저장소를 사용할 수 없습니다: {0}")]
    Unavailable(String),
    #[error("내부 오류: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Unavailable(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// 인증 서비스.
#[derive(Clone)]
pub struct AuthenticationService {
    verifier: CredentialVerifier,
    codec: TokenCodec,
    settings: TokenSettings,
    registry: Option<Arc<dyn TokenRegistry>>,
}

impl AuthenticationService {
    /// 새 서비스 생성. 폐기 목록은 사용하지 않습니다.
    pub fn new(verifier: CredentialVerifier, codec: TokenCodec, settings: TokenSettings) -> Self {
        Self {
            verifier,
            codec,
            settings,
            registry: None,
        }
    }

    /// 발급 토큰 기록 및 폐기 목록 연결.
    #[must_use]
    pub fn with_token_registry(mut self, registry: Arc<dyn TokenRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 토큰 발급/검증기.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// 토큰 수명 설정.
    pub fn settings(&self) -> TokenSettings {
        self.settings
    }

    /// 폐기 목록 (설정된 경우).
    pub fn token_registry(&self) -> Option<&Arc<dyn TokenRegistry>> {
        self.registry.as_ref()
    }

    /// 로그인.
    ///
    /// 성공하면 Access Token과 Refresh Token을 발급합니다. 폐기 목록이 있으면
    /// 사용자의 기존 토큰을 모두 폐기한 뒤 새 토큰을 기록합니다.
    pub async fn login(&self, username: &str, secret: &str) -> Result<LoginTokens, AuthError> {
        let identity = match self.verifier.verify(username, secret).await {
            Ok(identity) => identity,
            Err(VerifyError::NotFound) | Err(VerifyError::BadCredential) => {
                info!(username = %username, outcome = "rejected", "Login failed");
                record_login("failure");
                return Err(AuthError::AuthenticationFailed);
            }
            Err(VerifyError::Unavailable(reason)) => {
                error!(username = %username, error = %reason, "Identity store unavailable during login");
                record_login("error");
                return Err(AuthError::Unavailable(reason));
            }
            Err(other) => {
                record_login("error");
                return Err(AuthError::Internal(other.to_string()));
            }
        };

        let tokens = LoginTokens {
            access: self
                .codec
                .issue(&identity, &identity.roles, self.settings.access_ttl)?,
            refresh: self
                .codec
                .issue_refresh(&identity, self.settings.refresh_ttl)?,
        };

        if let Some(registry) = &self.registry {
            let revoked = registry.revoke_all_for(&identity.username).await?;
            registry
                .record(
                    TokenRecord::issued(&tokens.access.token, TokenKind::Access, &identity.username)
                        .expiring_at(tokens.access.expires_at),
                )
                .await?;
            registry
                .record(
                    TokenRecord::issued(
                        &tokens.refresh.token,
                        TokenKind::Refresh,
                        &identity.username,
                    )
                    .expiring_at(tokens.refresh.expires_at),
                )
                .await?;

            if revoked > 0 {
                info!(username = %identity.username, revoked, "Previous sessions revoked");
            }
        }

        info!(username = %identity.username, outcome = "success", "Login succeeded");
        record_login("success");
        Ok(tokens)
    }

    /// Refresh Token으로 새 Access Token을 발급합니다.
    ///
    /// Refresh Token은 그대로 돌려줍니다.
    pub async fn refresh(&self, refresh_token: &str) -> Result<LoginTokens, AuthError> {
        let claims = self.codec.validate_refresh(refresh_token).map_err(|e| {
            info!(error = %e, "Refresh token rejected");
            AuthError::AuthenticationFailed
        })?;

        if let Some(registry) = &self.registry {
            if !registry.is_active(refresh_token).await? {
                info!(username = %claims.sub, "Refresh token is not active");
                return Err(AuthError::AuthenticationFailed);
            }
        }

        let identity = self
            .verifier
            .store()
            .find_identity_by_username(&claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(username = %claims.sub, "Refresh token subject no longer exists");
                AuthError::AuthenticationFailed
            })?;

        if identity.id != claims.uid {
            warn!(
                username = %claims.sub,
                token_uid = %claims.uid,
                identity_id = %identity.id,
                "Refresh token issued to a different identity with the same username"
            );
            return Err(AuthError::AuthenticationFailed);
        }

        let access = self
            .codec
            .issue(&identity, &identity.roles, self.settings.access_ttl)?;

        if let Some(registry) = &self.registry {
            registry
                .record(
                    TokenRecord::issued(&access.token, TokenKind::Access, &identity.username)
                        .expiring_at(access.expires_at),
                )
                .await?;
        }

        let expires_at = claims.expires_at();
        let refresh = IssuedToken {
            token: refresh_token.to_string(),
            expires_at,
            expires_in_secs: (expires_at - Utc::now()).num_seconds().max(0),
        };

        info!(username = %identity.username, "Access token refreshed");
        Ok(LoginTokens { access, refresh })
    }

    /// 로그아웃. 제시된 토큰을 폐기합니다.
    ///
    /// 폐기 목록이 없거나 기록에 없는 토큰이면 `Ok(false)`.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        match &self.registry {
            Some(registry) => Ok(registry.revoke(token).await?),
            None => Ok(false),
        }
    }

    /// 비밀번호 변경 후 사용자의 모든 토큰을 폐기합니다.
    pub async fn change_credential(
        &self,
        identity: &Identity,
        current: &str,
        new_secret: &str,
    ) -> Result<(), AuthError> {
        self.verifier
            .rotate_credential(&identity.username, current, new_secret)
            .await
            .map_err(|e| match e {
                VerifyError::NotFound | VerifyError::BadCredential => {
                    AuthError::AuthenticationFailed
                }
                VerifyError::WeakSecret(reason) => AuthError::WeakSecret(reason),
                VerifyError::Unavailable(reason) => AuthError::Unavailable(reason),
            })?;

        if let Some(registry) = &self.registry {
            registry.revoke_all_for(&identity.username).await?;
        }

        info!(username = %identity.username, "Credential changed");
        Ok(())
    }
}
