//! 토큰 종류 및 폐기 목록 레코드.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 토큰 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// API 접근용
    Access,
    /// Access Token 재발급용
    Refresh,
}

impl TokenKind {
    /// 저장/직렬화용 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }

    /// 문자열에서 토큰 종류 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "access" | "bearer" => Some(TokenKind::Access),
            "refresh" => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 토큰 지문 (SHA-256, hex).
///
/// 폐기 목록에는 원본 토큰 대신 지문만 저장합니다.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// 폐기 목록 레코드.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// 토큰 지문
    pub fingerprint: String,
    /// 토큰 종류
    pub kind: TokenKind,
    /// 소유자 로그인 이름
    pub username: String,
    /// 만료 처리 여부
    pub expired: bool,
    /// 폐기 여부
    pub revoked: bool,
    /// 토큰 자체의 만료 시각. 지나면 폐기 목록에서 정리할 수 있습니다.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// 발급 직후의 활성 레코드 생성.
    pub fn issued(token: &str, kind: TokenKind, username: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint(token),
            kind,
            username: username.into(),
            expired: false,
            revoked: false,
            expires_at: None,
        }
    }

    /// 토큰 만료 시각 설정.
    #[must_use]
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// 아직 사용 가능한지 확인.
    pub fn is_active(&self) -> bool {
        !self.expired && !self.revoked
    }

    /// `now` 시점에 보관할 필요가 없는 레코드인지 확인 (폐기됨 또는 토큰 만료).
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_active() || self.expires_at.is_some_and(|at| at <= now)
    }

    /// 만료 및 폐기 처리.
    pub fn invalidate(&mut self) {
        self.expired = true;
        self.revoked = true;
    }
}
