//! 인증 및 권한 부여.
//!
//! # 구성 요소
//!
//! - [`TokenCodec`]: JWT 발급/검증
//! - [`CredentialVerifier`]: 비밀번호 검증 및 교체
//! - [`AuthenticationService`]: 로그인, 재발급, 로그아웃
//! - [`AccessGate`]: 요청 단위 인증/인가 판정
//! - [`AccessPolicy`]: 데이터로 정의한 라우트 접근 규칙
//! - [`access_gate`], [`CurrentIdentity`]: Axum 미들웨어와 추출기
//!
//! # 구성 예시
//!
//! ```rust,ignore
//! let codec = TokenCodec::new(&config.auth.signing_secret, None);
//! let verifier = CredentialVerifier::new(store.clone());
//! let service = AuthenticationService::new(verifier, codec.clone(), TokenSettings::default());
//! let gate = AccessGate::new(codec, store, AccessPolicy::default_policy());
//! ```

mod context;
mod gate;
mod jwt;
mod middleware;
mod password;
mod policy;
mod service;
mod verifier;

pub use context::RequestContext;
pub use gate::{bearer_token, AccessGate, GateDecision, GateRejection};
pub use jwt::{Claims, IssuedToken, TokenCodec, TokenError};
pub use middleware::{access_gate, AuthContext, CurrentIdentity};
pub use password::{
    hash_password, needs_rehash, validate_password_strength, verify_password, PasswordError,
    StrengthViolation,
};
pub use policy::{Access, AccessPolicy, PathPattern, PolicyError, RouteRule};
pub use service::{AuthError, AuthenticationService, LoginTokens, TokenSettings};
pub use verifier::{CredentialVerifier, VerifyError};
