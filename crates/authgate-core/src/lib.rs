//! # Authgate Core
//!
//! 인증 게이트의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 인증 계층 전반에서 사용되는 기본 타입을 제공합니다:
//! - 사용자 신원(Identity) 및 역할(Role)
//! - 외부 데이터 접근 협력자 trait (IdentityStore, TokenRegistry)
//! - 테스트 및 DB 미사용 환경을 위한 인메모리 구현
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use self::config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
