//! 외부 데이터 접근 협력자 trait.
//!
//! 인증 계층은 영속성 계층을 직접 알지 못합니다. 아래 trait을 구현한
//! 협력자가 조회와 쓰기를 담당하며, 쓰기 직렬화(트랜잭션)도 협력자 책임입니다.

use async_trait::async_trait;

use super::{Identity, TokenRecord};
use crate::error::StoreResult;

/// 사용자 신원 저장소.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// 로그인 이름으로 신원 조회.
    ///
    /// 없으면 `Ok(None)`. 저장소 장애는 `StoreError::Unavailable`.
    async fn find_identity_by_username(&self, username: &str) -> StoreResult<Option<Identity>>;

    /// 비밀번호 해시 교체.
    ///
    /// 대상이 없으면 `StoreError::NotFound`.
    async fn update_credential_hash(&self, username: &str, credential_hash: &str)
        -> StoreResult<()>;

    /// 연결 상태 확인 (readiness probe용).
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// 발급 토큰 폐기 목록.
///
/// 짧은 수명의 토큰만으로 충분한 배포에서는 사용하지 않아도 됩니다.
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    /// 발급된 토큰 기록.
    async fn record(&self, record: TokenRecord) -> StoreResult<()>;

    /// 기록되어 있고 폐기되지 않은 토큰인지 확인.
    async fn is_active(&self, token: &str) -> StoreResult<bool>;

    /// 단일 토큰 폐기. 기록이 있었으면 `true`.
    async fn revoke(&self, token: &str) -> StoreResult<bool>;

    /// 사용자의 활성 토큰 전체 폐기. 폐기된 개수를 반환합니다.
    async fn revoke_all_for(&self, username: &str) -> StoreResult<u64>;

    /// 연결 상태 확인 (readiness probe용).
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
