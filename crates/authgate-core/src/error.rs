//! 인증 계층의 공통 에러 타입.
//!
//! 외부 데이터 접근 협력자(IdentityStore, TokenRegistry)와 설정 로딩에서
//! 발생하는 에러를 정의합니다.

use thiserror::Error;

/// 데이터 접근 협력자 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 저장소에 연결할 수 없음 (DB 다운, 풀 고갈 등)
    #[error("저장소를 사용할 수 없습니다: {0}")]
    Unavailable(String),

    /// 대상 레코드가 없음
    #[error("레코드를 찾을 수 없음: {0}")]
    NotFound(String),

    /// 중복 등 무결성 충돌
    #[error("저장소 충돌: {0}")]
    Conflict(String),

    /// 저장된 데이터 형식이 잘못됨
    #[error("잘못된 저장 데이터: {0}")]
    Corrupt(String),
}

/// 저장소 작업을 위한 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// 호출자가 재시도할 수 있는 에러인지 확인합니다.
    ///
    /// 이 크레이트는 재시도하지 않습니다. 판단은 호출자 몫입니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// 설정 로딩/검증 에러.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// 파일/환경변수 로딩 실패
    #[error("설정 로딩 실패: {0}")]
    Load(#[from] ::config::ConfigError),

    /// 값 검증 실패
    #[error("잘못된 설정: {0}")]
    Invalid(String),
}
