//! MariaDB/MySQL 기반 데이터 접근 협력자.
//!
//! [`IdentityStore`](authgate_core::IdentityStore)와
//! [`TokenRegistry`](authgate_core::TokenRegistry)를 sqlx로 구현합니다.
//! `database.url`이 없으면 `authgate_core`의 인메모리 구현을 사용합니다.

pub mod identities;
pub mod tokens;

pub use identities::{IdentityRow, MySqlIdentityStore};
pub use tokens::MySqlTokenRegistry;

use authgate_core::StoreError;

/// sqlx 에러를 저장소 에러로 변환.
///
/// 연결 문제와 알 수 없는 에러는 `Unavailable`로 취급합니다.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(err.to_string())
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}
