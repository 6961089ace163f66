//! Token Registry Repository
//!
//! `tokens` 테이블에 발급 토큰의 지문과 상태를 기록합니다.

use async_trait::async_trait;
use authgate_core::{fingerprint, StoreResult, TokenRecord, TokenRegistry};
use sqlx::MySqlPool;

use super::map_sqlx_error;

/// MySQL 토큰 폐기 목록.
#[derive(Debug, Clone)]
pub struct MySqlTokenRegistry {
    pool: MySqlPool,
}

impl MySqlTokenRegistry {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRegistry for MySqlTokenRegistry {
    async fn record(&self, record: TokenRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tokens (token_hash, token_type, expired, revoked, user_name)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.fingerprint)
        .bind(record.kind.as_str())
        .bind(record.expired)
        .bind(record.revoked)
        .bind(&record.username)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn is_active(&self, token: &str) -> StoreResult<bool> {
        let row: Option<(bool, bool)> =
            sqlx::query_as("SELECT expired, revoked FROM tokens WHERE token_hash = ?")
                .bind(fingerprint(token))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(matches!(row, Some((false, false))))
    }

    async fn revoke(&self, token: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE tokens SET expired = TRUE, revoked = TRUE WHERE token_hash = ?",
        )
        .bind(fingerprint(token))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for(&self, username: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET expired = TRUE, revoked = TRUE
            WHERE user_name = ?
              AND expired = FALSE
              AND revoked = FALSE
            "#,
        )
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1 FROM tokens LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}
