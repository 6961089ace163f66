//! Identity Repository
//!
//! `users` 테이블에서 로그인 이름(이메일)으로 신원을 조회합니다.

use async_trait::async_trait;
use authgate_core::{parse_role_list, Identity, IdentityStore, StoreError, StoreResult};
use sqlx::{FromRow, MySqlPool};

use super::map_sqlx_error;

// ================================================================================================
// Types
// ================================================================================================

/// `users` 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRow {
    pub user_id: String,
    #[sqlx(default)]
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    /// 쉼표로 구분된 역할 목록
    #[sqlx(default)]
    pub roles: Option<String>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = StoreError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        let roles = parse_role_list(row.roles.as_deref().unwrap_or_default()).map_err(|bad| {
            StoreError::Corrupt(format!("{} (user {})", bad, row.user_id))
        })?;

        let identity = Identity::new(row.user_id, row.email, row.password).with_roles(roles);
        Ok(match row.name {
            Some(name) => identity.with_name(name),
            None => identity,
        })
    }
}

// ================================================================================================
// Repository
// ================================================================================================

/// MySQL 신원 저장소.
#[derive(Debug, Clone)]
pub struct MySqlIdentityStore {
    pool: MySqlPool,
}

impl MySqlIdentityStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for MySqlIdentityStore {
    async fn find_identity_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT user_id, name, email, password, roles
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Identity::try_from).transpose()
    }

    async fn update_credential_hash(
        &self,
        username: &str,
        credential_hash: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE email = ?")
            .bind(credential_hash)
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(username.to_string()));
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_core::Role;

    fn row(roles: Option<&str>) -> IdentityRow {
        IdentityRow {
            user_id: "u-100".to_string(),
            name: Some("홍길동".to_string()),
            email: "hong@example.com".to_string(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            roles: roles.map(str::to_string),
        }
    }

    #[test]
    fn test_row_to_identity() {
        let identity = Identity::try_from(row(Some("admin, user"))).unwrap();

        assert_eq!(identity.id, "u-100");
        assert_eq!(identity.username, "hong@example.com");
        assert_eq!(identity.name.as_deref(), Some("홍길동"));
        assert!(identity.roles.contains(&Role::admin()));
        assert!(identity.roles.contains(&Role::user()));
        assert!(identity.credential_hash().starts_with("$argon2id$"));
    }

    #[test]
    fn test_row_without_roles() {
        let identity = Identity::try_from(row(None)).unwrap();
        assert!(identity.roles.is_empty());
    }

    #[test]
    fn test_row_with_invalid_role_is_corrupt() {
        let err = Identity::try_from(row(Some("admin,bad role!"))).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
