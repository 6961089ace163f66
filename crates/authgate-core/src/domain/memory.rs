//! 인메모리 협력자 구현.
//!
//! 테스트와 DB 없이 실행하는 개발 환경에서 사용합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{fingerprint, Identity, IdentityStore, TokenRecord, TokenRegistry};
use crate::config::SeedIdentity;
use crate::error::{StoreError, StoreResult};

/// 인메모리 신원 저장소.
#[derive(Debug)]
pub struct MemoryIdentityStore {
    identities: RwLock<HashMap<String, Identity>>,
    available: AtomicBool,
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityStore {
    /// 빈 저장소 생성.
    pub fn new() -> Self {
        Self {
            identities: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// 초기 신원 목록으로 생성.
    pub fn with_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let map = identities
            .into_iter()
            .map(|identity| (identity.username.clone(), identity))
            .collect();

        Self {
            identities: RwLock::new(map),
            available: AtomicBool::new(true),
        }
    }

    /// `[[seed_identities]]` 설정으로 생성.
    pub fn from_seeds(seeds: &[SeedIdentity]) -> Self {
        Self::with_identities(seeds.iter().map(Identity::from))
    }

    /// 신원 등록. 같은 로그인 이름이 있으면 `StoreError::Conflict`.
    pub async fn insert(&self, identity: Identity) -> StoreResult<()> {
        self.ensure_available()?;
        let mut identities = self.identities.write().await;
        if identities.contains_key(&identity.username) {
            return Err(StoreError::Conflict(identity.username));
        }
        identities.insert(identity.username.clone(), identity);
        Ok(())
    }

    /// 등록된 신원 수.
    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    /// 비어 있는지 확인.
    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }

    /// 장애 상황 재현용 스위치.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_identity_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        self.ensure_available()?;
        Ok(self.identities.read().await.get(username).cloned())
    }

    async fn update_credential_hash(
        &self,
        username: &str,
        credential_hash: &str,
    ) -> StoreResult<()> {
        self.ensure_available()?;
        let mut identities = self.identities.write().await;
        let identity = identities
            .remove(username)
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;
        identities.insert(
            username.to_string(),
            identity.with_credential_hash(credential_hash),
        );
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_available()
    }
}

/// 인메모리 토큰 폐기 목록.
///
/// 지문을 키로 레코드를 보관합니다. 새 레코드를 기록할 때 폐기되었거나 만료된
/// 레코드를 정리하므로, 크기는 아직 유효한 토큰 수를 넘지 않습니다.
#[derive(Debug)]
pub struct MemoryTokenRegistry {
    records: RwLock<HashMap<String, TokenRecord>>,
    available: AtomicBool,
}

impl Default for MemoryTokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTokenRegistry {
    /// 빈 목록 생성.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// 장애 상황 재현용 스위치.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory registry offline".to_string()))
        }
    }

    /// `now` 기준으로 보관할 필요가 없는 레코드를 제거하고 제거 수를 반환합니다.
    pub async fn prune_stale_at(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_stale_at(now));
        before - records.len()
    }

    /// 보관 중인 레코드 수 (폐기된 레코드 포함).
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// 비어 있는지 확인.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// 사용자의 활성 토큰 수.
    pub async fn active_count(&self, username: &str) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.username == username && r.is_active())
            .count()
    }
}

#[async_trait]
impl TokenRegistry for MemoryTokenRegistry {
    async fn record(&self, record: TokenRecord) -> StoreResult<()> {
        self.ensure_available()?;
        let now = Utc::now();
        let mut records = self.records.write().await;
        records.retain(|_, existing| !existing.is_stale_at(now));
        records.insert(record.fingerprint.clone(), record);
        Ok(())
    }

    async fn is_active(&self, token: &str) -> StoreResult<bool> {
        self.ensure_available()?;
        Ok(self
            .records
            .read()
            .await
            .get(&fingerprint(token))
            .is_some_and(|record| !record.is_stale_at(Utc::now())))
    }

    async fn revoke(&self, token: &str) -> StoreResult<bool> {
        self.ensure_available()?;
        let mut records = self.records.write().await;
        match records.get_mut(&fingerprint(token)) {
            Some(record) => {
                record.invalidate();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_for(&self, username: &str) -> StoreResult<u64> {
        self.ensure_available()?;
        let mut records = self.records.write().await;
        let mut revoked = 0;
        for record in records
            .values_mut()
            .filter(|r| r.username == username && r.is_active())
        {
            record.invalidate();
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, TokenKind};

    fn identity(username: &str) -> Identity {
        Identity::new(format!("id-{}", username), username, "$argon2id$hash").with_role(Role::user())
    }

    #[tokio::test]
    async fn test_identity_lookup() {
        let store = MemoryIdentityStore::with_identities([identity("alice"), identity("bob")]);

        let found = store.find_identity_by_username("alice").await.unwrap();
        assert_eq!(found.map(|i| i.id), Some("id-alice".to_string()));
        assert!(store.find_identity_by_username("carol").await.unwrap().is_none());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let store = MemoryIdentityStore::new();
        store.insert(identity("alice")).await.unwrap();

        let result = store.insert(identity("alice")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_credential_hash() {
        let store = MemoryIdentityStore::with_identities([identity("alice")]);
        store
            .update_credential_hash("alice", "$argon2id$rotated")
            .await
            .unwrap();

        let found = store
            .find_identity_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.credential_hash(), "$argon2id$rotated");

        let missing = store.update_credential_hash("nobody", "x").await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = MemoryIdentityStore::with_identities([identity("alice")]);
        store.set_available(false);

        let result = store.find_identity_by_username("alice").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store.ping().await.is_err());

        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_registry_revoke_single() {
        let registry = MemoryTokenRegistry::new();
        registry
            .record(TokenRecord::issued("tok-1", TokenKind::Access, "alice"))
            .await
            .unwrap();

        assert!(registry.is_active("tok-1").await.unwrap());
        assert!(!registry.is_active("unknown").await.unwrap());

        assert!(registry.revoke("tok-1").await.unwrap());
        assert!(!registry.is_active("tok-1").await.unwrap());
        assert!(!registry.revoke("unknown").await.unwrap());
    }

    #[tokio::test]
    async fn test_registry_revoke_all_for_user() {
        let registry = MemoryTokenRegistry::new();
        for (token, user) in [("a1", "alice"), ("a2", "alice"), ("b1", "bob")] {
            registry
                .record(TokenRecord::issued(token, TokenKind::Access, user))
                .await
                .unwrap();
        }

        assert_eq!(registry.revoke_all_for("alice").await.unwrap(), 2);
        assert_eq!(registry.revoke_all_for("alice").await.unwrap(), 0);
        assert_eq!(registry.active_count("alice").await, 0);
        assert!(registry.is_active("b1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_registry() {
        let registry = MemoryTokenRegistry::new();
        registry.set_available(false);

        let result = registry
            .record(TokenRecord::issued("tok-1", TokenKind::Access, "alice"))
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(registry.is_active("tok-1").await.is_err());
        assert!(registry.ping().await.is_err());

        registry.set_available(true);
        assert!(registry.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_registry_stays_bounded_across_logins() {
        let registry = MemoryTokenRegistry::new();
        let expires_at = Utc::now() + chrono::Duration::minutes(15);

        for round in 0..1000 {
            registry.revoke_all_for("alice").await.unwrap();
            registry
                .record(
                    TokenRecord::issued(&format!("tok-{}", round), TokenKind::Access, "alice")
                        .expiring_at(expires_at),
                )
                .await
                .unwrap();
        }

        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.active_count("alice").await, 1);
        assert!(registry.is_active("tok-999").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_records_are_inactive_and_pruned() {
        let registry = MemoryTokenRegistry::new();
        let now = Utc::now();
        registry
            .record(
                TokenRecord::issued("old", TokenKind::Access, "bob")
                    .expiring_at(now - chrono::Duration::seconds(1)),
            )
            .await
            .unwrap();
        registry
            .record(
                TokenRecord::issued("live", TokenKind::Refresh, "bob")
                    .expiring_at(now + chrono::Duration::days(7)),
            )
            .await
            .unwrap();

        // 기록 시점에 이미 만료된 레코드는 다음 기록 때 정리됨
        assert!(!registry.is_active("old").await.unwrap());
        assert_eq!(registry.len().await, 1);

        let pruned = registry
            .prune_stale_at(now + chrono::Duration::days(8))
            .await;
        assert_eq!(pruned, 1);
        assert!(registry.is_empty().await);
    }
}
