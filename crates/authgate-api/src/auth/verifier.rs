//! 자격증명 검증.
//!
//! 로그인 이름으로 신원을 조회하고 저장된 Argon2 해시와 비교합니다.
//! 해시 연산은 비동기 실행기를 막지 않도록 blocking 풀에서 수행합니다.

use std::sync::Arc;

use authgate_core::{Identity, IdentityStore, StoreError};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};

use super::password::{
    dummy_hash, hash_password, is_phc_hash, needs_rehash, validate_password_strength,
    verify_password, PasswordError,
};

/// 자격증명 검증 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("사용자를 찾을 수 없습니다")]
    NotFound,
    #[error("자격증명이 일치하지 않습니다")]
    BadCredential,
    #[error("신원 저장소를 사용할 수 없습니다: {0}")]
    Unavailable(String),
    #[error("비밀번호 강도 미달: {0}")]
    WeakSecret(String),
}

impl From<StoreError> for VerifyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => VerifyError::NotFound,
            other => VerifyError::Unavailable(other.to_string()),
        }
    }
}

/// 자격증명 검증기.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn IdentityStore>,
}

impl CredentialVerifier {
    /// 신원 저장소로 생성.
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// 연결된 신원 저장소.
    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// 로그인 이름과 비밀번호를 검증합니다.
    ///
    /// 사용자가 없어도 더미 해시로 같은 비용의 검증을 수행합니다.
    /// 성공했는데 저장된 해시 파라미터가 현재와 다르면 새 해시로 교체합니다.
    pub async fn verify(&self, username: &str, secret: &str) -> Result<Identity, VerifyError> {
        let found = self.store.find_identity_by_username(username).await?;

        // 저장된 해시를 쓸 수 없으면 더미 해시로 같은 비용을 치르고 실패 처리
        let stored = found
            .as_ref()
            .map(Identity::credential_hash)
            .filter(|hash| is_phc_hash(hash));
        if found.is_some() && stored.is_none() {
            warn!(username = %username, "Stored credential hash is not a valid PHC string");
        }
        let hash = match stored {
            Some(hash) => hash.to_string(),
            None => substitute_hash()?.to_string(),
        };
        let usable = stored.is_some();

        let outcome = check_secret(SecretString::new(secret.into()), hash).await?;

        match (found, outcome) {
            (Some(identity), Ok(())) if usable => {
                debug!(username = %username, "Credential verified");
                if needs_rehash(identity.credential_hash()) {
                    self.upgrade_hash(username, secret).await;
                }
                Ok(identity)
            }
            (Some(_), _) => Err(VerifyError::BadCredential),
            (None, _) => Err(VerifyError::NotFound),
        }
    }

    /// 현재 비밀번호를 확인한 뒤 새 비밀번호로 교체합니다.
    pub async fn rotate_credential(
        &self,
        username: &str,
        current: &str,
        new_secret: &str,
    ) -> Result<(), VerifyError> {
        self.verify(username, current).await?;

        validate_password_strength(new_secret)
            .map_err(|reason| VerifyError::WeakSecret(reason.to_string()))?;

        let new_hash = hash_secret(SecretString::new(new_secret.into())).await?;
        self.store.update_credential_hash(username, &new_hash).await?;

        debug!(username = %username, "Credential rotated");
        Ok(())
    }

    /// 예전 파라미터의 해시를 현재 파라미터로 교체. 실패해도 로그인은 진행됩니다.
    async fn upgrade_hash(&self, username: &str, secret: &str) {
        let result = match hash_secret(SecretString::new(secret.into())).await {
            Ok(hash) => self
                .store
                .update_credential_hash(username, &hash)
                .await
                .map_err(VerifyError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => info!(username = %username, "Credential hash upgraded"),
            Err(e) => warn!(username = %username, error = %e, "Credential hash upgrade failed"),
        }
    }
}

fn substitute_hash() -> Result<&'static str, VerifyError> {
    dummy_hash().map_err(|e| {
        error!(error = %e, "Dummy credential hash unavailable");
        VerifyError::Unavailable(e.to_string())
    })
}

async fn hash_secret(secret: SecretString) -> Result<String, VerifyError> {
    tokio::task::spawn_blocking(move || hash_password(secret.expose_secret()))
        .await
        .map_err(|e| VerifyError::Unavailable(format!("hashing task failed: {}", e)))?
        .map_err(|e| VerifyError::Unavailable(e.to_string()))
}

async fn check_secret(
    secret: SecretString,
    hash: String,
) -> Result<Result<(), PasswordError>, VerifyError> {
    tokio::task::spawn_blocking(move || verify_password(secret.expose_secret(), &hash))
        .await
        .map_err(|e| VerifyError::Unavailable(format!("verification task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::DUMMY_SECRET;
    use authgate_core::{MemoryIdentityStore, Role};

    async fn verifier_with(
        username: &str,
        password: &str,
    ) -> (CredentialVerifier, Arc<MemoryIdentityStore>) {
        let hash = hash_password(password).unwrap();
        let identity = Identity::new("u-1", username, hash).with_role(Role::user());
        let store = Arc::new(MemoryIdentityStore::with_identities([identity]));
        (CredentialVerifier::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_verify_success() {
        let (verifier, _) = verifier_with("alice", "Password1").await;

        let identity = verifier.verify("alice", "Password1").await.unwrap();
        assert_eq!(identity.id, "u-1");
        assert!(identity.roles.contains(&Role::user()));
    }

    #[tokio::test]
    async fn test_verify_failures_are_distinguished_internally() {
        let (verifier, _) = verifier_with("alice", "Password1").await;

        assert_eq!(
            verifier.verify("alice", "wrong-pass1").await.unwrap_err(),
            VerifyError::BadCredential
        );
        assert_eq!(
            verifier.verify("nobody", "Password1").await.unwrap_err(),
            VerifyError::NotFound
        );
    }

    #[tokio::test]
    async fn test_corrupt_stored_hash_is_bad_credential() {
        let store = Arc::new(MemoryIdentityStore::with_identities([Identity::new(
            "u-2", "bob", "plaintext",
        )]));
        let verifier = CredentialVerifier::new(store);

        assert_eq!(
            verifier.verify("bob", "plaintext").await.unwrap_err(),
            VerifyError::BadCredential
        );
        // 대신 검증한 더미 해시와 일치해도 실패
        assert_eq!(
            verifier.verify("bob", DUMMY_SECRET).await.unwrap_err(),
            VerifyError::BadCredential
        );
    }

    #[tokio::test]
    async fn test_store_outage_is_unavailable() {
        let (verifier, store) = verifier_with("alice", "Password1").await;
        store.set_available(false);

        let err = verifier.verify("alice", "Password1").await.unwrap_err();
        assert!(matches!(err, VerifyError::Unavailable(_)));
        // 원인 메시지에 비밀번호가 포함되지 않음
        assert!(!err.to_string().contains("Password1"));
    }

    #[tokio::test]
    async fn test_outdated_hash_is_upgraded_on_success() {
        use argon2::{
            password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
            Algorithm, Argon2, Params, Version,
        };

        let weak = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(8 * 1024, 1, 1, None).unwrap(),
        );
        let old_hash = weak
            .hash_password(b"Password1", &SaltString::generate(&mut OsRng))
            .unwrap()
            .to_string();
        let store = Arc::new(MemoryIdentityStore::with_identities([Identity::new(
            "u-3", "carol", old_hash.clone(),
        )]));
        let verifier = CredentialVerifier::new(store.clone());

        verifier.verify("carol", "Password1").await.unwrap();

        let stored = store.find_identity_by_username("carol").await.unwrap().unwrap();
        assert_ne!(stored.credential_hash(), old_hash);
        assert!(!needs_rehash(stored.credential_hash()));
        assert!(verifier.verify("carol", "Password1").await.is_ok());
    }

    #[tokio::test]
    async fn test_rotate_credential() {
        let (verifier, _) = verifier_with("alice", "Password1").await;

        assert_eq!(
            verifier
                .rotate_credential("alice", "Password1", "short")
                .await
                .unwrap_err(),
            VerifyError::WeakSecret("비밀번호는 최소 8자 이상이어야 합니다".to_string())
        );
        assert_eq!(
            verifier
                .rotate_credential("alice", "not-current1", "NewPassword2")
                .await
                .unwrap_err(),
            VerifyError::BadCredential
        );

        verifier
            .rotate_credential("alice", "Password1", "NewPassword2")
            .await
            .unwrap();

        assert!(verifier.verify("alice", "NewPassword2").await.is_ok());
        assert_eq!(
            verifier.verify("alice", "Password1").await.unwrap_err(),
            VerifyError::BadCredential
        );
    }
}
