//! 비밀번호 해싱 유틸리티.
//!
//! Argon2id(PHC 문자열) 해싱과 검증. 해시 비교는 `password-hash`가 상수 시간으로
//! 수행합니다. 파라미터는 [`ARGON2_MEMORY_KIB`], [`ARGON2_ITERATIONS`],
//! [`ARGON2_PARALLELISM`]로 고정되며, 다른 파라미터로 만든 해시는
//! [`needs_rehash`]로 찾아 로그인 시 다시 해싱합니다.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::Lazy;

/// Argon2 메모리 비용 (KiB).
pub const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
/// Argon2 반복 횟수.
pub const ARGON2_ITERATIONS: u32 = 2;
/// Argon2 병렬도.
pub const ARGON2_PARALLELISM: u32 = 1;

/// 새 비밀번호 최소 길이 (문자 수).
pub const MIN_SECRET_CHARS: usize = 8;

static HASHER: Lazy<Argon2<'static>> = Lazy::new(|| {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_PARALLELISM, None)
        .unwrap_or_default();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
});

/// 더미 해시의 원문. 더미 해시와 일치해도 로그인 성공으로 취급하지 않습니다.
pub(crate) const DUMMY_SECRET: &str = "authgate-dummy-credential";

static DUMMY_HASH: Lazy<Result<String, PasswordError>> =
    Lazy::new(|| hash_password(DUMMY_SECRET));

/// 비밀번호 처리 에러.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
    #[error("비밀번호 검증 실패")]
    VerificationFailed,
    #[error("잘못된 해시 형식")]
    InvalidHashFormat,
}

/// 새 비밀번호가 충족하지 못한 요건.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StrengthViolation {
    #[error("비밀번호는 최소 8자 이상이어야 합니다")]
    TooShort,
    #[error("비밀번호에 최소 1개의 숫자가 포함되어야 합니다")]
    MissingDigit,
    #[error("비밀번호에 최소 1개의 영문자가 포함되어야 합니다")]
    MissingLetter,
}

/// 비밀번호를 PHC 형식으로 해싱합니다. 솔트는 매번 새로 생성됩니다.
///
/// ```rust,ignore
/// let hash = hash_password("my_secure_password")?;
/// // "$argon2id$v=19$m=19456,t=2,p=1$..."
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    HASHER
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::HashingFailed)
}

/// 저장된 PHC 해시와 비밀번호를 비교합니다.
///
/// 검증 파라미터는 해시 문자열에서 읽으므로 예전 파라미터의 해시도 검증됩니다.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    HASHER
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::VerificationFailed)
}

/// 해시가 현재 알고리즘/파라미터와 다르면 `true`.
///
/// 해석할 수 없는 문자열은 `false` (검증 단계에서 이미 거부됨).
pub fn needs_rehash(hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    let Ok(params) = Params::try_from(&parsed) else {
        return true;
    };

    parsed.algorithm != Algorithm::Argon2id.ident()
        || parsed.version != Some(Version::V0x13 as u32)
        || params.m_cost() != ARGON2_MEMORY_KIB
        || params.t_cost() != ARGON2_ITERATIONS
        || params.p_cost() != ARGON2_PARALLELISM
}

/// 존재하지 않는 사용자 검증에 쓰는 해시. 실제 해시와 같은 파라미터입니다.
///
/// 생성에 실패하면 에러를 그대로 돌려주며, 빈 문자열로 대체하지 않습니다.
pub(crate) fn dummy_hash() -> Result<&'static str, PasswordError> {
    DUMMY_HASH.as_deref().map_err(|e| *e)
}

/// 해석 가능한 PHC 문자열인지 확인.
pub fn is_phc_hash(hash: &str) -> bool {
    PasswordHash::new(hash).is_ok()
}

/// 새 비밀번호 강도 검증.
pub fn validate_password_strength(password: &str) -> Result<(), StrengthViolation> {
    if password.chars().count() < MIN_SECRET_CHARS {
        return Err(StrengthViolation::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(StrengthViolation::MissingDigit);
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(StrengthViolation::MissingLetter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_uses_configured_params() {
        let hash = hash_password("Password1").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
        assert!(verify_password("Password1", &hash).is_ok());
        assert!(matches!(
            verify_password("Password2", &hash),
            Err(PasswordError::VerificationFailed)
        ));
        assert!(!needs_rehash(&hash));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("Password1").unwrap();
        let b = hash_password("Password1").unwrap();

        assert_ne!(a, b);
        assert!(verify_password("Password1", &b).is_ok());
    }

    #[test]
    fn test_weaker_params_need_rehash_but_still_verify() {
        let weak = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(8 * 1024, 1, 1, None).unwrap(),
        );
        let salt = SaltString::generate(&mut OsRng);
        let old_hash = weak
            .hash_password(b"Password1", &salt)
            .unwrap()
            .to_string();

        assert!(verify_password("Password1", &old_hash).is_ok());
        assert!(needs_rehash(&old_hash));
    }

    #[test]
    fn test_argon2i_needs_rehash() {
        let legacy = Argon2::new(Algorithm::Argon2i, Version::V0x13, Params::default());
        let salt = SaltString::generate(&mut OsRng);
        let hash = legacy
            .hash_password(b"Password1", &salt)
            .unwrap()
            .to_string();

        assert!(needs_rehash(&hash));
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(matches!(
            verify_password("password", "not-a-valid-hash"),
            Err(PasswordError::InvalidHashFormat)
        ));
        assert!(!needs_rehash("not-a-valid-hash"));
        assert!(!is_phc_hash("not-a-valid-hash"));
        assert!(!is_phc_hash(""));
    }

    #[test]
    fn test_dummy_hash_is_stable_and_unmatchable() {
        let hash = dummy_hash().unwrap();
        assert!(std::ptr::eq(hash, dummy_hash().unwrap()));
        assert!(is_phc_hash(hash));
        assert!(!needs_rehash(hash));
        assert!(verify_password("anything", hash).is_err());
    }

    #[test]
    fn test_strength_rules() {
        assert_eq!(validate_password_strength("Password1"), Ok(()));
        assert_eq!(validate_password_strength("abcd1234"), Ok(()));
        assert_eq!(
            validate_password_strength("Pass1"),
            Err(StrengthViolation::TooShort)
        );
        assert_eq!(
            validate_password_strength("Password"),
            Err(StrengthViolation::MissingDigit)
        );
        assert_eq!(
            validate_password_strength("12345678"),
            Err(StrengthViolation::MissingLetter)
        );
        // 길이는 문자 수 기준으로 충족, 영문자 없음
        assert_eq!(
            validate_password_strength("한글패스워드123"),
            Err(StrengthViolation::MissingLetter)
        );
    }

    #[test]
    fn test_violation_message() {
        assert_eq!(
            StrengthViolation::TooShort.to_string(),
            "비밀번호는 최소 8자 이상이어야 합니다"
        );
    }
}
