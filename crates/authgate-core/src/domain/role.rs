//! 역할 기반 접근 제어 (RBAC).
//!
//! 역할은 대소문자를 구분하지 않는 이름으로, 대문자로 정규화되어 저장됩니다.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 역할 집합.
///
/// 직렬화 순서가 항상 같도록 `BTreeSet`을 사용합니다.
pub type RoleSet = BTreeSet<Role>;

/// 사용자 역할.
///
/// 권한 묶음에 붙인 이름입니다 (예: `ADMIN`, `USER`).
/// `ROLE_` 접두어는 제거됩니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    /// 문자열에서 역할 파싱.
    ///
    /// 영문자, 숫자, `_`, `-`만 허용합니다. 빈 문자열은 `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let name = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("ROLE_"))
            .map(|_| &trimmed[5..])
            .unwrap_or(trimmed);

        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return None;
        }

        Some(Role(name.to_ascii_uppercase()))
    }

    /// 관리자 역할.
    pub fn admin() -> Self {
        Role("ADMIN".to_string())
    }

    /// 일반 사용자 역할.
    pub fn user() -> Self {
        Role("USER".to_string())
    }

    /// 정규화된 역할 이름.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| format!("Invalid role name: {:?}", s))
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

/// 쉼표로 구분된 역할 목록 파싱.
///
/// 빈 항목은 건너뜁니다. 잘못된 이름이 있으면 그 이름을 담아 에러를 반환합니다.
pub fn parse_role_list(list: &str) -> Result<RoleSet, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Role>())
        .collect()
}
