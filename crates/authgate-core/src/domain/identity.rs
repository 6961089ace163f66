//! 사용자 신원.

use super::{Role, RoleSet};

/// 인증 가능한 사용자 신원.
///
/// 등록은 외부 협력자가 담당합니다. 생성 후에는 자격증명 교체 외에는 바뀌지 않습니다.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// 외부 사용자 ID
    pub id: String,
    /// 로그인 이름 (고유)
    pub username: String,
    /// 표시 이름
    pub name: Option<String>,
    /// 부여된 역할
    pub roles: RoleSet,
    credential_hash: String,
}

impl Identity {
    /// 새로운 Identity 생성.
    ///
    /// # Arguments
    ///
    /// * `id` - 외부 사용자 ID
    /// * `username` - 로그인 이름
    /// * `credential_hash` - PHC 형식 비밀번호 해시
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        credential_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            name: None,
            roles: RoleSet::new(),
            credential_hash: credential_hash.into(),
        }
    }

    /// 표시 이름 설정.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 역할 추가.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    /// 역할 집합 설정.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    /// 자격증명이 교체된 사본 반환.
    #[must_use]
    pub fn with_credential_hash(mut self, credential_hash: impl Into<String>) -> Self {
        self.credential_hash = credential_hash.into();
        self
    }

    /// 저장된 비밀번호 해시.
    pub fn credential_hash(&self) -> &str {
        &self.credential_hash
    }

    /// 요구 역할이 모두 부여되었는지 확인.
    pub fn has_roles(&self, required: &RoleSet) -> bool {
        required.is_subset(&self.roles)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("name", &self.name)
            .field("roles", &self.roles)
            .field("credential_hash", &"[REDACTED]")
            .finish()
    }
}
