//! 현재 사용자 endpoint.

use std::sync::Arc;

use authgate_core::Identity;
use axum::{routing::get, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CurrentIdentity;
use crate::error::ApiResponse;
use crate::state::AppState;

/// 현재 사용자 정보.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    /// 외부 사용자 ID
    pub id: String,
    /// 로그인 이름
    pub username: String,
    /// 표시 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 정규화된 역할 목록 (정렬됨)
    pub roles: Vec<String>,
}

impl From<&Identity> for MeResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            username: identity.username.clone(),
            name: identity.name.clone(),
            roles: identity.roles.iter().map(|r| r.as_str().to_string()).collect(),
        }
    }
}

/// 현재 로그인한 사용자.
///
/// GET /me
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "현재 사용자", body = ApiResponse<MeResponse>),
        (status = 401, description = "인증 필요", body = crate::error::ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(CurrentIdentity(identity): CurrentIdentity) -> ApiResponse<MeResponse> {
    ApiResponse::success(MeResponse::from(&identity))
}

/// 현재 사용자 라우터.
pub fn me_router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me))
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_core::Role;

    #[test]
    fn test_me_response_from_identity() {
        let identity = Identity::new("u-7", "kim@example.com", "$argon2id$secret-hash")
            .with_name("김철수")
            .with_roles([Role::user(), Role::admin()]);

        let response = MeResponse::from(&identity);
        assert_eq!(response.id, "u-7");
        assert_eq!(response.username, "kim@example.com");
        assert_eq!(response.name.as_deref(), Some("김철수"));
        assert_eq!(response.roles, vec!["ADMIN".to_string(), "USER".to_string()]);

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("argon2"));
    }
}
