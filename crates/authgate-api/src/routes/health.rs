//! 헬스 체크 endpoint.
//!
//! `/health`는 프로세스 생존 여부만, `/health/ready`는 협력자(신원 저장소,
//! 토큰 폐기 목록) 연결까지 확인합니다. 기본 정책에서 인증 없이 접근할 수 있습니다.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use crate::state::AppState;

/// 협력자 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    Up,
    Down,
    /// 배포에서 사용하지 않음 (폐기 목록 미연결 등)
    NotConfigured,
}

/// 협력자 하나의 점검 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentStatus {
    pub state: ComponentState,

    /// 백엔드 종류 ("mysql" | "in-memory")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

/// 점검 대상별 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub identity_store: ComponentStatus,
    pub token_registry: ComponentStatus,
}

/// `/health/ready` 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// 모든 협력자가 `up` 또는 `not_configured`이면 `true`
    pub ready: bool,
    pub version: String,
    pub uptime_secs: i64,
    /// RFC 3339
    pub checked_at: String,
    pub components: ComponentHealth,
}

impl HealthResponse {
    fn status_code(&self) -> StatusCode {
        if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn backend_name(state: &AppState) -> &'static str {
    if state.db_pool.is_some() {
        "mysql"
    } else {
        "in-memory"
    }
}

async fn check_identity_store(state: &AppState) -> ComponentStatus {
    let component_state = match state.store.ping().await {
        Ok(()) => ComponentState::Up,
        Err(e) => {
            warn!(error = %e, "Identity store check failed");
            ComponentState::Down
        }
    };

    ComponentStatus {
        state: component_state,
        backend: Some(backend_name(state).to_string()),
    }
}

async fn check_token_registry(state: &AppState) -> ComponentStatus {
    let Some(registry) = state.auth.token_registry() else {
        return ComponentStatus {
            state: ComponentState::NotConfigured,
            backend: None,
        };
    };

    let component_state = match registry.ping().await {
        Ok(()) => ComponentState::Up,
        Err(e) => {
            warn!(error = %e, "Token registry check failed");
            ComponentState::Down
        }
    };

    ComponentStatus {
        state: component_state,
        backend: Some(backend_name(state).to_string()),
    }
}

/// Liveness probe.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "프로세스 응답 가능", body = String)),
    tag = "health"
)]
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe.
///
/// 두 협력자를 동시에 점검하며, 하나라도 `down`이면 503.
/// 폐기 목록이 장애이면 게이트가 모든 토큰을 거부하므로 준비되지 않은 것으로 봅니다.
/// GET /health/ready
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "요청 처리 가능", body = HealthResponse),
        (status = 503, description = "협력자 장애", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (identity_store, token_registry) = tokio::join!(
        check_identity_store(&state),
        check_token_registry(&state)
    );

    let ready = identity_store.state != ComponentState::Down
        && token_registry.state != ComponentState::Down;

    let response = HealthResponse {
        ready,
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        checked_at: chrono::Utc::now().to_rfc3339(),
        components: ComponentHealth {
            identity_store,
            token_registry,
        },
    };

    (response.status_code(), Json(response))
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(health_ready))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessPolicy;
    use crate::state::create_test_state;
    use authgate_core::{AuthConfig, MemoryIdentityStore, MemoryTokenRegistry};
    use axum::{body::Body, http::Request};
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn state_with(
        store: Arc<MemoryIdentityStore>,
        registry: Option<Arc<MemoryTokenRegistry>>,
    ) -> AppState {
        let auth = AuthConfig {
            signing_secret: SecretString::new("health-test-secret-with-at-least-32-chars".into()),
            ..AuthConfig::default()
        };
        let state = AppState::new(store, &auth, AccessPolicy::default_policy());
        match registry {
            Some(registry) => state.with_token_registry(registry),
            None => state,
        }
    }

    async fn ready(state: AppState) -> (StatusCode, serde_json::Value) {
        let app = Router::new()
            .route("/health/ready", get(health_ready))
            .with_state(Arc::new(state));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        let app = Router::new().route("/health", get(health_check));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_with_all_components_up() {
        let (status, body) = ready(create_test_state()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
        assert_eq!(body["components"]["identity_store"]["state"], "up");
        assert_eq!(body["components"]["identity_store"]["backend"], "in-memory");
        assert_eq!(body["components"]["token_registry"]["state"], "up");
        assert!(!body["version"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ready_without_registry() {
        let state = state_with(Arc::new(MemoryIdentityStore::new()), None);
        let (status, body) = ready(state).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["components"]["token_registry"]["state"], "not_configured");
        assert!(body["components"]["token_registry"].get("backend").is_none());
    }

    #[tokio::test]
    async fn test_ready_reports_store_outage() {
        let store = Arc::new(MemoryIdentityStore::new());
        store.set_available(false);

        let (status, body) = ready(state_with(store, None)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ready"], false);
        assert_eq!(body["components"]["identity_store"]["state"], "down");
    }

    #[tokio::test]
    async fn test_ready_reports_registry_outage() {
        let registry = Arc::new(MemoryTokenRegistry::new());
        registry.set_available(false);

        let state = state_with(Arc::new(MemoryIdentityStore::new()), Some(registry));
        let (status, body) = ready(state).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["components"]["identity_store"]["state"], "up");
        assert_eq!(body["components"]["token_registry"]["state"], "down");
    }

    #[test]
    fn test_component_state_wire_names() {
        assert_eq!(
            serde_json::to_string(&ComponentState::NotConfigured).unwrap(),
            "\"not_configured\""
        );
        assert_eq!(serde_json::to_string(&ComponentState::Down).unwrap(), "\"down\"");
    }
}
