//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 공유됩니다.
//! 상태 자체는 읽기 전용이며, 쓰기는 협력자(저장소)가 직렬화합니다.

use std::sync::Arc;

use authgate_core::{AuthConfig, IdentityStore, TokenRegistry};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::MySqlPool;

use crate::auth::{
    AccessGate, AccessPolicy, AuthenticationService, CredentialVerifier, TokenCodec, TokenSettings,
};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 로그인/재발급/로그아웃 서비스
    pub auth: AuthenticationService,

    /// 요청 접근 게이트
    pub gate: AccessGate,

    /// 신원 저장소
    pub store: Arc<dyn IdentityStore>,

    /// 데이터베이스 연결 풀 (MariaDB/MySQL)
    pub db_pool: Option<MySqlPool>,

    /// Prometheus 메트릭 핸들 (`/metrics` 렌더링용)
    pub metrics: Option<PrometheusHandle>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// # 인자
    /// * `store` - 신원 저장소
    /// * `auth` - `[auth]` 설정 (서명 키, 토큰 수명)
    /// * `policy` - 라우트 접근 규칙
    pub fn new(store: Arc<dyn IdentityStore>, auth: &AuthConfig, policy: AccessPolicy) -> Self {
        let codec = TokenCodec::new(&auth.signing_secret, auth.issuer.clone());
        let verifier = CredentialVerifier::new(store.clone());
        let service =
            AuthenticationService::new(verifier, codec.clone(), TokenSettings::from_config(auth));
        let gate = AccessGate::new(codec, store.clone(), policy);

        Self {
            auth: service,
            gate,
            store,
            db_pool: None,
            metrics: None,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 토큰 폐기 목록 연결.
    ///
    /// 서비스(기록/폐기)와 게이트(활성 여부 확인)에 함께 적용됩니다.
    pub fn with_token_registry(mut self, registry: Arc<dyn TokenRegistry>) -> Self {
        self.auth = self.auth.with_token_registry(registry.clone());
        self.gate = self.gate.with_token_registry(registry);
        self
    }

    /// 데이터베이스 연결 설정.
    pub fn with_db_pool(mut self, pool: MySqlPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 메트릭 핸들 설정.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// 서버 업타임(초) 반환.
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }

    /// 폐기 목록 사용 여부.
    pub fn has_token_registry(&self) -> bool {
        self.auth.token_registry().is_some()
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// 인메모리 저장소와 폐기 목록을 사용합니다.
#[cfg(test)]
pub fn create_test_state() -> AppState {
    create_test_state_with(Vec::new())
}

/// 초기 신원 목록을 가진 테스트용 AppState.
#[cfg(test)]
pub fn create_test_state_with(
    identities: impl IntoIterator<Item = authgate_core::Identity>,
) -> AppState {
    use authgate_core::{MemoryIdentityStore, MemoryTokenRegistry};
    use secrecy::SecretString;

    let auth = AuthConfig {
        signing_secret: SecretString::new("state-test-secret-with-at-least-32-chars".into()),
        ..AuthConfig::default()
    };

    AppState::new(
        Arc::new(MemoryIdentityStore::with_identities(identities)),
        &auth,
        AccessPolicy::default_policy(),
    )
    .with_token_registry(Arc::new(MemoryTokenRegistry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wiring() {
        let state = create_test_state();
        assert!(state.has_token_registry());
        assert!(state.db_pool.is_none());
        assert!(state.metrics.is_none());
        assert!(!state.version.is_empty());
        assert!(state.uptime_secs() >= 0);
    }
}
