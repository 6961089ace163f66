//! 전체 라우터 조립.
//!
//! 레이어 순서 (바깥 → 안):
//! TraceLayer → metrics → Timeout(408) → CORS → 접근 게이트 → 라우트 (로그인은 요청 제한 추가).
//! CORS가 게이트 바깥에 있어야 preflight 요청이 토큰 없이 처리됩니다.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode, Uri},
    middleware,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use authgate_core::AppConfig;

use crate::auth::access_gate;
use crate::error::{ApiError, ResponseCode};
use crate::middleware::{metrics_layer, RateLimitConfig, RateLimitState};
use crate::openapi::swagger_ui_router;
use crate::routes::create_api_router;
use crate::state::AppState;

/// 라우터 조립 옵션.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// 로그인 요청 제한. `None`이면 제한 없음.
    pub login_rate_limit: Option<RateLimitConfig>,
    /// 전역 요청 타임아웃
    pub request_timeout: Duration,
    /// 허용 origin 목록. 비어 있으면 모든 origin 허용 (개발 모드).
    pub cors_origins: Vec<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            login_rate_limit: Some(RateLimitConfig::default()),
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

impl RouterOptions {
    /// 애플리케이션 설정에서 생성.
    ///
    /// `CORS_ORIGINS` 환경변수(쉼표 구분)가 있으면 해당 origin만 허용합니다.
    pub fn from_config(config: &AppConfig) -> Self {
        let login_rate_limit = if config.rate_limit.disabled {
            info!("Login rate limiting DISABLED");
            None
        } else {
            info!(
                requests_per_minute = config.rate_limit.login_per_minute,
                "Login rate limiting configured"
            );
            Some(RateLimitConfig::from_settings(&config.rate_limit))
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            login_rate_limit,
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
            cors_origins,
        }
    }
}

/// 전체 라우터 생성.
///
/// 반환되는 라우터와 함께 로그인 요청 제한 상태를 돌려주어
/// 호출자가 버킷 정리 태스크를 띄울 수 있게 합니다.
pub fn create_router(state: Arc<AppState>, options: RouterOptions) -> (Router, Option<RateLimitState>) {
    let login_limit = options.login_rate_limit.clone().map(RateLimitState::new);
    let gate = state.gate.clone();

    let router = create_api_router(login_limit.clone())
        .fallback(not_found)
        .with_state(state)
        // OpenAPI 문서 및 Swagger UI
        .merge(swagger_ui_router())
        .layer(middleware::from_fn_with_state(gate, access_gate))
        .layer(cors_layer(&options.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            options.request_timeout,
        ))
        // 메트릭 미들웨어 (거부된 요청 포함 모든 요청에 적용)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http());

    (router, login_limit)
}

/// 일치하는 라우트가 없을 때 404 C004.
async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::new(ResponseCode::NotFound).with_request_info(&method, &uri)
}

/// CORS 레이어 생성.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();

    let (allow_origin, credentials) = if parsed.is_empty() {
        if !origins.is_empty() {
            warn!("CORS origins configured but none are valid, allowing any");
        }
        (AllowOrigin::any(), false)
    } else {
        info!("CORS configured with {} allowed origins", parsed.len());
        (AllowOrigin::list(parsed), true)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(credentials)
        .max_age(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app() -> Router {
        let options = RouterOptions {
            login_rate_limit: None,
            ..RouterOptions::default()
        };
        create_router(Arc::new(create_test_state()), options).0
    }

    #[tokio::test]
    async fn test_unknown_route_requires_authentication_first() {
        let response = app()
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_openapi_json_is_permitted() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_preflight_bypasses_gate() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/me")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[test]
    fn test_router_options_default() {
        let options = RouterOptions::default();
        assert!(options.login_rate_limit.is_some());
        assert_eq!(options.request_timeout, Duration::from_secs(30));
        assert!(options.cors_origins.is_empty());
    }
}
