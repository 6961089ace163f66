//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiErrorResponse;
use crate::routes::{
    AdminStatusResponse, ChangeCredentialRequest, ComponentHealth, ComponentState,
    ComponentStatus, HealthResponse, LoginRequest, LoginResponse, LogoutResponse, MeResponse,
};

/// AuthGate API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AuthGate API",
        description = r#"
# AuthGate REST API

JWT 기반 인증 및 접근 제어 API입니다.

## 인증

`POST /auth/login`으로 받은 Access Token을
`Authorization: Bearer <token>` 헤더에 포함하세요.

## 응답 형식

모든 응답은 `status`, `code`, `message`, `timestamp`를 포함한 봉투 형식입니다.
실패 코드: A001 인증 필요, A002 권한 없음, A003 토큰 만료, A005 인증 실패, A006 유효하지 않은 토큰.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "auth", description = "인증 - 로그인, 토큰 재발급, 로그아웃"),
        (name = "admin", description = "관리자 - 서버 상태"),
        (name = "health", description = "헬스 체크 - 서버 상태 확인")
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            // ===== Auth =====
            LoginRequest,
            LoginResponse,
            LogoutResponse,
            ChangeCredentialRequest,
            MeResponse,

            // ===== Admin =====
            AdminStatusResponse,

            // ===== Health =====
            HealthResponse,
            ComponentHealth,
            ComponentStatus,
            ComponentState,

            // ===== Common =====
            ApiErrorResponse,
        )
    ),
    paths(
        // ===== Auth =====
        crate::routes::auth::login,
        crate::routes::auth::refresh_token,
        crate::routes::auth::logout,
        crate::routes::auth::change_credential,
        crate::routes::me::me,

        // ===== Admin =====
        crate::routes::admin::admin_status,

        // ===== Health =====
        crate::routes::health::health_check,
        crate::routes::health::health_ready,
    )
)]
pub struct ApiDoc;

/// `bearer_auth` 보안 스킴 등록.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI 라우터 생성.
///
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
