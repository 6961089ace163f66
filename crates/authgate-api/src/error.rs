//! 통합 API 응답/에러 타입.
//!
//! 모든 엔드포인트는 같은 봉투(envelope) 형식을 사용합니다.
//!
//! # 성공
//!
//! ```json
//! {
//!   "status": "SUCCESS",
//!   "code": "S000",
//!   "message": "성공적으로 처리되었습니다.",
//!   "data": { ... },
//!   "timestamp": "2025-01-31T09:00:00Z"
//! }
//! ```
//!
//! # 실패
//!
//! ```json
//! {
//!   "status": "FAIL",
//!   "code": "A005",
//!   "message": "인증에 실패했습니다.",
//!   "timestamp": "2025-01-31T09:00:00Z",
//!   "method": "POST",
//!   "path": "/auth/login"
//! }
//! ```

use axum::{
    extract::rejection::JsonRejection,
    http::{header::RETRY_AFTER, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthError, GateRejection};

/// API 응답 코드.
///
/// 형식: `[도메인 접두][3자리 숫자]`. S는 시스템, C는 클라이언트, A는 인증/권한.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    Error,
    InvalidRequest,
    MissingParameter,
    ValidationError,
    NotFound,
    TypeMismatch,
    TooManyRequests,
    Unauthorized,
    Forbidden,
    TokenExpired,
    AuthenticationFailed,
    InvalidToken,
}

impl ResponseCode {
    /// 코드 문자열.
    pub fn code(&self) -> &'static str {
        match self {
            ResponseCode::Success => "S000",
            ResponseCode::Error => "S001",
            ResponseCode::InvalidRequest => "C001",
            ResponseCode::MissingParameter => "C002",
            ResponseCode::ValidationError => "C003",
            ResponseCode::NotFound => "C004",
            ResponseCode::TypeMismatch => "C005",
            ResponseCode::TooManyRequests => "C006",
            ResponseCode::Unauthorized => "A001",
            ResponseCode::Forbidden => "A002",
            ResponseCode::TokenExpired => "A003",
            ResponseCode::AuthenticationFailed => "A005",
            ResponseCode::InvalidToken => "A006",
        }
    }

    /// 기본 메시지.
    pub fn message(&self) -> &'static str {
        match self {
            ResponseCode::Success => "성공적으로 처리되었습니다.",
            ResponseCode::Error => "서버 내부 오류가 발생했습니다.",
            ResponseCode::InvalidRequest => "잘못된 요청입니다.",
            ResponseCode::MissingParameter => "필수 파라미터가 누락되었습니다.",
            ResponseCode::ValidationError => "입력값이 유효하지 않습니다.",
            ResponseCode::NotFound => "요청한 리소스를 찾을 수 없습니다.",
            ResponseCode::TypeMismatch => "잘못된 파라미터 타입입니다.",
            ResponseCode::TooManyRequests => "요청이 너무 많습니다. 잠시 후 다시 시도하세요.",
            ResponseCode::Unauthorized => "인증이 필요합니다.",
            ResponseCode::Forbidden => "접근 권한이 없습니다.",
            ResponseCode::TokenExpired => "인증 토큰이 만료되었습니다.",
            ResponseCode::AuthenticationFailed => "인증에 실패했습니다.",
            ResponseCode::InvalidToken => "유효하지 않은 토큰입니다.",
        }
    }

    /// 대응하는 HTTP 상태 코드.
    pub fn status(&self) -> StatusCode {
        match self {
            ResponseCode::Success => StatusCode::OK,
            ResponseCode::Error => StatusCode::INTERNAL_SERVER_ERROR,
            ResponseCode::InvalidRequest
            | ResponseCode::MissingParameter
            | ResponseCode::ValidationError
            | ResponseCode::TypeMismatch => StatusCode::BAD_REQUEST,
            ResponseCode::NotFound => StatusCode::NOT_FOUND,
            ResponseCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ResponseCode::Unauthorized
            | ResponseCode::TokenExpired
            | ResponseCode::AuthenticationFailed
            | ResponseCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ResponseCode::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

/// 성공 응답 봉투.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// 항상 "SUCCESS"
    pub status: String,
    /// 응답 코드 (S000)
    pub code: String,
    /// 응답 메시지
    pub message: String,
    /// 응답 데이터
    pub data: T,
    /// 응답 시각
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    /// 성공 응답 생성.
    pub fn success(data: T) -> Self {
        Self {
            status: "SUCCESS".to_string(),
            code: ResponseCode::Success.code().to_string(),
            message: ResponseCode::Success.message().to_string(),
            data,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// 실패 응답 봉투.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 항상 "FAIL"
    pub status: String,
    /// 응답 코드 (예: "A001", "C003")
    pub code: String,
    /// 사람이 읽을 수 있는 메시지
    pub message: String,
    /// 추가 설명 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 에러 발생 시각
    pub timestamp: DateTime<Utc>,
    /// HTTP 메서드 (GET, POST 등)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// 요청 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApiErrorResponse {
    /// 응답 코드의 기본 메시지로 생성.
    pub fn new(code: ResponseCode) -> Self {
        Self {
            status: "FAIL".to_string(),
            code: code.code().to_string(),
            message: code.message().to_string(),
            description: None,
            timestamp: Utc::now(),
            method: None,
            path: None,
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// 핸들러/미들웨어 에러.
///
/// 상태 코드와 실패 봉투를 함께 가집니다.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorResponse,
    retry_after: Option<u64>,
}

impl ApiError {
    /// 응답 코드로 생성. 상태 코드는 응답 코드에서 결정됩니다.
    pub fn new(code: ResponseCode) -> Self {
        Self {
            status: code.status(),
            body: ApiErrorResponse::new(code),
            retry_after: None,
        }
    }

    /// 설명 추가.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.body.description = Some(description.into());
        self
    }

    /// 요청 정보(메서드, 경로) 추가.
    #[must_use]
    pub fn with_request_info(mut self, method: &Method, uri: &Uri) -> Self {
        self.body.method = Some(method.to_string());
        self.body.path = Some(uri.path().to_string());
        self
    }

    /// `Retry-After` 헤더 설정 (초).
    #[must_use]
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ApiErrorResponse {
        &self.body
    }

    /// 400 C003.
    pub fn validation(description: impl Into<String>) -> Self {
        Self::new(ResponseCode::ValidationError).with_description(description)
    }

    /// 500 S001. 원인은 응답에 담지 않습니다.
    pub fn internal() -> Self {
        Self::new(ResponseCode::Error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(seconds) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed => ApiError::new(ResponseCode::AuthenticationFailed),
            AuthError::WeakSecret(reason) => ApiError::validation(reason),
            AuthError::Unavailable(reason) | AuthError::Internal(reason) => {
                tracing::error!(error = %reason, "Authentication service error");
                ApiError::internal()
            }
        }
    }
}

impl From<GateRejection> for ApiError {
    fn from(rejection: GateRejection) -> Self {
        match rejection {
            GateRejection::Unauthenticated => ApiError::new(ResponseCode::Unauthorized),
            GateRejection::TokenExpired => ApiError::new(ResponseCode::TokenExpired),
            GateRejection::InvalidToken => ApiError::new(ResponseCode::InvalidToken),
            GateRejection::Forbidden => ApiError::new(ResponseCode::Forbidden),
            GateRejection::Unavailable(_) => ApiError::internal(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let detail = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    format!("{}: {}", field, detail)
                })
            })
            .collect();
        messages.sort();

        ApiError::validation(messages.join(", "))
    }
}

/// 요청 본문 역직렬화 실패.
///
/// 필드 누락은 C002, 필드 타입 불일치는 C005, 그 밖의 형식 오류는 C001.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        let code = match &rejection {
            JsonRejection::JsonDataError(_) if detail.contains("missing field") => {
                ResponseCode::MissingParameter
            }
            JsonRejection::JsonDataError(_) => ResponseCode::TypeMismatch,
            _ => ResponseCode::InvalidRequest,
        };
        ApiError::new(code).with_description(detail)
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;
