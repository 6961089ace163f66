//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 인증 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.
//! 레코더가 설치되지 않은 경우(테스트 등) 기록 함수는 아무 일도 하지 않습니다.
//!
//! # 메트릭
//!
//! | 이름 | 종류 | 라벨 |
//! |---|---|---|
//! | `http_requests_total` | counter | method, route |
//! | `http_responses_total` | counter | method, route, status |
//! | `http_request_duration_seconds` | histogram | method, route |
//! | `http_requests_in_flight` | gauge | - |
//! | `auth_login_total` | counter | result |
//! | `auth_gate_decisions_total` | counter | outcome |
//! | `rate_limit_requests_total` | counter | status |

use axum::extract::MatchedPath;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// 라우트와 일치하지 않은 요청의 라벨.
///
/// 게이트에 거부되는 임의 경로가 라벨 수를 늘리지 않도록 하나로 묶습니다.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()?;

    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!("http_requests_total", "Requests received, by route template");
    describe_counter!("http_responses_total", "Responses sent, by route template and status");
    describe_histogram!(
        "http_request_duration_seconds",
        "Request latency including gate evaluation"
    );
    describe_gauge!("http_requests_in_flight", "Requests currently being processed");
    describe_counter!("auth_login_total", "Login attempts by result");
    describe_counter!("auth_gate_decisions_total", "Access gate decisions by outcome");
    describe_counter!("rate_limit_requests_total", "Login rate limiter decisions");
}

// ============================================================================
// HTTP 메트릭
// ============================================================================

/// 라우트 라벨.
///
/// 라우터가 넣어 준 경로 템플릿(`/admin/status`, `/swagger-ui/{*rest}` 등)을 그대로 쓰고,
/// 템플릿이 없으면 [`UNMATCHED_ROUTE`].
pub fn route_label(matched: Option<&MatchedPath>) -> String {
    matched
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// 처리 중인 요청 수 게이지 가드.
///
/// 생성 시 증가하고 drop 시 감소합니다. 타임아웃으로 요청 future가
/// 중간에 버려져도 게이지가 맞게 유지됩니다.
pub struct InFlightGuard(());

impl InFlightGuard {
    pub fn enter() -> Self {
        gauge!("http_requests_in_flight").increment(1.0);
        Self(())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("http_requests_in_flight").decrement(1.0);
    }
}

/// 요청 수신 기록.
pub fn record_http_request(method: &str, route: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "route" => route.to_string())
        .increment(1);
}

/// 응답 상태와 처리 시간 기록.
pub fn record_http_response(method: &str, route: &str, status: u16, duration_secs: f64) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 인증 메트릭
// ============================================================================

/// 로그인 시도 결과 기록 (`success`, `failure`, `error`).
pub fn record_login(result: &'static str) {
    counter!("auth_login_total", "result" => result).increment(1);
}

/// 게이트 판정 결과 기록.
pub fn record_gate_decision(outcome: &'static str) {
    counter!("auth_gate_decisions_total", "outcome" => outcome).increment(1);
}

/// 요청 제한 결과 기록.
pub fn record_rate_limit(status: &'static str) {
    counter!("rate_limit_requests_total", "status" => status).increment(1);
}
