//! HTTP 요청 metrics middleware.
//!
//! 게이트보다 바깥에 두어 401/403으로 거부된 요청도 집계합니다.
//! 라우트 라벨은 요청 경로가 아니라 일치한 라우트 템플릿입니다.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{record_http_request, record_http_response, route_label, InFlightGuard};

/// HTTP 메트릭을 수집하는 미들웨어 레이어.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let _in_flight = InFlightGuard::enter();
    let start = Instant::now();

    let method = request.method().to_string();
    let route = route_label(request.extensions().get::<MatchedPath>());
    record_http_request(&method, &route);

    let response = next.run(request).await;

    record_http_response(
        &method,
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    async fn ok() -> &'static str {
        "OK"
    }

    fn app() -> Router {
        Router::new()
            .route("/tokens/{id}", get(ok))
            .layer(middleware::from_fn(metrics_layer))
    }

    #[tokio::test]
    async fn test_passes_response_through() {
        let response = app()
            .oneshot(Request::builder().uri("/tokens/42").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_labels_use_route_template() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                for uri in ["/tokens/1", "/tokens/2", "/scan/wp-admin"] {
                    app()
                        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                        .await
                        .unwrap();
                }
            })
        });

        let rendered = handle.render();
        assert!(rendered
            .contains("http_requests_total{method=\"GET\",route=\"/tokens/{id}\"} 2"));
        assert!(rendered.contains("route=\"unmatched\",status=\"404\""));
        assert!(!rendered.contains("wp-admin"));
    }
}
