//! Global middleware stack: request logging, then CORS, then the request timeout.

use std::{net::SocketAddr, time::Duration};

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::ConnectInfo,
    http::{header, HeaderValue, Request, Response, StatusCode},
    BoxError, Router,
};
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn, Span};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Log level for a finished request, from the status it actually returned.
pub fn severity(status: StatusCode) -> Severity {
    let code = status.as_u16();
    if code >= 500 {
        Severity::Error
    } else if code >= 400 {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Sets `Access-Control-Allow-Origin: *` on every response.
pub fn allow_any_origin() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    )
}

async fn handle_timeout(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::RequestTimeout
    } else {
        ApiError::Internal(anyhow::anyhow!("unhandled middleware error: {err}"))
    }
}

/// Wraps `router` in `[logging, cors, timeout]`. Layers run in the order listed,
/// so a timed-out request is still logged and still carries the CORS header.
pub fn with_global_stack(router: Router, timeout: Duration) -> Router {
    let logging = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            let remote_addr = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string())
                .unwrap_or_else(|| "unknown".into());
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                path = %req.uri().path(),
                remote_addr = %remote_addr,
            )
        })
        .on_request(|_req: &Request<Body>, _span: &Span| debug!("started"))
        .on_response(|res: &Response<Body>, latency: Duration, _span: &Span| {
            let status = res.status().as_u16();
            let elapsed_ms = latency.as_secs_f64() * 1000.0;
            match severity(res.status()) {
                Severity::Error => error!(status, elapsed_ms, "completed"),
                Severity::Warn => warn!(status, elapsed_ms, "completed"),
                Severity::Info => info!(status, elapsed_ms, "completed"),
            }
        })
        .on_failure(());

    router.layer(
        ServiceBuilder::new()
            .layer(logging)
            .layer(allow_any_origin())
            .layer(HandleErrorLayer::new(handle_timeout))
            .layer(TimeoutLayer::new(timeout)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tower::ServiceExt;

    #[test]
    fn severity_follows_status_class() {
        assert_eq!(severity(StatusCode::OK), Severity::Info);
        assert_eq!(severity(StatusCode::CREATED), Severity::Info);
        assert_eq!(severity(StatusCode::FOUND), Severity::Info);
        assert_eq!(severity(StatusCode::UNAUTHORIZED), Severity::Warn);
        assert_eq!(severity(StatusCode::UNPROCESSABLE_ENTITY), Severity::Warn);
        assert_eq!(severity(StatusCode::INTERNAL_SERVER_ERROR), Severity::Error);
        assert_eq!(severity(StatusCode::SERVICE_UNAVAILABLE), Severity::Error);
    }

    #[tokio::test]
    async fn cors_header_is_set_on_success_and_error() {
        let app = with_global_stack(
            Router::new()
                .route("/ok", get(|| async { "ok" }))
                .route("/fail", get(|| async { StatusCode::INTERNAL_SERVER_ERROR })),
            Duration::from_secs(10),
        );

        for uri in ["/ok", "/fail", "/missing"] {
            let res = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(
                res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
                "*",
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn slow_request_times_out_with_json_error() {
        let app = with_global_stack(
            Router::new().route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "late"
                }),
            ),
            Duration::from_millis(10),
        );

        let res = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "request timed out" }));
    }
}
