//! HTTP hardening layers
//!
//! [`SecureRouter::with_security`] wraps a finished router in the layers
//! configured by [`SecurityConfig`]. The 413 and 408 responses produced by
//! the body limit and timeout are rewritten into the API's JSON error body.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::error::AppError;

/// Extension trait for applying security layers to an Axum Router.
pub trait SecureRouter {
    /// Apply the configured layers. From outermost to innermost:
    /// 1. TraceLayer
    /// 2. CorsLayer (answers preflight before anything else runs)
    /// 3. Security headers
    /// 4. JSON error bodies for 413 and 408
    /// 5. Request body limit
    /// 6. Timeout
    fn with_security(self, config: &SecurityConfig) -> Self;
}

impl<S> SecureRouter for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security(self, config: &SecurityConfig) -> Self {
        let mut router = self
            .layer(TimeoutLayer::new(config.request_timeout))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.max_request_size))
            .layer(middleware::map_response(json_error_body));

        if config.security_headers_enabled {
            router = router
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
                ))
                // Tokens and student records must not be cached
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ));
        }

        router = router.layer(build_cors_layer(config));

        if config.tracing_enabled {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }
}

/// Replace the plain-text 413 and empty 408 from tower-http with [`AppError`]
/// JSON. Responses that are already JSON pass through.
async fn json_error_body(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }

    match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::payload_too_large().into_response(),
        StatusCode::REQUEST_TIMEOUT => AppError::timeout().into_response(),
        _ => response,
    }
}

/// Build CORS layer based on configuration
fn build_cors_layer(config: &SecurityConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    if config.cors_is_restrictive() {
        base
    } else if config.cors_is_permissive() {
        // Mirror the caller's origin; `Any` cannot be combined with credentials.
        base.allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        base.allow_origin(origins).allow_credentials(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::post};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(config: &SecurityConfig) -> Router {
        Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .route(
                "/slow",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .with_security(config)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let response = app(&SecurityConfig::default())
            .oneshot(Request::post("/echo").body(Body::from("hi")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn test_headers_can_be_disabled() {
        let config = SecurityConfig::builder().disable_security_headers().build();
        let response = app(&config)
            .oneshot(Request::post("/echo").body(Body::from("hi")).unwrap())
            .await
            .unwrap();
        assert!(response.headers().get(header::X_FRAME_OPTIONS).is_none());
    }

    #[tokio::test]
    async fn test_body_limit() {
        let config = SecurityConfig::builder().max_request_size(8).build();
        let response = app(&config)
            .oneshot(
                Request::post("/echo")
                    .header(header::CONTENT_LENGTH, "64")
                    .body(Body::from("x".repeat(64)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(content_type(&response), "application/json");
        let body = json_body(response).await;
        assert_eq!(body["error"], "payload_too_large");
        assert_eq!(body["message"], "Request body is too large");
    }

    #[tokio::test]
    async fn test_timeout_is_json() {
        let config = SecurityConfig::builder()
            .request_timeout(Duration::from_millis(20))
            .build();
        let response = app(&config)
            .oneshot(Request::post("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(content_type(&response), "application/json");
        assert_eq!(json_body(response).await["error"], "request_timeout");
    }

    #[tokio::test]
    async fn test_other_responses_untouched() {
        let response = app(&SecurityConfig::default())
            .oneshot(Request::post("/echo").body(Body::from("hi")).unwrap())
            .await
            .unwrap();
        assert_eq!(content_type(&response), "text/plain; charset=utf-8");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"hi");
    }

    #[tokio::test]
    async fn test_permissive_cors_mirrors_origin() {
        let config = SecurityConfig::builder().cors_permissive().build();
        let response = app(&config)
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/echo")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
