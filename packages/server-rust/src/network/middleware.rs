//! Transport-level middleware applied to every HTTP request.
//!
//! The first layer added is the outermost: it sees the request first and
//! the response last. Per-call concerns (metrics, outcome logging) live in
//! the dispatch pipeline, not here.

use axum::http::header::HeaderName;
use axum::http::Method;
use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

type HttpTrace = TraceLayer<SharedClassifier<ServerErrorsAsFailures>>;

/// The layer stack built by [`build_http_layers`], innermost last.
type HttpLayers = Stack<
    PropagateRequestIdLayer,
    Stack<
        CorsLayer,
        Stack<
            RequestBodyLimitLayer,
            Stack<CompressionLayer, Stack<HttpTrace, Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>>>,
        >,
    >,
>;

/// Builds the HTTP middleware stack.
///
/// Outermost to innermost:
/// 1. `SetRequestId` -- assigns a UUID `x-request-id` unless one is present
/// 2. `Trace` -- request/response spans
/// 3. `Compression` -- gzip when the client accepts it
/// 4. `RequestBodyLimit` -- 413 for bodies over `max_body_bytes`
/// 5. `Cors` -- allowed origins from `cors_origins`; sits inside the body
///    limit because it needs a `Default` response body
/// 6. `PropagateRequestId` -- echoes `x-request-id` on the response
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(build_cors_layer(&config.cors_origins))
        .layer(PropagateRequestIdLayer::new(request_id))
        .into_inner()
}

/// `"*"` anywhere in the list allows every origin; otherwise unparsable
/// entries are skipped.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    fn router(config: &NetworkConfig) -> Router {
        Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(build_http_layers(config))
    }

    #[tokio::test]
    async fn response_carries_request_id() {
        let response = router(&NetworkConfig::default())
            .oneshot(Request::post("/echo").body(Body::from("hi")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn caller_request_id_is_kept() {
        let request = Request::post("/echo")
            .header(REQUEST_ID_HEADER, "call-7")
            .body(Body::from("hi"))
            .unwrap();
        let response = router(&NetworkConfig::default()).oneshot(request).await.unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "call-7");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let config = NetworkConfig {
            max_body_bytes: 2,
            ..NetworkConfig::default()
        };
        let response = router(&config)
            .oneshot(Request::post("/echo").body(Body::from("hello")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn allowed_origin_is_echoed_within_body_limit() {
        let config = NetworkConfig {
            cors_origins: vec!["http://localhost:3000".to_string()],
            max_body_bytes: 16,
            ..NetworkConfig::default()
        };
        let request = Request::post("/echo")
            .header("origin", "http://localhost:3000")
            .body(Body::from("hi"))
            .unwrap();
        let response = router(&config).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[test]
    fn cors_layer_accepts_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "not a header value\n".to_string(),
        ];
        let _cors = build_cors_layer(&origins);
    }
}
