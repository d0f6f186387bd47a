//! Metrics middleware for dispatched calls.
//!
//! Wraps every call in a `tracing` span and records a call counter and a
//! latency histogram through the `metrics` facade. Nothing is exported
//! unless the binary installs a recorder.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use switchboard_core::{normalize_name, Reply};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::{CallRequest, ServiceError};

/// Counter of completed calls, labelled by `resource` and `outcome`.
pub const CALLS_TOTAL: &str = "switchboard_calls_total";
/// Histogram of call latency in seconds, labelled by `resource`.
pub const CALL_DURATION_SECONDS: &str = "switchboard_call_duration_seconds";

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments calls with a span, a counter, and a histogram.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records call duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<CallRequest> for MetricsService<S>
where
    S: Service<CallRequest, Response = Reply, Error = ServiceError> + Send,
    S::Future: Send + 'static,
{
    type Response = Reply;
    type Error = ServiceError;
    type Future = Pin<Box<dyn Future<Output = Result<Reply, ServiceError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: CallRequest) -> Self::Future {
        let resource = normalize_name(req.resource_segment());
        let span = info_span!(
            "call",
            path = %req.path,
            resource = %resource,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let elapsed = start.elapsed();

                let outcome = outcome_label(&result);
                // Unknown resources would otherwise mint a label per typo.
                let resource = if outcome == "not_found" {
                    "unknown".to_string()
                } else {
                    resource
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = elapsed.as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                match &result {
                    Ok(reply) if reply.error_kind == Some("operation") => {
                        tracing::warn!(
                            duration_ms,
                            error = %String::from_utf8_lossy(&reply.body),
                            "operation failed"
                        );
                    }
                    Err(err) => tracing::error!(duration_ms, error = %err, "dispatch failed"),
                    _ => tracing::debug!(duration_ms, outcome, "call complete"),
                }

                metrics::counter!(CALLS_TOTAL, "resource" => resource.clone(), "outcome" => outcome)
                    .increment(1);
                metrics::histogram!(CALL_DURATION_SECONDS, "resource" => resource)
                    .record(elapsed.as_secs_f64());

                result
            }
            .instrument(span),
        )
    }
}

fn outcome_label(result: &Result<Reply, ServiceError>) -> &'static str {
    match result {
        Ok(reply) if reply.success => "ok",
        Ok(reply) => reply.error_kind.unwrap_or("error"),
        Err(_) => "internal",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tower::ServiceExt;

    use super::*;

    /// Immediately-completing service that fails paths starting with `bad`.
    struct ImmediateService;

    impl Service<CallRequest> for ImmediateService {
        type Response = Reply;
        type Error = ServiceError;
        type Future = Pin<Box<dyn Future<Output = Result<Reply, ServiceError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: CallRequest) -> Self::Future {
            Box::pin(async move {
                if req.path.starts_with("bad") {
                    Ok(Reply::failure("operation", "bad call".to_string()))
                } else {
                    Ok(Reply::success(req.body.to_vec()))
                }
            })
        }
    }

    #[tokio::test]
    async fn metrics_layer_passes_through_reply() {
        let svc = MetricsLayer.layer(ImmediateService);
        let reply = svc
            .oneshot(CallRequest::new("users/read/0", "\"x\""))
            .await
            .unwrap();
        assert_eq!(reply, Reply::success(b"\"x\"".to_vec()));
    }

    #[tokio::test]
    async fn metrics_layer_passes_through_failure() {
        let svc = MetricsLayer.layer(ImmediateService);
        let reply = svc.oneshot(CallRequest::new("bad/op", "")).await.unwrap();
        assert!(!reply.success);
        assert_eq!(reply.error_kind, Some("operation"));
    }

    #[test]
    fn outcome_label_uses_error_kind() {
        assert_eq!(outcome_label(&Ok(Reply::success(Vec::new()))), "ok");
        assert_eq!(
            outcome_label(&Ok(Reply::failure("not_found", String::new()))),
            "not_found"
        );
        assert_eq!(outcome_label(&Err(ServiceError::Cancelled)), "internal");
    }
}
