//! `GET|POST {api_prefix}/{*path}`: dispatches a call through the pipeline.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use tower::ServiceExt;

use super::AppState;
use crate::service::{CallRequest, ServiceError};

/// Runs one call and maps its [`Reply`](switchboard_core::Reply) to HTTP.
///
/// Success is `200` with the JSON value as body (empty when the operation
/// has no value). Any failure is `500` with the error text.
///
/// The call runs on its own task holding the in-flight guard, so a client
/// that disconnects mid-call does not release the slot while the operation
/// is still executing.
pub async fn dispatch_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Response {
    let guard = state.lifecycle.in_flight_guard();
    let call = state.pipeline.clone().oneshot(CallRequest::new(path, body));

    let outcome = tokio::spawn(async move {
        let _guard = guard;
        call.await
    })
    .await
    .unwrap_or_else(|err| Err(ServiceError::from(err)));

    match outcome {
        Ok(reply) if reply.success => {
            ([(CONTENT_TYPE, "application/json")], reply.body).into_response()
        }
        Ok(reply) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            reply.body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}
