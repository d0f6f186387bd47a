//! Innermost pipeline service: hands each call to the registry.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use switchboard_core::{Registry, Reply};
use tower::Service;

use super::operation::{CallRequest, ServiceError};

type DispatchFuture = Pin<Box<dyn Future<Output = Result<Reply, ServiceError>> + Send>>;

// ---------------------------------------------------------------------------
// DispatchService
// ---------------------------------------------------------------------------

/// Runs [`Registry::reply`] for each [`CallRequest`].
///
/// Operations are synchronous and may block, so every call runs on Tokio's
/// blocking pool. The service is always ready.
#[derive(Debug, Clone)]
pub struct DispatchService {
    registry: Arc<Registry>,
}

impl DispatchService {
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl Service<CallRequest> for DispatchService {
    type Response = Reply;
    type Error = ServiceError;
    type Future = DispatchFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CallRequest) -> Self::Future {
        let registry = Arc::clone(&self.registry);
        Box::pin(async move {
            let reply =
                tokio::task::spawn_blocking(move || registry.reply(&req.path, &req.body)).await?;
            Ok(reply)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
