//! `echo`: hands its JSON payload back unchanged.

use serde_json::Value;
use switchboard_core::{CallContext, OperationSet, RegistrationError, Resource};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Echo {
    /// Returns `payload` as received; a missing body echoes `null`.
    #[must_use]
    pub fn message(&self, ctx: &CallContext, payload: Value) -> Value {
        debug!(call_id = ctx.call_id, "echo message");
        payload
    }
}

impl Resource for Echo {
    fn declare(ops: &mut OperationSet<Self>) -> Result<(), RegistrationError> {
        ops.operation_with_payload("Message", Echo::message)?;
        Ok(())
    }
}
