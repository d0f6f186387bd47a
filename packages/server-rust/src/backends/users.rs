//! `users`: an in-memory user table with CRUD operations.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use switchboard_core::{CallContext, OperationSet, RegistrationError, Resource};
use tracing::info;

/// One row of the table, as returned by `users/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
}

/// User names keyed by sequential id. Ids are never reused.
#[derive(Debug, Default)]
pub struct Users {
    rows: RwLock<BTreeMap<i64, String>>,
    next_id: AtomicI64,
}

impl Users {
    /// Stores `name` under a fresh id and returns the id.
    pub fn create(&self, ctx: &CallContext, name: String) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        info!(call_id = ctx.call_id, id, name = %name, "created user");
        self.rows.write().insert(id, name);
        id
    }

    /// Name stored under `id`, or an empty string if there is none.
    #[must_use]
    pub fn read(&self, _ctx: &CallContext, id: i64) -> String {
        self.rows.read().get(&id).cloned().unwrap_or_default()
    }

    pub fn update(&self, _ctx: &CallContext, id: i64, name: String) {
        self.rows.write().insert(id, name);
    }

    pub fn delete(&self, _ctx: &CallContext, id: i64) {
        self.rows.write().remove(&id);
    }

    #[must_use]
    pub fn list(&self, _ctx: &CallContext) -> Vec<UserRecord> {
        self.rows
            .read()
            .iter()
            .map(|(id, name)| UserRecord {
                id: *id,
                name: name.clone(),
            })
            .collect()
    }
}

impl Resource for Users {
    fn declare(ops: &mut OperationSet<Self>) -> Result<(), RegistrationError> {
        ops.operation_with_payload("Create", Users::create)?
            .operation("Read", Users::read)?
            .operation_with_payload("Update", Users::update)?
            .operation("Delete", Users::delete)?
            .operation("List", Users::list)?;
        Ok(())
    }
}
